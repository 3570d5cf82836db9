//! Cross-reference syntax.
//!
//! ```text
//! cref     := "extension" tparams? "(" param ")" "." ident tparams? ( "(" params? ")" )?
//! tparams  := ( "<" | "{" ) ident ( "," ident )* ( ">" | "}" )
//! param    := ( "ref" "readonly"? | "in" )? type
//! type     := ( path targs? | "(" type ( "," type )+ ")" ) ( "?" | "*" | "[" ","* "]" )*
//! path     := ident ( "." ident )*
//! ```
//!
//! Documentation syntax accepts `{}` wherever source syntax uses `<>`.

use cinder_ir::{Name, StringInterner};
use cinder_types::RefKind;
use thiserror::Error;

/// A parsed extension member cross-reference.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Cref {
    /// `T` in `extension<T>(...)`.
    pub type_params: Vec<Name>,
    pub receiver: CrefParam,
    pub member: Name,
    /// `U` in `.M<U>(...)`.
    pub member_type_params: Vec<Name>,
    /// `None` when the reference omits the parameter list.
    pub params: Option<Vec<CrefParam>>,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct CrefParam {
    pub ref_kind: RefKind,
    pub ty: CrefType,
}

/// A type as spelled in a cross-reference, before name lookup.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum CrefType {
    Path { segments: Vec<Name>, args: Vec<CrefType> },
    Tuple(Vec<CrefType>),
    Array { elem: Box<CrefType>, rank: u32 },
    Pointer(Box<CrefType>),
    Nullable(Box<CrefType>),
}

/// Why a cross-reference could not be parsed.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("{kind} at offset {offset}")]
pub struct CrefError {
    pub offset: usize,
    pub kind: CrefErrorKind,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Error)]
pub enum CrefErrorKind {
    #[error("expected `extension`")]
    NotExtension,
    #[error("expected {0}")]
    Expected(&'static str),
    #[error("unexpected trailing input")]
    TrailingInput,
}

/// Parse `text` as an extension member cross-reference.
pub fn parse_cref(interner: &StringInterner, text: &str) -> Result<Cref, CrefError> {
    let mut p = Parser {
        interner,
        src: text.as_bytes(),
        pos: 0,
    };
    let cref = p.cref()?;
    p.skip_ws();
    if p.pos < p.src.len() {
        return Err(p.error(CrefErrorKind::TrailingInput));
    }
    Ok(cref)
}

struct Parser<'a> {
    interner: &'a StringInterner,
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, kind: CrefErrorKind) -> CrefError {
        CrefError {
            offset: self.pos,
            kind,
        }
    }

    fn skip_ws(&mut self) {
        while self.src.get(self.pos).is_some_and(u8::is_ascii_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_ws();
        self.src.get(self.pos).copied()
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8, what: &'static str) -> Result<(), CrefError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(CrefErrorKind::Expected(what)))
        }
    }

    /// The identifier at the cursor, without consuming it.
    fn peek_ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let src: &'a [u8] = self.src;
        let rest = &src[self.pos..];
        let first = *rest.first()?;
        if !(first.is_ascii_alphabetic() || first == b'_') {
            return None;
        }
        let len = rest
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count();
        std::str::from_utf8(&rest[..len]).ok()
    }

    fn ident(&mut self) -> Result<Name, CrefError> {
        let Some(ident) = self.peek_ident() else {
            return Err(self.error(CrefErrorKind::Expected("an identifier")));
        };
        self.pos += ident.len();
        Ok(self.interner.intern(ident))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_ident() == Some(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn cref(&mut self) -> Result<Cref, CrefError> {
        if !self.eat_keyword("extension") {
            return Err(self.error(CrefErrorKind::NotExtension));
        }
        let type_params = self.type_params()?;
        self.expect(b'(', "`(`")?;
        let receiver = self.param()?;
        self.expect(b')', "`)`")?;
        self.expect(b'.', "`.`")?;
        let member = self.ident()?;
        let member_type_params = self.type_params()?;
        let params = if self.eat(b'(') {
            let mut params = Vec::new();
            if !self.eat(b')') {
                loop {
                    params.push(self.param()?);
                    if self.eat(b')') {
                        break;
                    }
                    self.expect(b',', "`,` or `)`")?;
                }
            }
            Some(params)
        } else {
            None
        };
        Ok(Cref {
            type_params,
            receiver,
            member,
            member_type_params,
            params,
        })
    }

    fn type_params(&mut self) -> Result<Vec<Name>, CrefError> {
        let close = match self.peek() {
            Some(b'<') => b'>',
            Some(b'{') => b'}',
            _ => return Ok(Vec::new()),
        };
        self.pos += 1;
        let mut names = vec![self.ident()?];
        while self.eat(b',') {
            names.push(self.ident()?);
        }
        self.expect(close, "a closing bracket")?;
        Ok(names)
    }

    fn param(&mut self) -> Result<CrefParam, CrefError> {
        let ref_kind = if self.eat_keyword("ref") {
            if self.eat_keyword("readonly") {
                RefKind::RefReadOnly
            } else {
                RefKind::Ref
            }
        } else if self.eat_keyword("in") {
            RefKind::In
        } else {
            RefKind::None
        };
        Ok(CrefParam {
            ref_kind,
            ty: self.ty()?,
        })
    }

    fn ty(&mut self) -> Result<CrefType, CrefError> {
        let mut ty = if self.eat(b'(') {
            let mut elems = vec![self.ty()?];
            while self.eat(b',') {
                elems.push(self.ty()?);
            }
            self.expect(b')', "`)`")?;
            if elems.len() < 2 {
                return Err(self.error(CrefErrorKind::Expected("a tuple of two or more types")));
            }
            CrefType::Tuple(elems)
        } else {
            self.path()?
        };
        loop {
            if self.eat(b'?') {
                ty = CrefType::Nullable(Box::new(ty));
            } else if self.eat(b'*') {
                ty = CrefType::Pointer(Box::new(ty));
            } else if self.eat(b'[') {
                let mut rank = 1;
                while self.eat(b',') {
                    rank += 1;
                }
                self.expect(b']', "`]`")?;
                ty = CrefType::Array {
                    elem: Box::new(ty),
                    rank,
                };
            } else {
                return Ok(ty);
            }
        }
    }

    fn path(&mut self) -> Result<CrefType, CrefError> {
        let mut segments = vec![self.ident()?];
        while self.peek() == Some(b'.') {
            self.pos += 1;
            segments.push(self.ident()?);
        }
        let close = match self.peek() {
            Some(b'<') => Some(b'>'),
            Some(b'{') => Some(b'}'),
            _ => None,
        };
        let mut args = Vec::new();
        if let Some(close) = close {
            self.pos += 1;
            args.push(self.ty()?);
            while self.eat(b',') {
                args.push(self.ty()?);
            }
            self.expect(close, "a closing bracket")?;
        }
        Ok(CrefType::Path { segments, args })
    }
}
