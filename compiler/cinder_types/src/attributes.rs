//! Bound attribute applications and their constant arguments.
//!
//! Floating point constants are stored by bit pattern so that equal values
//! always compare, hash and serialize identically.

use cinder_ir::Name;

use crate::Idx;

/// The value part of a typed constant.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum ConstantValue {
    Bool(bool),
    Char(char),
    /// Any signed integral, or the underlying value of an enum constant.
    Int(i64),
    /// Unsigned integrals that do not fit `i64`.
    UInt(u64),
    /// `float`, by IEEE-754 bit pattern.
    Single(u32),
    /// `double`, by IEEE-754 bit pattern.
    Double(u64),
    String(Box<str>),
    Null,
    /// `typeof(T)`
    Type(Idx),
    /// `new[] { ... }`
    Array(Vec<TypedConstant>),
    /// An argument that failed to bind.
    Error,
}

/// A constant together with its type.
///
/// For enum constants `ty` is the enum type and `value` is `Int`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct TypedConstant {
    pub ty: Idx,
    pub value: ConstantValue,
}

impl TypedConstant {
    pub fn int(value: i32) -> Self {
        TypedConstant {
            ty: Idx::INT,
            value: ConstantValue::Int(i64::from(value)),
        }
    }

    pub fn string(value: &str) -> Self {
        TypedConstant {
            ty: Idx::STRING,
            value: ConstantValue::String(value.into()),
        }
    }

    pub fn bool(value: bool) -> Self {
        TypedConstant {
            ty: Idx::BOOL,
            value: ConstantValue::Bool(value),
        }
    }

    pub fn double(value: f64) -> Self {
        TypedConstant {
            ty: Idx::DOUBLE,
            value: ConstantValue::Double(value.to_bits()),
        }
    }

    pub fn single(value: f32) -> Self {
        TypedConstant {
            ty: Idx::FLOAT,
            value: ConstantValue::Single(value.to_bits()),
        }
    }

    pub fn error() -> Self {
        TypedConstant {
            ty: Idx::ERROR,
            value: ConstantValue::Error,
        }
    }

    /// Whether this constant or any array element failed to bind.
    pub fn has_error(&self) -> bool {
        match &self.value {
            ConstantValue::Error => true,
            ConstantValue::Array(items) => items.iter().any(TypedConstant::has_error),
            _ => self.ty.is_error(),
        }
    }
}

/// Whether a named argument sets a field or a property.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NamedArgKind {
    Field,
    Property,
}

/// `Name = value` in an attribute application.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct NamedArg {
    pub name: Name,
    pub kind: NamedArgKind,
    pub value: TypedConstant,
}

/// An applied attribute: `[Attr(positional..., Name = value...)]`.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct AttributeData {
    /// The attribute class, a named type.
    pub class: Idx,
    pub positional: Vec<TypedConstant>,
    pub named: Vec<NamedArg>,
}

impl AttributeData {
    /// An attribute with no arguments.
    pub fn new(class: Idx) -> Self {
        AttributeData {
            class,
            positional: Vec::new(),
            named: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_positional(mut self, value: TypedConstant) -> Self {
        self.positional.push(value);
        self
    }

    #[must_use]
    pub fn with_named(mut self, name: Name, kind: NamedArgKind, value: TypedConstant) -> Self {
        self.named.push(NamedArg { name, kind, value });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_constants_compare_by_bits() {
        assert_eq!(TypedConstant::double(0.5), TypedConstant::double(0.5));
        assert_ne!(TypedConstant::double(0.0), TypedConstant::double(-0.0));
        assert_eq!(TypedConstant::single(f32::NAN), TypedConstant::single(f32::NAN));
    }

    #[test]
    fn error_detection_looks_into_arrays() {
        let arr = TypedConstant {
            ty: Idx::INT,
            value: ConstantValue::Array(vec![TypedConstant::int(1), TypedConstant::error()]),
        };
        assert!(arr.has_error());
        assert!(!TypedConstant::string("x").has_error());
    }
}
