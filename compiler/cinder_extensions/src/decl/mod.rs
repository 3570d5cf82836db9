//! Bound extension block declarations.
//!
//! These are the inputs of the subsystem: produced by the binder from
//! source syntax, immutable afterwards. Type parameter references inside a
//! block use `TypeParamOwner::Block` for the block's own parameters and
//! `TypeParamOwner::Method` for a member's parameters.

use cinder_ir::{Name, SourceLoc, Span};
use cinder_types::{
    Accessibility, AttributeData, DefId, Idx, ParamInfo, RefKind, ScopedKind, TypeParamDecl,
    TypedConstant,
};

/// The receiver parameter of an extension block.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ReceiverDescriptor {
    /// Extended type. Nullability is carried as `TypeData::NullableRef`.
    pub ty: Idx,
    pub ref_kind: RefKind,
    pub scoped: ScopedKind,
    /// `None` for receivers of blocks that only declare static members.
    pub name: Option<Name>,
    pub attributes: Vec<AttributeData>,
    /// A written default value. Always an error.
    pub default_value: Option<TypedConstant>,
    pub span: Span,
}

impl ReceiverDescriptor {
    /// A named by-value receiver.
    pub fn new(name: Name, ty: Idx) -> Self {
        ReceiverDescriptor {
            ty,
            ref_kind: RefKind::None,
            scoped: ScopedKind::None,
            name: Some(name),
            attributes: Vec::new(),
            default_value: None,
            span: Span::DUMMY,
        }
    }

    /// A receiver without a parameter name (`extension(int)`).
    pub fn unnamed(ty: Idx) -> Self {
        ReceiverDescriptor {
            name: None,
            ..ReceiverDescriptor::new(Name::EMPTY, ty)
        }
    }

    #[must_use]
    pub fn with_ref_kind(mut self, ref_kind: RefKind) -> Self {
        self.ref_kind = ref_kind;
        self
    }

    #[must_use]
    pub fn with_scoped(mut self, scoped: ScopedKind) -> Self {
        self.scoped = scoped;
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, attr: AttributeData) -> Self {
        self.attributes.push(attr);
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The receiver as an ordinary parameter, for forwarders.
    pub fn as_param(&self) -> ParamInfo {
        ParamInfo {
            name: self.name.unwrap_or(Name::EMPTY),
            ty: self.ty,
            ref_kind: self.ref_kind,
            scoped: self.scoped,
            attributes: self.attributes.clone(),
            has_default: false,
        }
    }
}

/// Kind of a member declared inside an extension block.
///
/// Only methods, properties and indexers are allowed; the other kinds are
/// representable so the binder can hand them over for diagnosis.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum MemberKind {
    Method,
    Property,
    Indexer,
    Field,
    Constructor,
    Event,
    NestedType,
    Finalizer,
}

impl MemberKind {
    #[inline]
    pub const fn is_allowed(self) -> bool {
        matches!(self, MemberKind::Method | MemberKind::Property | MemberKind::Indexer)
    }

    /// Properties and indexers.
    #[inline]
    pub const fn has_accessors(self) -> bool {
        matches!(self, MemberKind::Property | MemberKind::Indexer)
    }

    pub const fn description(self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Indexer => "indexer",
            MemberKind::Field => "field",
            MemberKind::Constructor => "constructor",
            MemberKind::Event => "event",
            MemberKind::NestedType => "nested type",
            MemberKind::Finalizer => "finalizer",
        }
    }
}

/// Which accessors a property or indexer declares.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct Accessors {
    pub get: bool,
    pub set: bool,
}

impl Accessors {
    pub const GET: Accessors = Accessors { get: true, set: false };
    pub const SET: Accessors = Accessors { get: false, set: true };
    pub const GET_SET: Accessors = Accessors { get: true, set: true };
    pub const NONE: Accessors = Accessors { get: false, set: false };
}

/// A member as written inside an extension block.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberDecl {
    pub name: Name,
    pub kind: MemberKind,
    pub accessibility: Accessibility,
    pub is_static: bool,
    /// The member's own type parameters (`Method` owner).
    pub type_params: Vec<TypeParamDecl>,
    /// Method parameters, or indexer parameters.
    pub params: Vec<ParamInfo>,
    /// Return type for methods, value type for properties and indexers.
    pub ret: Idx,
    pub ret_ref_kind: RefKind,
    pub accessors: Accessors,
    /// `[OverloadResolutionPriority(n)]`
    pub priority: Option<i32>,
    pub span: Span,
}

impl MemberDecl {
    fn base(name: Name, kind: MemberKind, ret: Idx) -> Self {
        MemberDecl {
            name,
            kind,
            accessibility: Accessibility::Public,
            is_static: false,
            type_params: Vec::new(),
            params: Vec::new(),
            ret,
            ret_ref_kind: RefKind::None,
            accessors: Accessors::NONE,
            priority: None,
            span: Span::DUMMY,
        }
    }

    /// A public instance method.
    pub fn method(name: Name, params: Vec<ParamInfo>, ret: Idx) -> Self {
        MemberDecl {
            params,
            ..MemberDecl::base(name, MemberKind::Method, ret)
        }
    }

    /// A public instance property with the given accessors.
    pub fn property(name: Name, ty: Idx, accessors: Accessors) -> Self {
        MemberDecl {
            accessors,
            ..MemberDecl::base(name, MemberKind::Property, ty)
        }
    }

    /// A public instance indexer. `item` is the interned `Item` name.
    pub fn indexer(item: Name, params: Vec<ParamInfo>, ty: Idx, accessors: Accessors) -> Self {
        MemberDecl {
            params,
            accessors,
            ..MemberDecl::base(item, MemberKind::Indexer, ty)
        }
    }

    /// A member of a kind that is not allowed in extension blocks.
    pub fn disallowed(name: Name, kind: MemberKind) -> Self {
        MemberDecl::base(name, kind, Idx::VOID)
    }

    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    #[must_use]
    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    #[must_use]
    pub fn with_type_params(mut self, type_params: Vec<TypeParamDecl>) -> Self {
        self.type_params = type_params;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn with_ret_ref_kind(mut self, ref_kind: RefKind) -> Self {
        self.ret_ref_kind = ref_kind;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// A bound `extension<...>(receiver) { ... }` block.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExtensionBlockDecl {
    /// The static class the block is declared in.
    pub declaring_type: DefId,
    pub loc: SourceLoc,
    pub accessibility: Accessibility,
    /// Receiver parameters as written; well-formed blocks have exactly one.
    pub receivers: Vec<ReceiverDescriptor>,
    pub type_params: Vec<TypeParamDecl>,
    pub attributes: Vec<AttributeData>,
    pub members: Vec<MemberDecl>,
}

impl ExtensionBlockDecl {
    /// A public, non-generic block with one receiver and no members.
    pub fn new(declaring_type: DefId, loc: SourceLoc, receiver: ReceiverDescriptor) -> Self {
        ExtensionBlockDecl {
            declaring_type,
            loc,
            accessibility: Accessibility::Public,
            receivers: vec![receiver],
            type_params: Vec::new(),
            attributes: Vec::new(),
            members: Vec::new(),
        }
    }

    /// The single receiver, if exactly one was written.
    pub fn receiver(&self) -> Option<&ReceiverDescriptor> {
        match self.receivers.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }

    #[must_use]
    pub fn with_type_params(mut self, type_params: Vec<TypeParamDecl>) -> Self {
        self.type_params = type_params;
        self
    }

    #[must_use]
    pub fn with_member(mut self, member: MemberDecl) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn with_accessibility(mut self, accessibility: Accessibility) -> Self {
        self.accessibility = accessibility;
        self
    }

    #[must_use]
    pub fn with_receivers(mut self, receivers: Vec<ReceiverDescriptor>) -> Self {
        self.receivers = receivers;
        self
    }
}
