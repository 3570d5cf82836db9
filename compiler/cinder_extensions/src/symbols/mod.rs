//! Emitted extension symbols.
//!
//! Skeletons and forwarders are two independent records linked both ways
//! by id: a skeleton lists its forwarders, each forwarder names its
//! skeleton. Source emission and metadata import both produce an
//! [`ExtensionTable`]; resolution consumes tables without caring how they
//! were made.

use std::fmt;

use cinder_ir::{Name, SourceLoc, StringInterner};
use cinder_types::{
    Accessibility, DefId, Idx, ParamInfo, Pool, RefKind, TypeParamDecl, TypeRegistry,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::assign::container_type_name;
use crate::decl::{Accessors, MemberKind, ReceiverDescriptor};
use crate::encode::{GroupingKey, MarkerSignature};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[expect(
                clippy::cast_possible_truncation,
                reason = "symbol tables never approach u32::MAX entries"
            )]
            #[inline]
            fn from_index(index: usize) -> Self {
                $name(index as u32)
            }
        }
    };
}

define_id!(
    /// A synthesized container.
    ContainerId
);
define_id!(
    /// A skeleton member.
    MemberId
);
define_id!(
    /// A forwarder member.
    ForwarderId
);

/// Where a container came from.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Origin {
    /// Declared in the current compilation.
    Source,
    /// Read from a referenced module.
    Metadata { module: Name },
}

/// The reserved `<Extension>$` method of a container.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MarkerMethod {
    pub name: Name,
    /// Full receiver shape of the first contributing block.
    pub receiver: ReceiverDescriptor,
    pub signature: MarkerSignature,
}

/// A synthesized container type nested in a declaring type.
#[derive(Clone, Debug)]
pub struct Container {
    pub declaring_type: DefId,
    /// `None` for error containers, which are never emitted.
    pub ordinal: Option<u32>,
    pub grouping_key: GroupingKey,
    pub marker: MarkerMethod,
    pub accessibility: Accessibility,
    /// Type parameters of the first contributing block.
    pub type_params: Vec<TypeParamDecl>,
    pub skeletons: Vec<MemberId>,
    pub origin: Origin,
    pub loc: SourceLoc,
}

impl Container {
    #[inline]
    pub fn is_error(&self) -> bool {
        self.ordinal.is_none()
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.type_params.len()
    }

    /// `<>E__0`
    pub fn type_name(&self) -> String {
        container_type_name(self.ordinal)
    }

    /// ``<>E__0`1``
    pub fn metadata_name(&self) -> String {
        let mut name = self.type_name();
        if self.arity() > 0 {
            name.push('`');
            name.push_str(&self.arity().to_string());
        }
        name
    }
}

/// Why an imported member cannot be used.
///
/// Variants are ordered by validation stage; when several forwarder
/// candidates fail, the reason from the candidate that got furthest wins.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub enum UnsupportedReason {
    UndecodableSignature,
    MissingForwarder,
    ForwarderNotStatic,
    ParameterCountMismatch,
    GenericArityMismatch,
    AccessibilityMismatch,
    ReceiverMismatch,
    ParameterMismatch,
    ReturnTypeMismatch,
    ConstraintMismatch,
}

impl UnsupportedReason {
    pub const fn description(self) -> &'static str {
        match self {
            Self::UndecodableSignature => "its signature cannot be decoded",
            Self::MissingForwarder => "no implementation method was found",
            Self::ForwarderNotStatic => "its implementation method is not static",
            Self::ParameterCountMismatch => "its implementation method has the wrong number of parameters",
            Self::GenericArityMismatch => "its implementation method has the wrong number of type parameters",
            Self::AccessibilityMismatch => "its implementation method has different accessibility",
            Self::ReceiverMismatch => "its implementation method takes a different receiver",
            Self::ParameterMismatch => "its implementation method has different parameter types",
            Self::ReturnTypeMismatch => "its implementation method has a different return type",
            Self::ConstraintMismatch => "its implementation method has different constraints",
        }
    }
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A member as declared inside a block, hosted on its container.
#[derive(Clone, Debug)]
pub struct SkeletonMember {
    pub container: ContainerId,
    pub name: Name,
    pub kind: MemberKind,
    pub is_static: bool,
    pub accessibility: Accessibility,
    /// Own type parameters (`Method` owner).
    pub type_params: Vec<TypeParamDecl>,
    pub params: Vec<ParamInfo>,
    pub ret: Idx,
    pub ret_ref_kind: RefKind,
    pub accessors: Accessors,
    pub priority: Option<i32>,
    /// Method forwarder, or getter then setter.
    pub forwarders: SmallVec<[ForwarderId; 2]>,
    pub unsupported: Option<UnsupportedReason>,
    pub loc: SourceLoc,
}

impl SkeletonMember {
    /// Overload resolution priority, zero when not marked.
    #[inline]
    pub fn effective_priority(&self) -> i32 {
        self.priority.unwrap_or(0)
    }

    #[inline]
    pub fn is_supported(&self) -> bool {
        self.unsupported.is_none()
    }
}

/// What a forwarder implements.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ForwarderRole {
    Method,
    Getter,
    Setter,
}

/// The callable static method on the declaring type.
#[derive(Clone, Debug)]
pub struct ForwarderMember {
    /// Member name for methods, `get_X`/`set_X` for accessors.
    pub name: Name,
    pub declaring_type: DefId,
    pub role: ForwarderRole,
    pub accessibility: Accessibility,
    pub is_static: bool,
    /// Container type parameters followed by member type parameters.
    pub type_params: Vec<TypeParamDecl>,
    /// Receiver first for instance members, then the skeleton's parameters.
    pub params: Vec<ParamInfo>,
    pub ret: Idx,
    pub ret_ref_kind: RefKind,
    pub has_receiver: bool,
    pub skeleton: MemberId,
}

/// Every known extension container with its members.
#[derive(Clone, Debug, Default)]
pub struct ExtensionTable {
    containers: Vec<Container>,
    skeletons: Vec<SkeletonMember>,
    forwarders: Vec<ForwarderMember>,
    by_declaring_type: FxHashMap<DefId, Vec<ContainerId>>,
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    // === Construction ===

    pub(crate) fn push_container(&mut self, container: Container) -> ContainerId {
        let id = ContainerId::from_index(self.containers.len());
        self.by_declaring_type
            .entry(container.declaring_type)
            .or_default()
            .push(id);
        self.containers.push(container);
        id
    }

    pub(crate) fn push_skeleton(&mut self, skeleton: SkeletonMember) -> MemberId {
        let id = MemberId::from_index(self.skeletons.len());
        let container = skeleton.container;
        self.skeletons.push(skeleton);
        self.containers[container.index()].skeletons.push(id);
        id
    }

    pub(crate) fn push_forwarder(&mut self, forwarder: ForwarderMember) -> ForwarderId {
        let id = ForwarderId::from_index(self.forwarders.len());
        let skeleton = forwarder.skeleton;
        self.forwarders.push(forwarder);
        self.skeletons[skeleton.index()].forwarders.push(id);
        id
    }

    pub(crate) fn skeleton_mut(&mut self, id: MemberId) -> &mut SkeletonMember {
        &mut self.skeletons[id.index()]
    }

    // === Queries ===

    #[inline]
    pub fn container(&self, id: ContainerId) -> &Container {
        &self.containers[id.index()]
    }

    #[inline]
    pub fn skeleton(&self, id: MemberId) -> &SkeletonMember {
        &self.skeletons[id.index()]
    }

    #[inline]
    pub fn forwarder(&self, id: ForwarderId) -> &ForwarderMember {
        &self.forwarders[id.index()]
    }

    pub fn containers(&self) -> impl Iterator<Item = (ContainerId, &Container)> {
        self.containers
            .iter()
            .enumerate()
            .map(|(i, c)| (ContainerId::from_index(i), c))
    }

    /// Containers of one declaring type, in emission order.
    pub fn containers_of(&self, declaring_type: DefId) -> impl Iterator<Item = ContainerId> + '_ {
        self.by_declaring_type
            .get(&declaring_type)
            .into_iter()
            .flatten()
            .copied()
    }

    pub fn skeletons(&self) -> impl Iterator<Item = (MemberId, &SkeletonMember)> {
        self.skeletons
            .iter()
            .enumerate()
            .map(|(i, s)| (MemberId::from_index(i), s))
    }

    pub fn forwarders(&self) -> impl Iterator<Item = (ForwarderId, &ForwarderMember)> {
        self.forwarders
            .iter()
            .enumerate()
            .map(|(i, f)| (ForwarderId::from_index(i), f))
    }

    /// The forwarder of `skeleton` with the given role.
    pub fn forwarder_of(&self, skeleton: MemberId, role: ForwarderRole) -> Option<ForwarderId> {
        self.skeleton(skeleton)
            .forwarders
            .iter()
            .copied()
            .find(|&f| self.forwarder(f).role == role)
    }

    /// Whether `declaring_type` has an error container (a block that failed
    /// its shape checks).
    pub fn has_error_container(&self, declaring_type: DefId) -> bool {
        self.containers_of(declaring_type)
            .any(|id| self.container(id).is_error())
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn skeleton_count(&self) -> usize {
        self.skeletons.len()
    }

    pub fn forwarder_count(&self) -> usize {
        self.forwarders.len()
    }

    /// `App.Extensions.extension(int x).M<T>(string)`, for diagnostics.
    pub fn display_member(
        &self,
        id: MemberId,
        pool: &Pool,
        registry: &TypeRegistry,
        interner: &StringInterner,
    ) -> String {
        let skeleton = self.skeleton(id);
        let container = self.container(skeleton.container);
        let mut out = registry.qualified_name(container.declaring_type, interner);
        out.push('.');
        out.push_str(container.marker.signature.as_str());
        out.push('.');
        out.push_str(interner.lookup(skeleton.name));
        if !skeleton.type_params.is_empty() {
            out.push('<');
            for (i, param) in skeleton.type_params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(interner.lookup(param.name));
            }
            out.push('>');
        }
        if skeleton.kind != MemberKind::Property {
            let (open, close) = if skeleton.kind == MemberKind::Indexer {
                ('[', ']')
            } else {
                ('(', ')')
            };
            out.push(open);
            for (i, param) in skeleton.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if param.ref_kind.is_by_ref() {
                    out.push_str(param.ref_kind.keyword());
                    out.push(' ');
                }
                pool.display_into(param.ty, registry, interner, &mut out);
            }
            out.push(close);
        }
        out
    }
}
