//! Member Forwarder/Emitter.
//!
//! Turns assigned blocks into symbols. Every allowed member becomes a
//! skeleton on its container plus one forwarder (methods) or a getter and
//! setter pair (properties and indexers) on the declaring type. Each
//! numbered container gets exactly one marker method built from the
//! receiver of its first contributing block.
//!
//! Forwarder types stay in the block/member parameter space: a forwarder
//! is generic over the block's parameters followed by the member's, and
//! the metadata writer renumbers them when lowering.

use cinder_ir::{Name, SourceLoc, StringInterner};
use cinder_types::{Accessibility, Idx, ParamInfo, Pool, RefKind, TypeRegistry};
use smallvec::SmallVec;

use crate::assign::{Assignment, ContainerSlot};
use crate::decl::{ExtensionBlockDecl, MemberDecl, MemberKind, ReceiverDescriptor};
use crate::encode::{encode_block, error_signature};
use crate::symbols::{
    Container, ContainerId, ExtensionTable, ForwarderMember, ForwarderRole, MarkerMethod, Origin,
    SkeletonMember,
};

/// Reserved name of the per-container marker method.
pub const MARKER_METHOD_NAME: &str = "<Extension>$";

/// Emit symbols for every assigned block.
#[tracing::instrument(level = "debug", skip_all, fields(slots = assignment.len()))]
pub fn emit(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    assignment: &Assignment,
    decls: &[ExtensionBlockDecl],
) -> ExtensionTable {
    let mut emitter = Emitter {
        interner,
        table: ExtensionTable::new(),
        marker_name: interner.intern(MARKER_METHOD_NAME),
        value_name: interner.intern("value"),
    };
    for slot in assignment.slots() {
        emitter.emit_slot(pool, registry, slot, decls);
    }
    tracing::debug!(
        containers = emitter.table.container_count(),
        skeletons = emitter.table.skeleton_count(),
        forwarders = emitter.table.forwarder_count(),
        "emitted extension symbols"
    );
    emitter.table
}

struct Emitter<'a> {
    interner: &'a StringInterner,
    table: ExtensionTable,
    marker_name: Name,
    value_name: Name,
}

impl Emitter<'_> {
    fn emit_slot(
        &mut self,
        pool: &Pool,
        registry: &TypeRegistry,
        slot: &ContainerSlot,
        decls: &[ExtensionBlockDecl],
    ) {
        let Some(first) = slot.blocks.first().and_then(|&i| decls.get(i)) else {
            return;
        };

        if slot.is_error() {
            // Kept so resolution can suppress cascades, never populated.
            self.table.push_container(Container {
                declaring_type: slot.declaring_type,
                ordinal: None,
                grouping_key: slot.grouping_key.clone(),
                marker: MarkerMethod {
                    name: self.marker_name,
                    receiver: first
                        .receivers
                        .first()
                        .cloned()
                        .unwrap_or_else(|| ReceiverDescriptor::unnamed(Idx::ERROR)),
                    signature: error_signature().marker,
                },
                accessibility: first.accessibility,
                type_params: first.type_params.clone(),
                skeletons: Vec::new(),
                origin: Origin::Source,
                loc: first.loc,
            });
            return;
        }

        let Some(receiver) = first.receiver() else {
            tracing::warn!(block = slot.blocks[0], "numbered container without a receiver");
            return;
        };

        let declaring_access = registry.get(slot.declaring_type).accessibility;
        let accessibility = slot
            .blocks
            .iter()
            .filter_map(|&i| decls.get(i))
            .map(|b| b.accessibility)
            .fold(declaring_access, Accessibility::min);

        let signature = encode_block(pool, registry, self.interner, first);
        let container = self.table.push_container(Container {
            declaring_type: slot.declaring_type,
            ordinal: slot.ordinal,
            grouping_key: slot.grouping_key.clone(),
            marker: MarkerMethod {
                name: self.marker_name,
                receiver: receiver.clone(),
                signature: signature.marker,
            },
            accessibility,
            type_params: first.type_params.clone(),
            skeletons: Vec::new(),
            origin: Origin::Source,
            loc: first.loc,
        });

        for block in slot.blocks.iter().filter_map(|&i| decls.get(i)) {
            for member in block.members.iter().filter(|m| m.kind.is_allowed()) {
                self.emit_member(container, block, member);
            }
        }
    }

    fn emit_member(&mut self, container: ContainerId, block: &ExtensionBlockDecl, member: &MemberDecl) {
        let skeleton = self.table.push_skeleton(SkeletonMember {
            container,
            name: member.name,
            kind: member.kind,
            is_static: member.is_static,
            accessibility: member.accessibility,
            type_params: member.type_params.clone(),
            params: member.params.clone(),
            ret: member.ret,
            ret_ref_kind: member.ret_ref_kind,
            accessors: member.accessors,
            priority: member.priority,
            forwarders: SmallVec::new(),
            unsupported: None,
            loc: SourceLoc::new(block.loc.file, member.span),
        });

        let mut type_params = block.type_params.clone();
        type_params.extend(member.type_params.iter().cloned());

        let mut base_params = Vec::with_capacity(member.params.len() + 1);
        let has_receiver = !member.is_static;
        if has_receiver {
            if let Some(receiver) = block.receiver() {
                base_params.push(receiver.as_param());
            }
        }
        base_params.extend(member.params.iter().cloned());

        let forwarder = |name: Name,
                         role: ForwarderRole,
                         params: Vec<ParamInfo>,
                         ret: Idx,
                         ret_ref_kind: RefKind| {
            ForwarderMember {
                name,
                declaring_type: block.declaring_type,
                role,
                accessibility: member.accessibility,
                is_static: true,
                type_params: type_params.clone(),
                params,
                ret,
                ret_ref_kind,
                has_receiver,
                skeleton,
            }
        };

        if member.kind == MemberKind::Method {
            let f = forwarder(
                member.name,
                ForwarderRole::Method,
                base_params,
                member.ret,
                member.ret_ref_kind,
            );
            self.table.push_forwarder(f);
            return;
        }

        if member.accessors.get {
            let name = self.accessor_name("get_", member.name);
            let f = forwarder(
                name,
                ForwarderRole::Getter,
                base_params.clone(),
                member.ret,
                member.ret_ref_kind,
            );
            self.table.push_forwarder(f);
        }
        if member.accessors.set {
            let name = self.accessor_name("set_", member.name);
            let mut params = base_params;
            params.push(ParamInfo::new(self.value_name, member.ret));
            let f = forwarder(name, ForwarderRole::Setter, params, Idx::VOID, RefKind::None);
            self.table.push_forwarder(f);
        }
    }

    fn accessor_name(&self, prefix: &str, member: Name) -> Name {
        let mut name = String::from(prefix);
        name.push_str(self.interner.lookup(member));
        self.interner.intern(&name)
    }
}
