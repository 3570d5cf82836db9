//! Extension block compilation for Cinder.
//!
//! An extension block `extension<T>(R r) { ... }` declares members that
//! callers use as if they were members of the receiver type `R`. The
//! pipeline, in order:
//!
//! - **Shape checks** (`shape`): receiver and member rules per block
//! - **Encoding** (`encode`): a grouping key and a marker signature per block
//! - **Assignment** (`assign`): blocks with equal grouping keys share one
//!   synthesized container; ordinals are deterministic
//! - **Emission** (`emit`): containers, marker methods, skeleton members
//!   and the static forwarders that carry the implementations
//! - **Metadata** (`metadata`): writing, persisting and validated import
//!   of other modules' containers
//! - **Resolution** (`resolve`): `receiver.name(args)` lookup, betterness,
//!   pattern hooks and completion
//! - **Lowering** (`lvalue`): compound assignment through extension
//!   properties with single receiver evaluation
//! - **Cross-references** (`cref`): documentation references to members
//!
//! [`bind_extensions`] runs shape checks through emission for one
//! compilation.
//!
//! # Tracing
//!
//! Debug instrumentation uses `tracing`. Call [`init_tracing`] and set
//! `RUST_LOG=cinder_extensions=debug` to see it.

mod assign;
mod bind;
mod decl;
mod emit;
mod encode;
mod shape;
mod symbols;

pub mod cref;
pub mod lvalue;
pub mod metadata;
pub mod resolve;

#[cfg(test)]
mod test_support;

pub use assign::{
    container_type_name, parse_container_ordinal, Assignment, ContainerAssignor, ContainerSlot,
    EncodedBlock,
};
pub use bind::{bind_extensions, BindOptions, BindOutput};
pub use decl::{Accessors, ExtensionBlockDecl, MemberDecl, MemberKind, ReceiverDescriptor};
pub use emit::{emit, MARKER_METHOD_NAME};
pub use encode::{
    encode_attribute, encode_block, encode_constant, encode_receiver, error_signature,
    push_erased_type, shape_key, EncodedSignature, GroupingKey, MarkerSignature,
};
pub use shape::{check_block, ShapeCheck};
pub use symbols::{
    Container, ContainerId, ExtensionTable, ForwarderId, ForwarderMember, ForwarderRole,
    MarkerMethod, MemberId, Origin, SkeletonMember, UnsupportedReason,
};

pub use cref::{parse_cref, resolve_cref, CrefResolution, CrefTarget};
pub use lvalue::{
    lower_deconstruction, lower_extension_assignment, lower_ordinary_assignment,
    plan_receiver_capture, AssignOp, DeconstructionTarget, LoweredAssignment,
    LoweredDeconstruction, ReceiverCapture,
};
pub use metadata::{import_module, write_module, MetadataCache, MetadataError, MetadataModule};
pub use resolve::{
    completion_members, resolve_member, resolve_pattern, MemberQuery, PatternHook, Resolution,
    ResolveContext, Target,
};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // Another subscriber may already be installed by the host.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
