//! Declaration-shape validation of extension blocks.
//!
//! Runs once per block before encoding. Problems are reported at the
//! declaration site and never stop binding: a block whose receiver is
//! malformed continues with the error grouping key, and a member of a
//! disallowed kind is dropped from emission.

use cinder_diagnostic::{Diagnostic, ErrorCode};
use cinder_ir::{SourceLoc, StringInterner};
use cinder_types::value_category::{value_category, ValueCategory};
use cinder_types::{GenericEnv, Idx, Pool, TypeData, TypeParamOwner, TypeRegistry};

use crate::decl::{ExtensionBlockDecl, MemberDecl, ReceiverDescriptor};

/// Outcome of checking one block.
#[derive(Clone, Debug, Default)]
pub struct ShapeCheck {
    pub diagnostics: Vec<(Diagnostic, SourceLoc)>,
    /// Whether the receiver can be encoded into a real grouping key.
    pub receiver_valid: bool,
}

impl ShapeCheck {
    fn report(&mut self, diag: Diagnostic, loc: SourceLoc) {
        self.diagnostics.push((diag, loc));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|(d, _)| d.is_error())
    }
}

/// Validate the declaration shape of `block`.
#[tracing::instrument(level = "trace", skip_all, fields(decl = block.declaring_type.raw()))]
pub fn check_block(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    block: &ExtensionBlockDecl,
) -> ShapeCheck {
    let mut check = ShapeCheck {
        diagnostics: Vec::new(),
        receiver_valid: true,
    };
    let loc = block.loc;

    if let Some(problem) = declaring_type_problem(registry, block) {
        check.report(
            Diagnostic::error(ErrorCode::E3010)
                .with_message(format!(
                    "extension blocks must be declared in a non-generic, top-level static class; `{}` is {problem}",
                    registry.qualified_name(block.declaring_type, interner)
                ))
                .with_label(loc.span, "declared here"),
            loc,
        );
        check.receiver_valid = false;
    }

    let receiver = match block.receivers.as_slice() {
        [] => {
            check.report(
                Diagnostic::error(ErrorCode::E3001)
                    .with_message("extension block has no receiver parameter")
                    .with_label(loc.span, "expected exactly one receiver"),
                loc,
            );
            check.receiver_valid = false;
            None
        }
        [single] => Some(single),
        [_, extra, ..] => {
            check.report(
                Diagnostic::error(ErrorCode::E3002)
                    .with_message(format!(
                        "extension block declares {} receiver parameters",
                        block.receivers.len()
                    ))
                    .with_label(extra.span, "additional receiver"),
                loc,
            );
            check.receiver_valid = false;
            None
        }
    };

    if let Some(receiver) = receiver {
        check_receiver(pool, registry, interner, block, receiver, &mut check);
        check_type_params_referenced(pool, interner, block, receiver, &mut check);
    }

    for member in &block.members {
        check_member(block, receiver, member, &mut check);
    }

    if !check.diagnostics.is_empty() {
        tracing::debug!(
            count = check.diagnostics.len(),
            receiver_valid = check.receiver_valid,
            "extension block shape problems"
        );
    }
    check
}

fn declaring_type_problem(registry: &TypeRegistry, block: &ExtensionBlockDecl) -> Option<&'static str> {
    let def = registry.get(block.declaring_type);
    if !def.is_static {
        Some("not static")
    } else if def.arity() > 0 {
        Some("generic")
    } else if def.containing.is_some() {
        Some("nested")
    } else {
        None
    }
}

fn check_receiver(
    pool: &Pool,
    registry: &TypeRegistry,
    interner: &StringInterner,
    block: &ExtensionBlockDecl,
    receiver: &ReceiverDescriptor,
    check: &mut ShapeCheck,
) {
    let loc = SourceLoc::new(block.loc.file, receiver.span);
    if pool.contains_error(receiver.ty) {
        // Already reported by whoever failed to bind the type.
        check.receiver_valid = false;
        return;
    }

    if let Some(what) = disallowed_receiver_type(pool, registry, receiver.ty) {
        check.report(
            Diagnostic::error(ErrorCode::E3003)
                .with_message(format!(
                    "`{}` cannot be extended: {what}",
                    pool.display(receiver.ty, registry, interner)
                ))
                .with_label(receiver.span, "receiver type"),
            loc,
        );
        check.receiver_valid = false;
    }

    if receiver.ref_kind.is_by_ref() {
        let env = GenericEnv::block(&block.type_params);
        let category = value_category(pool, registry, &env, receiver.ty);
        let is_type_param = pool.as_type_param(receiver.ty).is_some();
        if receiver.ref_kind.is_readonly_ref() && is_type_param {
            check.report(
                Diagnostic::error(ErrorCode::E3005)
                    .with_message(format!(
                        "`{}` receiver cannot be a type parameter",
                        receiver.ref_kind.keyword()
                    ))
                    .with_label(receiver.span, "type parameter receiver"),
                loc,
            );
            check.receiver_valid = false;
        } else if category != ValueCategory::Value {
            check.report(
                Diagnostic::error(ErrorCode::E3004)
                    .with_message(format!(
                        "`{}` receiver must be a value type, found `{}`",
                        receiver.ref_kind.keyword(),
                        pool.display(receiver.ty, registry, interner)
                    ))
                    .with_label(receiver.span, "not a value type")
                    .with_suggestion("pass the receiver by value"),
                loc,
            );
            check.receiver_valid = false;
        }
    }

    if receiver.default_value.is_some() {
        check.report(
            Diagnostic::error(ErrorCode::E3008)
                .with_message("receiver parameter cannot have a default value")
                .with_label(receiver.span, "default value"),
            loc,
        );
        check.receiver_valid = false;
    }
}

fn disallowed_receiver_type(pool: &Pool, registry: &TypeRegistry, ty: Idx) -> Option<&'static str> {
    match pool.get(pool.strip_nullable_ref(ty)) {
        TypeData::Predefined(Idx::VOID) => Some("`void` is not a value"),
        TypeData::Named { def, .. } if registry.get(*def).is_static => {
            Some("static classes cannot be extended")
        }
        TypeData::TypeParam(p) if p.owner != TypeParamOwner::Block => {
            Some("only the block's own type parameters may appear in the receiver")
        }
        _ => None,
    }
}

fn check_type_params_referenced(
    pool: &Pool,
    interner: &StringInterner,
    block: &ExtensionBlockDecl,
    receiver: &ReceiverDescriptor,
    check: &mut ShapeCheck,
) {
    for (ordinal, param) in (0u32..).zip(&block.type_params) {
        let referenced = pool.mentions_type_param(receiver.ty, &|p| {
            p.owner == TypeParamOwner::Block && p.ordinal == ordinal
        });
        if !referenced {
            check.report(
                Diagnostic::error(ErrorCode::E3006)
                    .with_message(format!(
                        "type parameter `{}` is not referenced by the receiver and cannot be inferred",
                        interner.lookup(param.name)
                    ))
                    .with_label(receiver.span, "receiver"),
                block.loc,
            );
        }
    }
}

fn check_member(
    block: &ExtensionBlockDecl,
    receiver: Option<&ReceiverDescriptor>,
    member: &MemberDecl,
    check: &mut ShapeCheck,
) {
    let loc = SourceLoc::new(block.loc.file, member.span);
    if !member.kind.is_allowed() {
        check.report(
            Diagnostic::error(ErrorCode::E3007)
                .with_message(format!(
                    "a {} cannot be declared in an extension block",
                    member.kind.description()
                ))
                .with_label(member.span, "not allowed here"),
            loc,
        );
        return;
    }
    let unnamed = receiver.is_some_and(|r| r.name.is_none());
    if !member.is_static && unnamed {
        check.report(
            Diagnostic::error(ErrorCode::E3009)
                .with_message("instance member requires a named receiver parameter")
                .with_label(member.span, "instance member")
                .with_suggestion("name the receiver or make the member static"),
            loc,
        );
    }
}
