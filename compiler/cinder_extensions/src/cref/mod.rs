//! Documentation cross-references to extension members.
//!
//! A reference names the receiver shape rather than the synthesized
//! container, so `extension(int).M(string)` finds `M` in whichever
//! container of the declaring type has an `int` receiver. Constraints
//! cannot be spelled, so containers match on the constraint-free
//! [`shape_key`]. Resolved references render as documentation ids.

mod parse;

pub use parse::{parse_cref, Cref, CrefError, CrefErrorKind, CrefParam, CrefType};

use cinder_diagnostic::{Diagnostic, ErrorCode};
use cinder_ir::{Name, Span};
use cinder_types::value_category::value_category;
use cinder_types::{DefId, Idx, RefKind, TypeData, TypeParamOwner};

use crate::decl::MemberKind;
use crate::encode::{shape_key, GroupingKey};
use crate::resolve::ResolveContext;
use crate::symbols::MemberId;

/// What a cross-reference denotes.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum CrefTarget {
    Member { member: MemberId, doc_id: String },
    /// Placeholder for a reference that did not resolve: `!:text`.
    Unresolved { doc_id: String },
}

impl CrefTarget {
    pub fn doc_id(&self) -> &str {
        match self {
            CrefTarget::Member { doc_id, .. } | CrefTarget::Unresolved { doc_id } => doc_id,
        }
    }

    pub fn member(&self) -> Option<MemberId> {
        match self {
            CrefTarget::Member { member, .. } => Some(*member),
            CrefTarget::Unresolved { .. } => None,
        }
    }
}

/// A resolved cross-reference and the warnings it produced.
#[derive(Clone, Debug)]
pub struct CrefResolution {
    pub target: CrefTarget,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve `text`, written in documentation of `declaring`, against that
/// type's extension containers.
///
/// Never fails: malformed and unresolved references yield a placeholder
/// target with a warning, and ambiguous ones resolve to the first match
/// in declaration order.
#[tracing::instrument(level = "debug", skip_all, fields(text = %text))]
pub fn resolve_cref(
    ctx: &mut ResolveContext<'_>,
    declaring: DefId,
    text: &str,
    span: Span,
) -> CrefResolution {
    let cref = match parse_cref(ctx.interner, text) {
        Ok(cref) => cref,
        Err(err) => {
            let diag = Diagnostic::warning(ErrorCode::E3202)
                .with_message(format!("malformed cross-reference `{text}`"))
                .with_label(span, err.to_string());
            return unresolved(text, diag);
        }
    };

    let matches = find_members(ctx, declaring, &cref);
    let Some(&first) = matches.first() else {
        let diag = Diagnostic::warning(ErrorCode::E3201)
            .with_message(format!(
                "cross-reference `{text}` does not resolve to an extension member"
            ))
            .with_label(span, "unresolved cross-reference");
        return unresolved(text, diag);
    };

    let mut diagnostics = Vec::new();
    if matches.len() > 1 {
        let mut diag = Diagnostic::warning(ErrorCode::E3203)
            .with_message(format!("ambiguous cross-reference `{text}`"))
            .with_label(span, "matches more than one member");
        for &member in &matches {
            let display = ctx
                .table
                .display_member(member, ctx.pool, ctx.registry, ctx.interner);
            diag = diag.with_note(format!("candidate: {display}"));
        }
        diagnostics.push(diag);
    }
    tracing::debug!(matches = matches.len(), "resolved cross-reference");
    CrefResolution {
        target: CrefTarget::Member {
            member: first,
            doc_id: doc_id(ctx, first),
        },
        diagnostics,
    }
}

fn unresolved(text: &str, diag: Diagnostic) -> CrefResolution {
    CrefResolution {
        target: CrefTarget::Unresolved {
            doc_id: format!("!:{text}"),
        },
        diagnostics: vec![diag],
    }
}

// === Matching ===

fn find_members(ctx: &mut ResolveContext<'_>, declaring: DefId, cref: &Cref) -> Vec<MemberId> {
    let names = TypeParamNames {
        block: &cref.type_params,
        method: &cref.member_type_params,
    };
    let Some(receiver) = lower_type(ctx, declaring, names, &cref.receiver.ty) else {
        return Vec::new();
    };
    let key = receiver_key(ctx, cref.receiver.ref_kind, receiver, cref.type_params.len());
    let params: Option<Vec<(RefKind, Idx)>> = match &cref.params {
        None => None,
        Some(params) => {
            let mut lowered = Vec::with_capacity(params.len());
            for param in params {
                let Some(ty) = lower_type(ctx, declaring, names, &param.ty) else {
                    return Vec::new();
                };
                lowered.push((param.ref_kind, ty));
            }
            Some(lowered)
        }
    };

    let table = ctx.table;
    let mut found = Vec::new();
    for id in table.containers_of(declaring) {
        let container = table.container(id);
        if container.is_error() {
            continue;
        }
        let receiver = &container.marker.receiver;
        if receiver_key(ctx, receiver.ref_kind, receiver.ty, container.arity()) != key {
            continue;
        }
        for &member in &container.skeletons {
            let skeleton = table.skeleton(member);
            if skeleton.name != cref.member {
                continue;
            }
            if !cref.member_type_params.is_empty()
                && skeleton.type_params.len() != cref.member_type_params.len()
            {
                continue;
            }
            let params_match = match &params {
                None => true,
                Some(params) => {
                    params.len() == skeleton.params.len()
                        && params.iter().zip(&skeleton.params).all(|(&(rk, ty), param)| {
                            rk.is_by_ref() == param.ref_kind.is_by_ref()
                                && ctx.pool.identical_erased(ty, param.ty)
                        })
                }
            };
            if params_match {
                found.push(member);
            }
        }
    }
    found
}

fn receiver_key(ctx: &ResolveContext<'_>, ref_kind: RefKind, ty: Idx, arity: usize) -> GroupingKey {
    shape_key(ctx.pool, ctx.registry, ctx.interner, ref_kind, ty, arity)
}

#[derive(Copy, Clone)]
struct TypeParamNames<'c> {
    block: &'c [Name],
    method: &'c [Name],
}

/// Bind a spelled type. `None` when a name does not resolve.
fn lower_type(
    ctx: &mut ResolveContext<'_>,
    declaring: DefId,
    names: TypeParamNames<'_>,
    ty: &CrefType,
) -> Option<Idx> {
    match ty {
        CrefType::Path { segments, args } => {
            let args: Vec<Idx> = args
                .iter()
                .map(|arg| lower_type(ctx, declaring, names, arg))
                .collect::<Option<_>>()?;
            lower_path(ctx, declaring, names, segments, &args)
        }
        CrefType::Tuple(elems) => {
            let elems: Vec<Idx> = elems
                .iter()
                .map(|elem| lower_type(ctx, declaring, names, elem))
                .collect::<Option<_>>()?;
            Some(ctx.pool.tuple(&elems, &[]))
        }
        CrefType::Array { elem, rank } => {
            let elem = lower_type(ctx, declaring, names, elem)?;
            Some(ctx.pool.array(elem, *rank))
        }
        CrefType::Pointer(elem) => {
            let elem = lower_type(ctx, declaring, names, elem)?;
            Some(ctx.pool.pointer(elem))
        }
        CrefType::Nullable(inner) => {
            let inner = lower_type(ctx, declaring, names, inner)?;
            if value_category(ctx.pool, ctx.registry, &ctx.env, inner).is_value() {
                let nullable = ctx.registry.well_known().nullable;
                Some(ctx.pool.named(nullable, &[inner]))
            } else {
                Some(ctx.pool.nullable_ref(inner))
            }
        }
    }
}

fn lower_path(
    ctx: &mut ResolveContext<'_>,
    declaring: DefId,
    names: TypeParamNames<'_>,
    segments: &[Name],
    args: &[Idx],
) -> Option<Idx> {
    let (&last, qualifier) = segments.split_last()?;
    if qualifier.is_empty() && args.is_empty() {
        if let Some(idx) = Idx::from_keyword(ctx.interner.lookup(last)) {
            return Some(idx);
        }
        // Member type parameters shadow block type parameters.
        if let Some(ordinal) = names.method.iter().rposition(|&n| n == last) {
            return Some(type_param(ctx, TypeParamOwner::Method, ordinal, last));
        }
        if let Some(ordinal) = names.block.iter().rposition(|&n| n == last) {
            return Some(type_param(ctx, TypeParamOwner::Block, ordinal, last));
        }
    }

    let namespaces: Vec<Name> = if qualifier.is_empty() {
        let own = ctx.registry.get(declaring).namespace;
        vec![own, Name::EMPTY, ctx.interner.intern("System")]
    } else {
        let dotted: Vec<&str> = qualifier.iter().map(|&n| ctx.interner.lookup(n)).collect();
        let full = format!("{}.{}", dotted.join("."), ctx.interner.lookup(last));
        if args.is_empty() {
            if let Some(idx) = Idx::from_metadata_name(&full) {
                return Some(idx);
            }
        }
        vec![ctx.interner.intern(&dotted.join("."))]
    };
    let def = namespaces
        .into_iter()
        .find_map(|ns| ctx.registry.lookup(ns, last, args.len(), None))?;
    Some(ctx.pool.named(def, args))
}

fn type_param(ctx: &mut ResolveContext<'_>, owner: TypeParamOwner, ordinal: usize, name: Name) -> Idx {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "type parameter lists are far shorter than u32::MAX"
    )]
    let ordinal = ordinal as u32;
    ctx.pool.type_param(owner, ordinal, name)
}

// === Documentation ids ===

/// `M:App.Extensions.<>E__0.M(System.Int32)`
fn doc_id(ctx: &ResolveContext<'_>, member: MemberId) -> String {
    let skeleton = ctx.table.skeleton(member);
    let container = ctx.table.container(skeleton.container);
    let prefix = match skeleton.kind {
        MemberKind::Property | MemberKind::Indexer => "P:",
        MemberKind::Field => "F:",
        MemberKind::Event => "E:",
        MemberKind::NestedType => "T:",
        _ => "M:",
    };
    let mut out = String::from(prefix);
    out.push_str(&ctx.registry.qualified_name(container.declaring_type, ctx.interner));
    out.push('.');
    out.push_str(&container.metadata_name());
    out.push('.');
    out.push_str(ctx.interner.lookup(skeleton.name));
    if !skeleton.type_params.is_empty() {
        out.push_str("``");
        out.push_str(&skeleton.type_params.len().to_string());
    }
    let has_param_list = matches!(skeleton.kind, MemberKind::Method | MemberKind::Indexer);
    if has_param_list && !skeleton.params.is_empty() {
        out.push('(');
        for (i, param) in skeleton.params.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_doc_type(ctx, param.ty, &mut out);
            if param.ref_kind.is_by_ref() {
                out.push('@');
            }
        }
        out.push(')');
    }
    out
}

fn push_doc_type(ctx: &ResolveContext<'_>, ty: Idx, out: &mut String) {
    match ctx.pool.get(ty) {
        TypeData::Predefined(p) => out.push_str(p.metadata_name().unwrap_or("?")),
        TypeData::Error => out.push('?'),
        TypeData::Named { def, args } => {
            out.push_str(&ctx.registry.qualified_name(*def, ctx.interner));
            push_doc_args(ctx, args, out);
        }
        TypeData::TypeParam(p) => {
            out.push_str(if p.owner == TypeParamOwner::Method { "``" } else { "`" });
            out.push_str(&p.ordinal.to_string());
        }
        TypeData::Array { elem, rank } => {
            push_doc_type(ctx, *elem, out);
            if *rank == 1 {
                out.push_str("[]");
            } else {
                out.push('[');
                for i in 0..*rank {
                    if i > 0 {
                        out.push(',');
                    }
                    out.push_str("0:");
                }
                out.push(']');
            }
        }
        TypeData::Pointer(elem) => {
            push_doc_type(ctx, *elem, out);
            out.push('*');
        }
        TypeData::NullableRef(inner) => push_doc_type(ctx, *inner, out),
        TypeData::Tuple { elems, .. } => {
            out.push_str("System.ValueTuple");
            push_doc_args(ctx, elems, out);
        }
        TypeData::FunctionPointer(_) => {
            out.push_str(&ctx.pool.display(ty, ctx.registry, ctx.interner));
        }
    }
}

fn push_doc_args(ctx: &ResolveContext<'_>, args: &[Idx], out: &mut String) {
    if args.is_empty() {
        return;
    }
    out.push('{');
    for (i, &arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_doc_type(ctx, arg, out);
    }
    out.push('}');
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
