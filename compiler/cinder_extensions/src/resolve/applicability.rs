//! Candidate collection and applicability.
//!
//! Inference, substitution and constraint checks all happen in the caller's
//! type parameter scope (`ResolveContext::env`): once a candidate's own
//! parameters are inferred, every type compared is a call-site type.

use cinder_types::conversions::{classify, nullable_underlying, supertypes};
use cinder_types::infer::infer_lower_bound;
use cinder_types::value_category::{is_ref_like, value_category};
use cinder_types::{
    ConstraintFlags, ConversionKind, DefId, Idx, OrdinaryMember, OrdinaryMemberKind, ParamInfo,
    RefKind, Substitution, TypeData, TypeKind, TypeParamDecl, TypeParamOwner,
};
use rustc_hash::FxHashSet;

use super::{Argument, ExtensionTarget, LookupKind, MemberQuery, ResolveContext, Target};
use crate::symbols::{Container, MemberId, SkeletonMember};

#[derive(Copy, Clone, Debug)]
pub(super) enum CandidateSource {
    Ordinary { def: DefId, index: usize },
    Extension(MemberId),
}

/// An applicable member with everything betterness compares.
#[derive(Clone, Debug)]
pub(super) struct Candidate {
    pub source: CandidateSource,
    /// Declaring type; the sibling group for priority filtering.
    pub group: DefId,
    pub priority: i32,
    /// Substituted receiver type of instance extension members.
    pub receiver: Option<Idx>,
    pub receiver_ref_kind: RefKind,
    /// Substituted parameter types, one per argument.
    pub params: Vec<Idx>,
    pub type_args: Vec<Idx>,
    pub ret: Idx,
    /// Declares type parameters of its own or through its block.
    pub is_generic: bool,
}

impl Candidate {
    pub(super) fn into_target(self) -> Target {
        match self.source {
            CandidateSource::Ordinary { def, index } => Target::Ordinary {
                def,
                index,
                type_args: self.type_args,
            },
            CandidateSource::Extension(member) => Target::Extension(ExtensionTarget {
                member,
                type_args: self.type_args,
                receiver: self.receiver,
                receiver_ref_kind: self.receiver_ref_kind,
                ret: self.ret,
            }),
        }
    }
}

#[derive(Default)]
pub(super) struct Collected {
    pub applicable: Vec<Candidate>,
    /// Some member had the queried name, applicable or not.
    pub found_name: bool,
    /// A declaring type in scope has a block that failed its shape checks.
    pub error_container: bool,
}

// === Ordinary members ===

fn ordinary_kind_matches(kind: OrdinaryMemberKind, lookup: LookupKind) -> bool {
    matches!(
        (kind, lookup),
        (OrdinaryMemberKind::Method, LookupKind::Invocation)
            | (
                OrdinaryMemberKind::Property | OrdinaryMemberKind::Field,
                LookupKind::Property
            )
    )
}

/// Members of the receiver type, its base chain and interfaces.
pub(super) fn ordinary_candidates(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
    query: &MemberQuery<'_>,
) -> Collected {
    let registry = ctx.registry;
    let env = ctx.env;
    let mut chain = vec![ctx.pool.strip_nullable_ref(receiver)];
    chain.extend(supertypes(ctx.pool, registry, &env, receiver));

    let mut out = Collected::default();
    for ty in chain {
        let TypeData::Named { def, args } = ctx.pool.get(ty).clone() else {
            continue;
        };
        let outer = Substitution::from_args(TypeParamOwner::Type, &args);
        for (index, member) in registry.get(def).members.iter().enumerate() {
            if member.name != query.name || !ordinary_kind_matches(member.kind, query.kind) {
                continue;
            }
            out.found_name = true;
            if member.is_static != query.static_access || !ctx.can_access(def, member.accessibility)
            {
                continue;
            }
            if let Some(candidate) = ordinary_candidate(ctx, def, index, member, &outer, query.args) {
                out.applicable.push(candidate);
            }
        }
    }
    out
}

fn ordinary_candidate(
    ctx: &mut ResolveContext<'_>,
    def: DefId,
    index: usize,
    member: &OrdinaryMember,
    outer: &Substitution,
    args: &[Argument],
) -> Option<Candidate> {
    let bound = match_arguments(ctx, &member.params, &member.type_params, outer, args)?;
    let ret = substitute_both(ctx, member.ret, outer, &bound.method);
    Some(Candidate {
        source: CandidateSource::Ordinary { def, index },
        group: def,
        priority: 0,
        receiver: None,
        receiver_ref_kind: RefKind::None,
        params: bound.params,
        type_args: bound.type_args,
        ret,
        is_generic: !member.type_params.is_empty(),
    })
}

// === Extension members ===

/// A container's receiver bound to a call-site receiver.
struct BoundReceiver {
    /// Block type parameters to call-site types.
    subst: Substitution,
    block_args: Vec<Idx>,
    ty: Idx,
}

/// Skeletons of every visible container applicable to `receiver`.
pub(super) fn extension_candidates(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
    query: &MemberQuery<'_>,
) -> Collected {
    let table = ctx.table;
    let interner = ctx.interner;
    let scope = ctx.scope;
    let mut out = Collected::default();
    let mut seen = FxHashSet::default();
    for &declaring in scope {
        if !seen.insert(declaring) {
            continue;
        }
        for id in table.containers_of(declaring) {
            let container = table.container(id);
            if container.is_error() {
                out.error_container = true;
                continue;
            }
            let named: Vec<MemberId> = container
                .skeletons
                .iter()
                .copied()
                .filter(|&m| {
                    let skeleton = table.skeleton(m);
                    skeleton.name == query.name && query.kind.matches(skeleton.kind)
                })
                .collect();
            if named.is_empty() {
                continue;
            }
            out.found_name = true;
            if !ctx.can_access(declaring, container.accessibility) {
                continue;
            }
            let Some(bound) = bind_receiver(ctx, container, receiver, query.static_access) else {
                tracing::trace!(
                    container = %container.marker.signature,
                    "receiver does not apply"
                );
                continue;
            };
            for member in named {
                let skeleton = table.skeleton(member);
                if skeleton.is_static != query.static_access
                    || !ctx.can_access(declaring, skeleton.accessibility)
                {
                    continue;
                }
                match extension_candidate(ctx, container, member, skeleton, &bound, query.args) {
                    Some(candidate) => out.applicable.push(candidate),
                    None => tracing::trace!(
                        member = interner.lookup(skeleton.name),
                        "arguments do not apply"
                    ),
                }
            }
        }
    }
    out
}

/// Instance members of every container whose receiver applies, for
/// completion. Unsupported and inaccessible members are skipped.
pub(super) fn applicable_instance_members(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
) -> Vec<MemberId> {
    let table = ctx.table;
    let scope = ctx.scope;
    let mut out = Vec::new();
    let mut seen = FxHashSet::default();
    for &declaring in scope {
        if !seen.insert(declaring) {
            continue;
        }
        for id in table.containers_of(declaring) {
            let container = table.container(id);
            if container.is_error() || !ctx.can_access(declaring, container.accessibility) {
                continue;
            }
            if bind_receiver(ctx, container, receiver, false).is_none() {
                continue;
            }
            out.extend(container.skeletons.iter().copied().filter(|&m| {
                let skeleton = table.skeleton(m);
                !skeleton.is_static
                    && skeleton.is_supported()
                    && ctx.can_access(declaring, skeleton.accessibility)
            }));
        }
    }
    out
}

/// Infer the container's type arguments from `receiver` and check the
/// receiver converts to the substituted shape.
///
/// Static access and by-ref receivers require identity; by-value
/// receivers also accept implicit reference and boxing conversions.
fn bind_receiver(
    ctx: &mut ResolveContext<'_>,
    container: &Container,
    receiver: Idx,
    static_access: bool,
) -> Option<BoundReceiver> {
    let registry = ctx.registry;
    let env = ctx.env;
    let shape = &container.marker.receiver;
    let mut subst = Substitution::new();
    let arity = container.arity();
    if arity > 0
        && !infer_lower_bound(
            ctx.pool,
            registry,
            &env,
            TypeParamOwner::Block,
            shape.ty,
            receiver,
            &mut subst,
        )
    {
        return None;
    }
    let block_args = subst.args(TypeParamOwner::Block, arity)?;
    let ty = ctx.pool.substitute(shape.ty, &subst);

    let conversion = classify(ctx.pool, registry, &env, receiver, ty)?;
    let exact = static_access || shape.ref_kind.is_by_ref();
    let converts = if exact {
        conversion == ConversionKind::Identity
    } else {
        conversion.is_receiver_conversion()
    };
    if !converts {
        return None;
    }

    let satisfied = container
        .type_params
        .iter()
        .zip(&block_args)
        .all(|(decl, &arg)| satisfies(ctx, arg, decl, &subst, &Substitution::new()));
    satisfied.then_some(BoundReceiver {
        subst,
        block_args,
        ty,
    })
}

fn extension_candidate(
    ctx: &mut ResolveContext<'_>,
    container: &Container,
    member: MemberId,
    skeleton: &SkeletonMember,
    bound: &BoundReceiver,
    args: &[Argument],
) -> Option<Candidate> {
    let matched = match_arguments(ctx, &skeleton.params, &skeleton.type_params, &bound.subst, args)?;
    let ret = substitute_both(ctx, skeleton.ret, &bound.subst, &matched.method);
    let mut type_args = bound.block_args.clone();
    type_args.extend(matched.type_args);
    Some(Candidate {
        source: CandidateSource::Extension(member),
        group: container.declaring_type,
        priority: skeleton.effective_priority(),
        receiver: (!skeleton.is_static).then_some(bound.ty),
        receiver_ref_kind: container.marker.receiver.ref_kind,
        params: matched.params,
        type_args,
        ret,
        is_generic: container.arity() > 0 || !skeleton.type_params.is_empty(),
    })
}

// === Arguments ===

struct MatchedArguments {
    /// Member type parameters to call-site types.
    method: Substitution,
    type_args: Vec<Idx>,
    params: Vec<Idx>,
}

/// Infer member type arguments and check every argument converts.
///
/// `outer` binds the parameters of the enclosing type or block. Trailing
/// parameters with a default value may be omitted.
fn match_arguments(
    ctx: &mut ResolveContext<'_>,
    params: &[ParamInfo],
    type_params: &[TypeParamDecl],
    outer: &Substitution,
    args: &[Argument],
) -> Option<MatchedArguments> {
    if args.len() > params.len() || params[args.len()..].iter().any(|p| !p.has_default) {
        return None;
    }
    let registry = ctx.registry;
    let env = ctx.env;

    let patterns: Vec<Idx> = params
        .iter()
        .take(args.len())
        .map(|p| ctx.pool.substitute(p.ty, outer))
        .collect();

    let mut method = Substitution::new();
    if !type_params.is_empty() {
        for (&pattern, arg) in patterns.iter().zip(args) {
            if !infer_lower_bound(
                ctx.pool,
                registry,
                &env,
                TypeParamOwner::Method,
                pattern,
                arg.ty,
                &mut method,
            ) {
                return None;
            }
        }
    }
    let type_args = method.args(TypeParamOwner::Method, type_params.len())?;

    let satisfied = type_params
        .iter()
        .zip(&type_args)
        .all(|(decl, &arg)| satisfies(ctx, arg, decl, outer, &method));
    if !satisfied {
        return None;
    }

    let mut substituted = Vec::with_capacity(args.len());
    for ((&pattern, param), arg) in patterns.iter().zip(params).zip(args) {
        let ty = ctx.pool.substitute(pattern, &method);
        if !argument_converts(ctx, *arg, param.ref_kind, ty) {
            return None;
        }
        substituted.push(ty);
    }
    Some(MatchedArguments {
        method,
        type_args,
        params: substituted,
    })
}

/// `ref` parameters need a `ref` argument of the identical type; `in` and
/// `ref readonly` accept a by-reference argument of the identical type or
/// a value that converts.
fn argument_converts(ctx: &mut ResolveContext<'_>, arg: Argument, param: RefKind, ty: Idx) -> bool {
    let registry = ctx.registry;
    let env = ctx.env;
    match (param, arg.ref_kind) {
        (RefKind::None, RefKind::None) | (RefKind::In | RefKind::RefReadOnly, RefKind::None) => {
            classify(ctx.pool, registry, &env, arg.ty, ty).is_some()
        }
        (RefKind::Ref, RefKind::Ref)
        | (RefKind::In | RefKind::RefReadOnly, RefKind::In | RefKind::Ref | RefKind::RefReadOnly) => {
            ctx.pool.identical_erased(arg.ty, ty)
        }
        _ => false,
    }
}

fn substitute_both(ctx: &mut ResolveContext<'_>, ty: Idx, outer: &Substitution, method: &Substitution) -> Idx {
    let ty = ctx.pool.substitute(ty, outer);
    ctx.pool.substitute(ty, method)
}

// === Constraints ===

/// Whether `arg` satisfies the constraints of `decl`. Constraint types may
/// mention the parameters bound by `outer` and `method`.
pub(super) fn satisfies(
    ctx: &mut ResolveContext<'_>,
    arg: Idx,
    decl: &TypeParamDecl,
    outer: &Substitution,
    method: &Substitution,
) -> bool {
    let registry = ctx.registry;
    let env = ctx.env;
    let clause = &decl.constraints;
    let arg = ctx.pool.strip_nullable_ref(arg);
    let category = value_category(ctx.pool, registry, &env, arg);

    if clause.is_value_type_constraint()
        && (!category.is_value() || nullable_underlying(ctx.pool, registry, arg).is_some())
    {
        return false;
    }
    if clause.flags.contains(ConstraintFlags::UNMANAGED) && !is_unmanaged(ctx, arg) {
        return false;
    }
    if clause.flags.contains(ConstraintFlags::CLASS) && !category.is_reference() {
        return false;
    }
    if clause.flags.contains(ConstraintFlags::NEW) && !has_default_ctor(ctx, arg) {
        return false;
    }
    if !clause.flags.contains(ConstraintFlags::ALLOWS_REF_STRUCT)
        && is_ref_like(ctx.pool, registry, arg)
    {
        return false;
    }
    clause.types.iter().all(|&constraint| {
        let target = substitute_both(ctx, constraint, outer, method);
        classify(ctx.pool, registry, &env, arg, target).is_some_and(ConversionKind::is_receiver_conversion)
    })
}

fn is_unmanaged(ctx: &ResolveContext<'_>, ty: Idx) -> bool {
    match ctx.pool.get(ty) {
        TypeData::Predefined(p) => p.is_primitive_value_type(),
        TypeData::Pointer(_) | TypeData::FunctionPointer(_) => true,
        TypeData::Named { def, args } => {
            let kind = ctx.registry.get(*def).kind;
            kind == TypeKind::Enum
                || (kind == TypeKind::Struct && args.iter().all(|&a| is_unmanaged(ctx, a)))
        }
        TypeData::Tuple { elems, .. } => elems.iter().all(|&e| is_unmanaged(ctx, e)),
        TypeData::TypeParam(p) => ctx
            .env
            .constraints(*p)
            .is_some_and(|c| c.flags.contains(ConstraintFlags::UNMANAGED)),
        TypeData::NullableRef(inner) => is_unmanaged(ctx, *inner),
        TypeData::Array { .. } | TypeData::Error => false,
    }
}

fn has_default_ctor(ctx: &ResolveContext<'_>, ty: Idx) -> bool {
    match ctx.pool.get(ty) {
        TypeData::Predefined(p) => *p != Idx::STRING && *p != Idx::VOID,
        TypeData::Named { def, .. } => {
            let def = ctx.registry.get(*def);
            def.kind.is_value_type()
                || (def.kind == TypeKind::Class && def.has_default_ctor && !def.is_static)
        }
        TypeData::Tuple { .. } => true,
        TypeData::TypeParam(p) => ctx.env.constraints(*p).is_some_and(|c| {
            c.flags.contains(ConstraintFlags::NEW) || c.is_value_type_constraint()
        }),
        _ => false,
    }
}
