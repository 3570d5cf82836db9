//! Member Resolution Engine.
//!
//! Lookup of `receiver.name(args)` against ordinary members and every
//! visible extension container:
//!
//! 1. applicable ordinary members of the receiver type and its bases win
//!    outright
//! 2. otherwise extension candidates are collected from the declaring
//!    types in scope, and within each declaring type members below the
//!    highest overload resolution priority are discarded
//! 3. betterness picks the winner; residual ties are an ambiguity listing
//!    every survivor
//!
//! Pattern-based lowering (deconstruction, `foreach`, collection
//! initializers, `fixed`, `await`, `using`) asks the same lookup under a
//! fixed member name; see [`resolve_pattern`].

mod applicability;
mod betterness;

use cinder_diagnostic::{Diagnostic, ErrorCode};
use cinder_ir::{Name, Span, StringInterner};
use cinder_types::{Accessibility, DefId, GenericEnv, Idx, Pool, RefKind, TypeRegistry};

use crate::decl::MemberKind;
use crate::symbols::{ExtensionTable, ForwarderId, ForwarderRole, MemberId};

use applicability::{Candidate, CandidateSource, Collected};

/// Everything resolution reads at one call site.
pub struct ResolveContext<'a> {
    pub pool: &'a mut Pool,
    pub registry: &'a TypeRegistry,
    pub interner: &'a StringInterner,
    pub table: &'a ExtensionTable,
    /// Declaring types whose extension blocks are in scope.
    pub scope: &'a [DefId],
    /// Type parameters in scope at the call site.
    pub env: GenericEnv<'a>,
    /// Type containing the call site; private members are visible inside it.
    pub caller: Option<DefId>,
    /// Module being compiled; internal members of other modules are hidden.
    pub module: Name,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        pool: &'a mut Pool,
        registry: &'a TypeRegistry,
        interner: &'a StringInterner,
        table: &'a ExtensionTable,
    ) -> Self {
        ResolveContext {
            pool,
            registry,
            interner,
            table,
            scope: &[],
            env: GenericEnv::default(),
            caller: None,
            module: Name::EMPTY,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: &'a [DefId]) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: GenericEnv<'a>) -> Self {
        self.env = env;
        self
    }

    #[must_use]
    pub fn with_caller(mut self, caller: DefId) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Whether a member of `declaring` with `accessibility` is visible here.
    pub fn can_access(&self, declaring: DefId, accessibility: Accessibility) -> bool {
        match accessibility {
            Accessibility::Public => true,
            Accessibility::Internal | Accessibility::ProtectedOrInternal => {
                self.caller == Some(declaring) || self.registry.get(declaring).module == self.module
            }
            Accessibility::Private | Accessibility::Protected | Accessibility::ProtectedAndInternal => {
                self.caller == Some(declaring)
            }
        }
    }

    fn display(&self, ty: Idx) -> String {
        self.pool.display(ty, self.registry, self.interner)
    }
}

// === Queries ===

/// How the member is used.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum LookupKind {
    /// `recv.M(args)`
    Invocation,
    /// `recv.P`
    Property,
    /// `recv[args]`
    Indexer,
}

impl LookupKind {
    pub(crate) fn matches(self, kind: MemberKind) -> bool {
        matches!(
            (self, kind),
            (LookupKind::Invocation, MemberKind::Method)
                | (LookupKind::Property, MemberKind::Property)
                | (LookupKind::Indexer, MemberKind::Indexer)
        )
    }
}

/// An argument at the call site.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Argument {
    pub ty: Idx,
    /// `ref`, `in` or none as written at the call site.
    pub ref_kind: RefKind,
}

impl Argument {
    pub fn value(ty: Idx) -> Self {
        Argument {
            ty,
            ref_kind: RefKind::None,
        }
    }

    pub fn by_ref(ty: Idx, ref_kind: RefKind) -> Self {
        Argument { ty, ref_kind }
    }
}

/// One member access to resolve.
#[derive(Clone, Debug)]
pub struct MemberQuery<'q> {
    pub name: Name,
    pub kind: LookupKind,
    pub args: &'q [Argument],
    /// `Type.M()`: only static members apply and the receiver must match
    /// exactly.
    pub static_access: bool,
    pub span: Span,
}

impl<'q> MemberQuery<'q> {
    pub fn invocation(name: Name, args: &'q [Argument]) -> Self {
        MemberQuery {
            name,
            kind: LookupKind::Invocation,
            args,
            static_access: false,
            span: Span::DUMMY,
        }
    }

    pub fn property(name: Name) -> Self {
        MemberQuery {
            kind: LookupKind::Property,
            ..MemberQuery::invocation(name, &[])
        }
    }

    pub fn indexer(name: Name, args: &'q [Argument]) -> Self {
        MemberQuery {
            kind: LookupKind::Indexer,
            ..MemberQuery::invocation(name, args)
        }
    }

    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.static_access = true;
        self
    }

    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

// === Results ===

/// The member a query resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// `registry.get(def).members[index]`
    Ordinary {
        def: DefId,
        index: usize,
        type_args: Vec<Idx>,
    },
    Extension(ExtensionTarget),
}

/// A chosen extension member with its inferred type arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionTarget {
    pub member: MemberId,
    /// Block type arguments followed by member type arguments, the order
    /// of the forwarder's type parameters.
    pub type_args: Vec<Idx>,
    /// Receiver type after substitution; `None` for static members.
    pub receiver: Option<Idx>,
    pub receiver_ref_kind: RefKind,
    /// Return or property type after substitution.
    pub ret: Idx,
}

impl ExtensionTarget {
    /// Forwarder to call for `role`. Unsupported members may have none.
    pub fn forwarder(&self, table: &ExtensionTable, role: ForwarderRole) -> Option<ForwarderId> {
        table.forwarder_of(self.member, role)
    }
}

/// Outcome of one lookup.
#[derive(Clone, Debug, Default)]
pub struct Resolution {
    /// Best-effort target; present even when the member is unsupported.
    pub target: Option<Target>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    pub fn extension(&self) -> Option<&ExtensionTarget> {
        match &self.target {
            Some(Target::Extension(target)) => Some(target),
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

// === Resolution ===

enum Lookup {
    Chosen(Resolution),
    /// Members with the name exist but none applies.
    Inapplicable,
    /// Nothing by that name. `suppressed` when an in-scope block failed
    /// its shape checks and may have declared it.
    NotFound { suppressed: bool },
}

/// Resolve a member access on a receiver of type `receiver`.
#[tracing::instrument(level = "debug", skip_all, fields(member = %ctx.interner.lookup(query.name)))]
pub fn resolve_member(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
    query: &MemberQuery<'_>,
) -> Resolution {
    match lookup(ctx, receiver, query) {
        Lookup::Chosen(resolution) => resolution,
        Lookup::Inapplicable => Resolution {
            target: None,
            diagnostics: vec![inapplicable(ctx, receiver, query)],
        },
        Lookup::NotFound { suppressed: true } => Resolution::default(),
        Lookup::NotFound { suppressed: false } => Resolution {
            target: None,
            diagnostics: vec![not_found(ctx, receiver, query)],
        },
    }
}

fn lookup(ctx: &mut ResolveContext<'_>, receiver: Idx, query: &MemberQuery<'_>) -> Lookup {
    if ctx.pool.contains_error(receiver) || query.args.iter().any(|a| ctx.pool.contains_error(a.ty)) {
        return Lookup::NotFound { suppressed: true };
    }

    let ordinary = applicability::ordinary_candidates(ctx, receiver, query);
    if !ordinary.applicable.is_empty() {
        tracing::debug!(count = ordinary.applicable.len(), "ordinary members apply");
        return Lookup::Chosen(choose(ctx, receiver, query, ordinary.applicable));
    }

    let Collected {
        applicable,
        found_name,
        error_container,
    } = applicability::extension_candidates(ctx, receiver, query);
    if !applicable.is_empty() {
        let before = applicable.len();
        let survivors = betterness::filter_by_priority(applicable);
        tracing::debug!(before, after = survivors.len(), "extension candidates after priority");
        return Lookup::Chosen(choose(ctx, receiver, query, survivors));
    }

    if ordinary.found_name || found_name {
        Lookup::Inapplicable
    } else {
        Lookup::NotFound {
            suppressed: error_container,
        }
    }
}

fn choose(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
    query: &MemberQuery<'_>,
    mut candidates: Vec<Candidate>,
) -> Resolution {
    match betterness::best(ctx, receiver, query.args, &candidates) {
        Ok(index) => {
            let chosen = candidates.swap_remove(index);
            let mut diagnostics = Vec::new();
            if let CandidateSource::Extension(member) = chosen.source {
                let skeleton = ctx.table.skeleton(member);
                if let Some(reason) = skeleton.unsupported {
                    let shown = ctx
                        .table
                        .display_member(member, ctx.pool, ctx.registry, ctx.interner);
                    tracing::debug!(member = %shown, %reason, "unsupported member chosen");
                    diagnostics.push(
                        Diagnostic::error(ErrorCode::E3104)
                            .with_message(format!("`{shown}` is not supported by this compiler"))
                            .with_label(query.span, "unsupported member")
                            .with_note(format!("the member cannot be used because {reason}")),
                    );
                }
            }
            Resolution {
                target: Some(chosen.into_target()),
                diagnostics,
            }
        }
        Err(tied) => {
            let mut shown: Vec<String> = tied
                .iter()
                .map(|&i| display_candidate(ctx, &candidates[i]))
                .collect();
            shown.sort();
            let name = ctx.interner.lookup(query.name);
            let mut diag = Diagnostic::error(ErrorCode::E3103)
                .with_message(format!(
                    "call to `{name}` is ambiguous between {} candidates",
                    shown.len()
                ))
                .with_label(query.span, "ambiguous call");
            for candidate in shown {
                diag = diag.with_note(format!("candidate: {candidate}"));
            }
            Resolution {
                target: None,
                diagnostics: vec![diag],
            }
        }
    }
}

fn display_candidate(ctx: &ResolveContext<'_>, candidate: &Candidate) -> String {
    match candidate.source {
        CandidateSource::Extension(member) => {
            ctx.table
                .display_member(member, ctx.pool, ctx.registry, ctx.interner)
        }
        CandidateSource::Ordinary { def, index } => {
            let member = &ctx.registry.get(def).members[index];
            let mut out = ctx.registry.qualified_name(def, ctx.interner);
            out.push('.');
            out.push_str(ctx.interner.lookup(member.name));
            out.push('(');
            for (i, param) in member.params.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                ctx.pool
                    .display_into(param.ty, ctx.registry, ctx.interner, &mut out);
            }
            out.push(')');
            out
        }
    }
}

fn not_found(ctx: &ResolveContext<'_>, receiver: Idx, query: &MemberQuery<'_>) -> Diagnostic {
    let name = ctx.interner.lookup(query.name);
    Diagnostic::error(ErrorCode::E3101)
        .with_message(format!(
            "no member named `{name}` exists on `{}`",
            ctx.display(receiver)
        ))
        .with_label(query.span, "member not found")
}

fn inapplicable(ctx: &ResolveContext<'_>, receiver: Idx, query: &MemberQuery<'_>) -> Diagnostic {
    let name = ctx.interner.lookup(query.name);
    Diagnostic::error(ErrorCode::E3102)
        .with_message(format!(
            "no member named `{name}` applies to a receiver of type `{}`",
            ctx.display(receiver)
        ))
        .with_label(query.span, "no applicable member")
        .with_note(format!(
            "members named `{name}` exist, but their receiver or parameters do not match"
        ))
}

// === Pattern hooks ===

/// A pattern-based protocol that consults extension members.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PatternHook {
    /// `var (a, b) = x;`
    Deconstruct,
    /// `foreach`
    GetEnumerator,
    /// Collection initializer elements.
    Add,
    /// `fixed`
    GetPinnableReference,
    /// `await`
    GetAwaiter,
    /// `using` on a ref struct.
    Dispose,
}

impl PatternHook {
    pub const ALL: [PatternHook; 6] = [
        PatternHook::Deconstruct,
        PatternHook::GetEnumerator,
        PatternHook::Add,
        PatternHook::GetPinnableReference,
        PatternHook::GetAwaiter,
        PatternHook::Dispose,
    ];

    pub const fn member_name(self) -> &'static str {
        match self {
            PatternHook::Deconstruct => "Deconstruct",
            PatternHook::GetEnumerator => "GetEnumerator",
            PatternHook::Add => "Add",
            PatternHook::GetPinnableReference => "GetPinnableReference",
            PatternHook::GetAwaiter => "GetAwaiter",
            PatternHook::Dispose => "Dispose",
        }
    }
}

/// Resolve the member a pattern needs.
///
/// Missing and inapplicable members produce no diagnostic: the pattern
/// reports its own error (or falls back to an interface). Ambiguity and
/// unsupported members are reported as for ordinary calls.
/// `Deconstruct` outputs are passed as `ref` arguments of the target types.
#[tracing::instrument(level = "debug", skip_all, fields(hook = hook.member_name()))]
pub fn resolve_pattern(
    ctx: &mut ResolveContext<'_>,
    hook: PatternHook,
    receiver: Idx,
    args: &[Argument],
    span: Span,
) -> Resolution {
    let name = ctx.interner.intern(hook.member_name());
    let query = MemberQuery::invocation(name, args).with_span(span);
    match lookup(ctx, receiver, &query) {
        Lookup::Chosen(resolution) => resolution,
        Lookup::Inapplicable | Lookup::NotFound { .. } => Resolution::default(),
    }
}

// === Completion ===

/// An extension member offered by completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    pub name: Name,
    pub kind: MemberKind,
    pub member: MemberId,
    /// Full display form, as diagnostics print it.
    pub label: String,
}

/// Instance extension members usable on `receiver`, sorted by name.
///
/// Unsupported imported members are left out.
pub fn completion_members(ctx: &mut ResolveContext<'_>, receiver: Idx) -> Vec<CompletionItem> {
    if ctx.pool.contains_error(receiver) {
        return Vec::new();
    }
    let mut items: Vec<CompletionItem> = applicability::applicable_instance_members(ctx, receiver)
        .into_iter()
        .map(|member| {
            let skeleton = ctx.table.skeleton(member);
            CompletionItem {
                name: skeleton.name,
                kind: skeleton.kind,
                member,
                label: ctx
                    .table
                    .display_member(member, ctx.pool, ctx.registry, ctx.interner),
            }
        })
        .collect();
    let interner = ctx.interner;
    items.sort_by(|a, b| {
        interner
            .lookup(a.name)
            .cmp(interner.lookup(b.name))
            .then_with(|| a.label.cmp(&b.label))
    });
    items
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
