use super::*;
use crate::decl::{Accessors, ExtensionBlockDecl, MemberDecl};
use crate::symbols::UnsupportedReason;
use crate::test_support::Fixture;
use cinder_types::{
    ConstraintFlags, OrdinaryMember, ParamInfo, TypeDef, TypeKind, TypeParamDecl,
};
use pretty_assertions::assert_eq;

fn resolve(
    fx: &mut Fixture,
    table: &ExtensionTable,
    scope: &[DefId],
    receiver: Idx,
    query: &MemberQuery<'_>,
) -> Resolution {
    let mut ctx = ResolveContext::new(&mut fx.pool, &fx.registry, &fx.interner, table)
        .with_scope(scope);
    resolve_member(&mut ctx, receiver, query)
}

fn codes(resolution: &Resolution) -> Vec<ErrorCode> {
    resolution.diagnostics.iter().map(|d| d.code).collect()
}

fn method(fx: &Fixture, name: &str, params: &[Idx], ret: Idx) -> MemberDecl {
    let params = params
        .iter()
        .enumerate()
        .map(|(i, &ty)| ParamInfo::new(fx.name(&format!("p{i}")), ty))
        .collect();
    MemberDecl::method(fx.name(name), params, ret)
}

fn static_class(fx: &mut Fixture, name: &str) -> DefId {
    let def = TypeDef::static_class(fx.name("App"), fx.name(name));
    fx.registry.register(def)
}

/// Parameter types of the chosen extension member.
fn chosen_params(table: &ExtensionTable, resolution: &Resolution) -> Vec<Idx> {
    let target = resolution.extension().unwrap();
    table
        .skeleton(target.member)
        .params
        .iter()
        .map(|p| p.ty)
        .collect()
}

// === Receiver matching ===

#[test]
fn extension_method_applies_through_identity() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "Shout", &[], Idx::STRING));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Shout"), &[]);

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert!(resolution.diagnostics.is_empty());
    let target = resolution.extension().unwrap();
    assert_eq!(target.receiver, Some(Idx::STRING));
    assert_eq!(target.ret, Idx::STRING);
    assert!(target.type_args.is_empty());
    assert!(target.forwarder(&table, ForwarderRole::Method).is_some());
}

#[test]
fn object_receivers_accept_boxing_and_reference_conversions() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("o", Idx::OBJECT))
        .with_member(method(&fx, "Describe", &[], Idx::STRING));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Describe"), &[]);

    for receiver in [Idx::INT, Idx::STRING, Idx::OBJECT] {
        let resolution = resolve(&mut fx, &table, &scope, receiver, &query);
        assert!(resolution.is_resolved(), "receiver {receiver:?}");
    }
}

#[test]
fn by_ref_receivers_require_identity() {
    let mut fx = Fixture::new();
    let receiver = fx.receiver("o", Idx::OBJECT).with_ref_kind(RefKind::In);
    let block = fx
        .block(0, receiver)
        .with_member(method(&fx, "Peek", &[], Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Peek"), &[]);

    let boxed = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    assert_eq!(codes(&boxed), vec![ErrorCode::E3102]);
    let exact = resolve(&mut fx, &table, &scope, Idx::OBJECT, &query);
    assert_eq!(exact.extension().unwrap().receiver_ref_kind, RefKind::In);
}

#[test]
fn generic_block_infers_from_receiver() {
    let mut fx = Fixture::new();
    let t = fx.block_param(0, "T");
    let list_t = fx.list_of(t);
    let block = fx
        .block(0, fx.receiver("list", list_t))
        .with_type_params(vec![TypeParamDecl::new(fx.name("T"))])
        .with_member(method(&fx, "First", &[], t));
    let table = fx.emit(&[block]);
    let list_string = fx.list_of(Idx::STRING);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("First"), &[]);

    let resolution = resolve(&mut fx, &table, &scope, list_string, &query);
    let target = resolution.extension().unwrap();
    assert_eq!(target.type_args, vec![Idx::STRING]);
    assert_eq!(target.receiver, Some(list_string));
    assert_eq!(target.ret, Idx::STRING);
}

#[test]
fn block_constraints_filter_receivers() {
    let mut fx = Fixture::new();
    let t = fx.block_param(0, "T");
    let block = fx
        .block(0, fx.receiver("value", t))
        .with_type_params(vec![
            TypeParamDecl::new(fx.name("T")).with_flags(ConstraintFlags::STRUCT)
        ])
        .with_member(method(&fx, "Hash", &[], Idx::INT));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Hash"), &[]);

    let value = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    assert_eq!(value.extension().unwrap().type_args, vec![Idx::INT]);
    let reference = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(codes(&reference), vec![ErrorCode::E3102]);
}

#[test]
fn member_type_arguments_follow_block_arguments() {
    let mut fx = Fixture::new();
    let t = fx.block_param(0, "T");
    let u = fx.method_param(0, "U");
    let list_t = fx.list_of(t);
    let map = method(&fx, "Map", &[u], u).with_type_params(vec![TypeParamDecl::new(fx.name("U"))]);
    let block = fx
        .block(0, fx.receiver("list", list_t))
        .with_type_params(vec![TypeParamDecl::new(fx.name("T"))])
        .with_member(map);
    let table = fx.emit(&[block]);
    let list_int = fx.list_of(Idx::INT);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::STRING)];
    let query = MemberQuery::invocation(fx.name("Map"), &args);

    let resolution = resolve(&mut fx, &table, &scope, list_int, &query);
    let target = resolution.extension().unwrap();
    assert_eq!(target.type_args, vec![Idx::INT, Idx::STRING]);
    assert_eq!(target.ret, Idx::STRING);
}

// === Ordinary members ===

#[test]
fn ordinary_members_shadow_extensions() {
    let mut fx = Fixture::new();
    let scale = fx.name("Scale");
    let by = ParamInfo::new(fx.name("by"), Idx::LONG);
    let widget_def = TypeDef::new(fx.name("App"), fx.name("Widget"), TypeKind::Class)
        .with_member(OrdinaryMember::method(scale, vec![by], Idx::VOID));
    let widget_def = fx.registry.register(widget_def);
    let widget = fx.pool.named(widget_def, &[]);
    let block = fx
        .block(0, fx.receiver("w", widget))
        .with_member(method(&fx, "Scale", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(scale, &args);

    let resolution = resolve(&mut fx, &table, &scope, widget, &query);
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(
        resolution.target,
        Some(Target::Ordinary {
            def: widget_def,
            index: 0,
            type_args: Vec::new(),
        })
    );
}

#[test]
fn inapplicable_ordinary_members_fall_back_to_extensions() {
    let mut fx = Fixture::new();
    let scale = fx.name("Scale");
    let by = ParamInfo::new(fx.name("by"), Idx::STRING);
    let widget_def = TypeDef::new(fx.name("App"), fx.name("Widget"), TypeKind::Class)
        .with_member(OrdinaryMember::method(scale, vec![by], Idx::VOID));
    let widget_def = fx.registry.register(widget_def);
    let widget = fx.pool.named(widget_def, &[]);
    let block = fx
        .block(0, fx.receiver("w", widget))
        .with_member(method(&fx, "Scale", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(scale, &args);

    let resolution = resolve(&mut fx, &table, &scope, widget, &query);
    assert_eq!(chosen_params(&table, &resolution), vec![Idx::INT]);
}

// === Priority and betterness ===

#[test]
fn priority_discards_better_lower_priority_overloads() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::LONG], Idx::VOID).with_priority(1))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(fx.name("M"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(chosen_params(&table, &resolution), vec![Idx::LONG]);
}

#[test]
fn priority_groups_are_per_declaring_type() {
    let mut fx = Fixture::new();
    let more = static_class(&mut fx, "More");
    let high = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::LONG], Idx::VOID).with_priority(5));
    let other = ExtensionBlockDecl::new(more, Fixture::loc(10), fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[high, other]);
    let scope = [fx.decl, more];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(fx.name("M"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    let target = resolution.extension().unwrap();
    let container = table.skeleton(target.member).container;
    assert_eq!(table.container(container).declaring_type, more);
}

#[test]
fn better_conversion_wins() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::DOUBLE], Idx::VOID))
        .with_member(method(&fx, "M", &[Idx::LONG], Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(fx.name("M"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    assert_eq!(chosen_params(&table, &resolution), vec![Idx::LONG]);
}

#[test]
fn non_generic_member_beats_generic_one() {
    let mut fx = Fixture::new();
    let u = fx.method_param(0, "U");
    let generic = method(&fx, "M", &[u], Idx::VOID)
        .with_type_params(vec![TypeParamDecl::new(fx.name("U"))]);
    let block = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(generic)
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(fx.name("M"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    let target = resolution.extension().unwrap();
    assert!(target.type_args.is_empty());
    assert!(table.skeleton(target.member).type_params.is_empty());
}

#[test]
fn ties_list_every_candidate_in_order() {
    let mut fx = Fixture::new();
    let more = static_class(&mut fx, "More");
    let second = ExtensionBlockDecl::new(more, Fixture::loc(10), fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let first = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[second, first]);
    let scope = [more, fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(fx.name("M"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::INT, &query);
    assert!(!resolution.is_resolved());
    assert_eq!(codes(&resolution), vec![ErrorCode::E3103]);
    assert_eq!(
        resolution.diagnostics[0].notes,
        vec![
            "candidate: App.Extensions.extension(int n).M(int)".to_owned(),
            "candidate: App.More.extension(int n).M(int)".to_owned(),
        ]
    );
}

#[test]
fn ties_count_every_candidate_even_when_displayed_alike() {
    let mut fx = Fixture::new();
    let nullable = fx.pool.nullable_ref(Idx::STRING);
    // Both blocks share one container, so both members print with its marker.
    let plain = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let annotated = fx
        .block(10, fx.receiver("s", nullable))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID));
    let table = fx.emit(&[plain, annotated]);
    assert_eq!(table.container_count(), 1);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::INT)];
    let query = MemberQuery::invocation(fx.name("M"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(codes(&resolution), vec![ErrorCode::E3103]);
    let diag = &resolution.diagnostics[0];
    assert_eq!(diag.message, "call to `M` is ambiguous between 2 candidates");
    assert_eq!(diag.notes.len(), 2);
}

// === Failures ===

#[test]
fn missing_member_is_reported() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "Shout", &[], Idx::STRING));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Whisper"), &[]);

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(codes(&resolution), vec![ErrorCode::E3101]);
}

#[test]
fn error_blocks_suppress_not_found() {
    let mut fx = Fixture::new();
    let broken = fx.block(0, fx.receiver("x", Idx::ERROR));
    let table = fx.emit(&[broken]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Whisper"), &[]);

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert!(!resolution.is_resolved());
    assert!(resolution.diagnostics.is_empty());
}

#[test]
fn inapplicable_arguments_are_reported() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "Pad", &[Idx::STRING], Idx::STRING));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let args = [Argument::value(Idx::BOOL)];
    let query = MemberQuery::invocation(fx.name("Pad"), &args);

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(codes(&resolution), vec![ErrorCode::E3102]);
}

#[test]
fn unsupported_member_reports_one_diagnostic() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "Shout", &[], Idx::STRING));
    let mut table = fx.emit(&[block]);
    let (id, _) = table.skeletons().next().unwrap();
    table.skeleton_mut(id).unsupported = Some(UnsupportedReason::ReturnTypeMismatch);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Shout"), &[]);

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(codes(&resolution), vec![ErrorCode::E3104]);
    assert_eq!(resolution.extension().unwrap().member, id);
}

#[test]
fn static_members_need_static_access() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "Create", &[], Idx::STRING).into_static());
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let name = fx.name("Create");

    let instance = resolve(&mut fx, &table, &scope, Idx::STRING, &MemberQuery::invocation(name, &[]));
    assert_eq!(codes(&instance), vec![ErrorCode::E3102]);

    let query = MemberQuery::invocation(name, &[]).into_static();
    let exact = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(exact.extension().unwrap().receiver, None);
    let base = resolve(&mut fx, &table, &scope, Idx::OBJECT, &query);
    assert_eq!(codes(&base), vec![ErrorCode::E3102]);
}

#[test]
fn private_members_are_visible_inside_their_declaring_type() {
    let mut fx = Fixture::new();
    let block = fx.block(0, fx.receiver("s", Idx::STRING)).with_member(
        method(&fx, "Secret", &[], Idx::INT).with_accessibility(Accessibility::Private),
    );
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::invocation(fx.name("Secret"), &[]);

    let outside = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    assert_eq!(codes(&outside), vec![ErrorCode::E3102]);

    let decl = fx.decl;
    let mut ctx = ResolveContext::new(&mut fx.pool, &fx.registry, &fx.interner, &table)
        .with_scope(&scope)
        .with_caller(decl);
    assert!(resolve_member(&mut ctx, Idx::STRING, &query).is_resolved());
}

#[test]
fn properties_resolve_to_accessor_pairs() {
    let mut fx = Fixture::new();
    let block = fx.block(0, fx.receiver("s", Idx::STRING)).with_member(MemberDecl::property(
        fx.name("Width"),
        Idx::INT,
        Accessors::GET_SET,
    ));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let query = MemberQuery::property(fx.name("Width"));

    let resolution = resolve(&mut fx, &table, &scope, Idx::STRING, &query);
    let target = resolution.extension().unwrap();
    assert_eq!(target.ret, Idx::INT);
    assert!(target.forwarder(&table, ForwarderRole::Getter).is_some());
    assert!(target.forwarder(&table, ForwarderRole::Setter).is_some());

    let as_call = MemberQuery::invocation(fx.name("Width"), &[]);
    let mismatch = resolve(&mut fx, &table, &scope, Idx::STRING, &as_call);
    assert_eq!(codes(&mismatch), vec![ErrorCode::E3101]);
}

// === Patterns and completion ===

#[test]
fn pattern_hooks_use_fixed_names() {
    let mut fx = Fixture::new();
    let pair = fx.named("Pair", TypeKind::Class);
    let outputs = vec![
        ParamInfo::new(fx.name("a"), Idx::INT).with_ref_kind(RefKind::Ref),
        ParamInfo::new(fx.name("b"), Idx::STRING).with_ref_kind(RefKind::Ref),
    ];
    let block = fx
        .block(0, fx.receiver("p", pair))
        .with_member(MemberDecl::method(fx.name("Deconstruct"), outputs, Idx::VOID));
    let table = fx.emit(&[block]);
    let scope = [fx.decl];
    let mut ctx = ResolveContext::new(&mut fx.pool, &fx.registry, &fx.interner, &table)
        .with_scope(&scope);

    let targets = [
        Argument::by_ref(Idx::INT, RefKind::Ref),
        Argument::by_ref(Idx::STRING, RefKind::Ref),
    ];
    let found = resolve_pattern(&mut ctx, PatternHook::Deconstruct, pair, &targets, Span::DUMMY);
    assert!(found.is_resolved());
    assert!(found.diagnostics.is_empty());

    let missing = resolve_pattern(&mut ctx, PatternHook::GetAwaiter, pair, &[], Span::DUMMY);
    assert!(!missing.is_resolved());
    assert!(missing.diagnostics.is_empty());

    let wrong_count = resolve_pattern(&mut ctx, PatternHook::Deconstruct, pair, &targets[..1], Span::DUMMY);
    assert!(wrong_count.diagnostics.is_empty());
}

#[test]
fn completion_lists_supported_instance_members_by_name() {
    let mut fx = Fixture::new();
    let strings = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(method(&fx, "Zeta", &[], Idx::VOID))
        .with_member(MemberDecl::property(fx.name("Alpha"), Idx::INT, Accessors::GET))
        .with_member(method(&fx, "Create", &[], Idx::STRING).into_static())
        .with_member(method(&fx, "Beta", &[], Idx::VOID));
    let ints = fx
        .block(10, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "Other", &[], Idx::VOID));
    let mut table = fx.emit(&[strings, ints]);
    let beta = fx.name("Beta");
    let (beta_id, _) = table.skeletons().find(|(_, s)| s.name == beta).unwrap();
    table.skeleton_mut(beta_id).unsupported = Some(UnsupportedReason::MissingForwarder);

    let scope = [fx.decl];
    let mut ctx = ResolveContext::new(&mut fx.pool, &fx.registry, &fx.interner, &table)
        .with_scope(&scope);
    let items = completion_members(&mut ctx, Idx::STRING);
    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "App.Extensions.extension(string s).Alpha",
            "App.Extensions.extension(string s).Zeta()",
        ]
    );
}
