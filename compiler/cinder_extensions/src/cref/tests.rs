use super::*;
use crate::decl::{Accessors, MemberDecl};
use crate::symbols::ExtensionTable;
use crate::test_support::Fixture;
use cinder_types::{ConstraintFlags, ParamInfo, TypeParamDecl};
use pretty_assertions::assert_eq;

fn method(fx: &Fixture, name: &str, params: &[Idx], ret: Idx) -> MemberDecl {
    let params = params
        .iter()
        .enumerate()
        .map(|(i, &ty)| ParamInfo::new(fx.name(&format!("p{i}")), ty))
        .collect();
    MemberDecl::method(fx.name(name), params, ret)
}

fn resolve(fx: &mut Fixture, table: &ExtensionTable, text: &str) -> CrefResolution {
    let decl = fx.decl;
    let mut ctx = ResolveContext::new(&mut fx.pool, &fx.registry, &fx.interner, table);
    resolve_cref(&mut ctx, decl, text, Span::DUMMY)
}

fn codes(resolution: &CrefResolution) -> Vec<ErrorCode> {
    resolution.diagnostics.iter().map(|d| d.code).collect()
}

fn path(fx: &Fixture, segments: &[&str], args: Vec<CrefType>) -> CrefType {
    CrefType::Path {
        segments: segments.iter().map(|s| fx.name(s)).collect(),
        args,
    }
}

// === Parsing ===

#[test]
fn parses_generic_receiver_shapes() {
    let fx = Fixture::new();
    let cref = parse_cref(&fx.interner, "extension<T>(List{T}).First").unwrap();
    assert_eq!(cref.type_params, vec![fx.name("T")]);
    assert_eq!(cref.receiver.ref_kind, RefKind::None);
    assert_eq!(
        cref.receiver.ty,
        path(&fx, &["List"], vec![path(&fx, &["T"], vec![])])
    );
    assert_eq!(cref.member, fx.name("First"));
    assert_eq!(cref.params, None);
}

#[test]
fn parses_ref_receivers_and_parameter_lists() {
    let fx = Fixture::new();
    let cref = parse_cref(&fx.interner, "extension(ref readonly int).Bump(int[,], string?, (int, long))").unwrap();
    assert_eq!(cref.receiver.ref_kind, RefKind::RefReadOnly);
    let params: Vec<CrefType> = cref.params.unwrap().into_iter().map(|p| p.ty).collect();
    let int = || path(&fx, &["int"], vec![]);
    assert_eq!(
        params,
        vec![
            CrefType::Array {
                elem: Box::new(int()),
                rank: 2,
            },
            CrefType::Nullable(Box::new(path(&fx, &["string"], vec![]))),
            CrefType::Tuple(vec![int(), path(&fx, &["long"], vec![])]),
        ]
    );
}

#[test]
fn empty_parameter_lists_are_distinct_from_omitted_ones() {
    let fx = Fixture::new();
    let cref = parse_cref(&fx.interner, "extension(int).M()").unwrap();
    assert_eq!(cref.params, Some(Vec::new()));
}

#[test]
fn malformed_references_report_where_parsing_stopped() {
    let fx = Fixture::new();
    let kind = |text: &str| parse_cref(&fx.interner, text).unwrap_err().kind;
    assert_eq!(kind("Helpers.M"), CrefErrorKind::NotExtension);
    assert_eq!(kind("extension(int"), CrefErrorKind::Expected("`)`"));
    assert_eq!(kind("extension(int).M(int) tail"), CrefErrorKind::TrailingInput);
    assert_eq!(parse_cref(&fx.interner, "extension(int.M").unwrap_err().offset, 15);
}

// === Resolution ===

#[test]
fn resolves_overloads_by_parameter_types() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID))
        .with_member(method(&fx, "M", &[Idx::STRING], Idx::VOID));
    let table = fx.emit(&[block]);

    let resolution = resolve(&mut fx, &table, "extension(int).M(string)");
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(
        resolution.target.doc_id(),
        "M:App.Extensions.<>E__0.M(System.String)"
    );
    let member = resolution.target.member().unwrap();
    assert_eq!(table.skeleton(member).params[0].ty, Idx::STRING);
}

#[test]
fn ambiguous_references_take_the_first_match() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[Idx::INT], Idx::VOID))
        .with_member(method(&fx, "M", &[Idx::STRING], Idx::VOID));
    let table = fx.emit(&[block]);

    let resolution = resolve(&mut fx, &table, "extension(int).M");
    assert_eq!(codes(&resolution), vec![ErrorCode::E3203]);
    assert!(!resolution.diagnostics[0].is_error());
    assert_eq!(
        resolution.target.doc_id(),
        "M:App.Extensions.<>E__0.M(System.Int32)"
    );
}

#[test]
fn generic_blocks_match_regardless_of_parameter_names_and_constraints() {
    let mut fx = Fixture::new();
    let t = fx.block_param(0, "T");
    let list_t = fx.list_of(t);
    let block = fx
        .block(0, fx.receiver("list", list_t))
        .with_type_params(vec![
            TypeParamDecl::new(fx.name("T")).with_flags(ConstraintFlags::CLASS)
        ])
        .with_member(method(&fx, "Add", &[t], Idx::VOID));
    let table = fx.emit(&[block]);

    let resolution = resolve(&mut fx, &table, "extension<U>(System.Collections.Generic.List{U}).Add(U)");
    assert!(resolution.diagnostics.is_empty());
    assert_eq!(
        resolution.target.doc_id(),
        "M:App.Extensions.<>E__0`1.Add(`0)"
    );
}

#[test]
fn properties_render_without_parameters() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(MemberDecl::property(fx.name("Length"), Idx::INT, Accessors::GET));
    let table = fx.emit(&[block]);

    let resolution = resolve(&mut fx, &table, "extension(string).Length");
    assert_eq!(resolution.target.doc_id(), "P:App.Extensions.<>E__0.Length");
}

#[test]
fn receiver_ref_kind_selects_the_container() {
    let mut fx = Fixture::new();
    let by_value = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[], Idx::VOID));
    let by_ref = fx
        .block(10, fx.receiver("n", Idx::INT).with_ref_kind(RefKind::Ref))
        .with_member(method(&fx, "M", &[], Idx::VOID));
    let table = fx.emit(&[by_value, by_ref]);

    let resolution = resolve(&mut fx, &table, "extension(ref int).M()");
    assert!(resolution.diagnostics.is_empty());
    let member = resolution.target.member().unwrap();
    let container = table.container(table.skeleton(member).container);
    assert_eq!(container.marker.receiver.ref_kind, RefKind::Ref);
}

#[test]
fn unresolved_references_get_a_placeholder() {
    let mut fx = Fixture::new();
    let block = fx
        .block(0, fx.receiver("n", Idx::INT))
        .with_member(method(&fx, "M", &[], Idx::VOID));
    let table = fx.emit(&[block]);

    for text in ["extension(long).M", "extension(int).Missing", "extension(Unknown).M"] {
        let resolution = resolve(&mut fx, &table, text);
        assert_eq!(codes(&resolution), vec![ErrorCode::E3201], "{text}");
        assert_eq!(resolution.target.doc_id(), format!("!:{text}"));
        assert_eq!(resolution.target.member(), None);
    }
}

#[test]
fn malformed_references_warn_and_get_a_placeholder() {
    let mut fx = Fixture::new();
    let table = fx.emit(&[]);

    let resolution = resolve(&mut fx, &table, "extension(int");
    assert_eq!(codes(&resolution), vec![ErrorCode::E3202]);
    assert!(!resolution.diagnostics[0].is_error());
    assert_eq!(resolution.target.doc_id(), "!:extension(int");
}
