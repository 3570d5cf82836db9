//! End-to-end scenarios: binding, resolution, lowering and import.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

mod common;

use cinder_diagnostic::ErrorCode;
use cinder_extensions::lvalue::{
    BinaryOp, ExtensionAccess, Instr, LowerContext, ReceiverExpr, ReceiverOperand,
};
use cinder_extensions::metadata::{MetadataModule, TypeRecord};
use cinder_extensions::resolve::{MemberQuery, ResolveContext, Target};
use cinder_extensions::{
    import_module, lower_extension_assignment, resolve_member, write_module, Accessors, AssignOp,
    ExtensionTable, LoweredAssignment, MemberDecl, ReceiverCapture,
};
use cinder_ir::StringInterner;
use cinder_types::{Idx, OrdinaryMember, ParamInfo, Pool, TypeDef, TypeKind, TypeRegistry};
use common::World;
use pretty_assertions::assert_eq;

/// Accessor receivers of a lowered assignment, getter first.
fn accessor_receivers(lowered: &LoweredAssignment) -> Vec<ReceiverOperand> {
    lowered
        .flattened()
        .into_iter()
        .filter_map(|i| match i {
            Instr::CallGetter { receiver, .. } | Instr::CallSetter { receiver, .. } => {
                Some(*receiver)
            }
            _ => None,
        })
        .collect()
}

/// Lower `op` on extension property `name` of a receiver of type `ty`.
fn lower_property(
    world: &mut World,
    table: &ExtensionTable,
    ty: Idx,
    receiver: ReceiverExpr,
    op: AssignOp,
) -> LoweredAssignment {
    let scope = [world.decl];
    let query = MemberQuery::property(world.name("P"));
    let resolution = {
        let mut ctx = ResolveContext::new(&mut world.pool, &world.registry, &world.interner, table)
            .with_scope(&scope);
        resolve_member(&mut ctx, ty, &query)
    };
    assert!(resolution.diagnostics.is_empty());
    let access = ExtensionAccess::from_target(table, resolution.extension().unwrap(), 0);
    let ctx = LowerContext::new(&world.pool, &world.registry);
    lower_extension_assignment(&ctx, &access, &receiver, op).unwrap()
}

#[test]
fn nullability_variants_share_one_container() {
    let mut world = World::new();
    let nullable = world.pool.nullable_ref(Idx::STRING);
    let plain = world
        .block(0, Idx::STRING)
        .with_member(world.method("A", &[], Idx::VOID));
    let annotated = world
        .block(10, nullable)
        .with_member(world.method("B", &[], Idx::VOID));
    let out = world.bind(&[plain, annotated]);

    assert!(out.diagnostics.is_empty());
    assert_eq!(out.signatures[0].grouping_key, out.signatures[1].grouping_key);
    assert_ne!(out.signatures[0].marker, out.signatures[1].marker);
    assert_eq!(out.table.container_count(), 1);
    let (_, container) = out.table.containers().next().unwrap();
    assert_eq!(container.ordinal, Some(0));
    assert_eq!(container.type_name(), "<>E__0");
    assert_eq!(container.skeletons.len(), 2);
}

#[test]
fn int_string_int_receivers_produce_two_containers() {
    let world = World::new();
    let decls = vec![
        world.block(0, Idx::INT).with_member(world.method("A", &[], Idx::VOID)),
        world.block(10, Idx::STRING).with_member(world.method("B", &[], Idx::VOID)),
        world.block(20, Idx::INT).with_member(world.method("C", &[], Idx::VOID)),
    ];
    let out = world.bind(&decls);

    assert_eq!(out.table.container_count(), 2);
    let containers: Vec<(Option<u32>, String, usize)> = out
        .table
        .containers()
        .map(|(_, c)| (c.ordinal, c.grouping_key.as_str().to_owned(), c.skeletons.len()))
        .collect();
    assert_eq!(
        containers,
        vec![
            (Some(0), "extension(System.Int32)".to_owned(), 2),
            (Some(1), "extension(System.String)".to_owned(), 1),
        ]
    );
    assert_eq!(out.assignment.slot_of(0), out.assignment.slot_of(2));
}

#[test]
fn ordinary_methods_win_over_extensions() {
    let mut world = World::new();
    let name = world.name("Scale");
    let widget_def = TypeDef::new(world.name("App"), world.name("Widget"), TypeKind::Class)
        .with_member(OrdinaryMember::method(
            name,
            vec![ParamInfo::new(world.name("by"), Idx::LONG)],
            Idx::VOID,
        ));
    let widget_def = world.registry.register(widget_def);
    let widget = world.pool.named(widget_def, &[]);
    // The extension is a better match for an `int` argument, but ordinary
    // members are considered first.
    let block = world
        .block(0, widget)
        .with_member(world.method("Scale", &[Idx::INT], Idx::VOID));
    let out = world.bind(&[block]);
    let scope = [world.decl];

    let resolution = world.call(&out.table, &scope, widget, "Scale", &[Idx::INT]);
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
fn postfix_increment_on_a_struct_receiver_reuses_one_address() {
    let mut world = World::new();
    let point_def = world.registry.register(TypeDef::new(
        world.name("App"),
        world.name("Point"),
        TypeKind::Struct,
    ));
    let point = world.pool.named(point_def, &[]);
    let block = world
        .block(0, point)
        .with_member(MemberDecl::property(world.name("P"), Idx::INT, Accessors::GET_SET));
    let out = world.bind(&[block]);

    let lowered = lower_property(
        &mut world,
        &out.table,
        point,
        ReceiverExpr::variable(point),
        AssignOp::Increment { prefix: false },
    );
    assert_eq!(lowered.capture, Some(ReceiverCapture::AddressWithCopies { spill: false }));
    assert_eq!(lowered.receiver_evaluations(), 1);
    let receivers = accessor_receivers(&lowered);
    assert_eq!(receivers.len(), 2);
    assert_eq!(receivers[0], receivers[1]);
    assert!(matches!(receivers[0], ReceiverOperand::CopyOf(_)));
    // `x.P++` yields the value read before the update.
    let Instr::CallGetter { into, .. } = &lowered.instrs[1] else {
        panic!("expected the getter right after the receiver");
    };
    assert_eq!(lowered.result, *into);
}

#[test]
fn compound_assignment_evaluates_receiver_and_operand_once() {
    let mut world = World::new();
    let block = world
        .block(0, Idx::STRING)
        .with_member(MemberDecl::property(world.name("P"), Idx::INT, Accessors::GET_SET));
    let out = world.bind(&[block]);

    // `f().P += g()`
    let lowered = lower_property(
        &mut world,
        &out.table,
        Idx::STRING,
        ReceiverExpr::value(Idx::STRING),
        AssignOp::Compound(BinaryOp::Add),
    );
    let steps = lowered.flattened();
    assert!(matches!(steps[0], Instr::ReceiverValue { .. }));
    assert!(matches!(steps[1], Instr::CallGetter { .. }));
    assert!(matches!(steps[2], Instr::Operand { .. }));
    assert!(matches!(steps[3], Instr::Binary { op: BinaryOp::Add, .. }));
    assert!(matches!(steps[4], Instr::CallSetter { .. }));
    assert_eq!(steps.len(), 5);
    assert_eq!(lowered.receiver_evaluations(), 1);
}

#[test]
fn priority_filtering_prefers_the_marked_overload() {
    let mut world = World::new();
    let block = world
        .block(0, Idx::INT)
        .with_member(world.method("M", &[Idx::LONG], Idx::VOID).with_priority(1))
        .with_member(world.method("M", &[Idx::INT], Idx::VOID));
    let out = world.bind(&[block]);
    let scope = [world.decl];

    let resolution = world.call(&out.table, &scope, Idx::INT, "M", &[Idx::INT]);
    assert!(resolution.diagnostics.is_empty());
    let member = resolution.extension().unwrap().member;
    assert_eq!(out.table.skeleton(member).params[0].ty, Idx::LONG);
}

#[test]
fn foreign_forwarder_mismatch_disables_only_that_member() {
    let world = World::new();
    let block = world
        .block(0, Idx::STRING)
        .with_member(world.method("Fill", &[], Idx::INT))
        .with_member(world.method("Keep", &[], Idx::INT));
    let out = world.bind(&[block]);
    let bytes = write_module("Lib", &out.table, &world.pool, &world.registry, &world.interner)
        .to_bytes()
        .unwrap();

    let mut module = MetadataModule::from_bytes(&bytes).unwrap();
    let fill = module.types[0]
        .methods
        .iter_mut()
        .find(|m| m.name == "Fill")
        .unwrap();
    fill.ret.ty = TypeRecord::Primitive("System.String".to_owned());

    // A separate compilation consumes the tampered module.
    let interner = StringInterner::new();
    let mut pool = Pool::new();
    let mut registry = TypeRegistry::new(&interner);
    let imported = import_module(&module, &mut pool, &mut registry, &interner);
    assert!(imported.diagnostics.is_empty());
    let scope = imported.types.clone();

    let mut call = |name: &str| {
        let query = MemberQuery::invocation(interner.intern(name), &[]);
        let mut ctx = ResolveContext::new(&mut pool, &registry, &interner, &imported.table)
            .with_scope(&scope);
        resolve_member(&mut ctx, Idx::STRING, &query)
    };

    let fill = call("Fill");
    let codes: Vec<ErrorCode> = fill.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::E3104]);

    let keep = call("Keep");
    assert!(keep.diagnostics.is_empty());
    assert!(keep.is_resolved());
}
