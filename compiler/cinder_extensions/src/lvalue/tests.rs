use super::*;
use crate::decl::{Accessors, MemberDecl};
use crate::test_support::Fixture;
use cinder_types::{ConstraintFlags, TypeData, TypeKind, TypeParamDecl, TypeParamOwner};
use pretty_assertions::assert_eq;

/// A `get; set;` property `P` on `receiver`, emitted and looked up.
fn property_access(fx: &Fixture, receiver: Idx, ref_kind: RefKind, accessors: Accessors) -> ExtensionAccess {
    let block = fx
        .block(0, fx.receiver("r", receiver).with_ref_kind(ref_kind))
        .with_member(MemberDecl::property(fx.name("P"), Idx::INT, accessors));
    let table = fx.emit(&[block]);
    let target = ExtensionTarget {
        member: table.skeletons().map(|(id, _)| id).next().unwrap(),
        type_args: Vec::new(),
        receiver: Some(receiver),
        receiver_ref_kind: ref_kind,
        ret: Idx::INT,
    };
    ExtensionAccess::from_target(&table, &target, 0)
}

fn lower_ext(fx: &Fixture, access: &ExtensionAccess, receiver: ReceiverExpr, op: AssignOp) -> Result<LoweredAssignment, Diagnostic> {
    let ctx = LowerContext::new(&fx.pool, &fx.registry);
    lower_extension_assignment(&ctx, access, &receiver, op)
}

/// Instruction kinds in execution order.
fn shape(lowered: &LoweredAssignment) -> Vec<&'static str> {
    lowered
        .flattened()
        .into_iter()
        .map(|i| match i {
            Instr::ReceiverAddress { .. } => "address",
            Instr::ReceiverValue { .. } => "value",
            Instr::CategoryCheck { .. } => "check",
            Instr::IndexArg { .. } => "index",
            Instr::CallGetter { .. } => "get",
            Instr::Operand { .. } => "rhs",
            Instr::Binary { .. } => "op",
            Instr::Step { .. } => "step",
            Instr::TupleElement { .. } => "element",
            Instr::WhenNull { .. } => "when-null",
            Instr::Copy { .. } => "copy",
            Instr::CallSetter { .. } => "set",
        })
        .collect()
}

fn receivers(lowered: &LoweredAssignment) -> Vec<ReceiverOperand> {
    lowered
        .flattened()
        .into_iter()
        .filter_map(|i| match i {
            Instr::CallGetter { receiver, .. } | Instr::CallSetter { receiver, .. } => Some(*receiver),
            _ => None,
        })
        .collect()
}

// === Capture ===

#[test]
fn by_value_struct_increment_reuses_one_address() {
    let mut fx = Fixture::new();
    let point = fx.named("Point", TypeKind::Struct);
    let access = property_access(&fx, point, RefKind::None, Accessors::GET_SET);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::variable(point), AssignOp::Increment { prefix: false }).unwrap();
    assert_eq!(lowered.capture, Some(ReceiverCapture::AddressWithCopies { spill: false }));
    assert_eq!(shape(&lowered), vec!["address", "get", "step", "set"]);
    assert_eq!(lowered.receiver_evaluations(), 1);
    let address = Temp(0);
    assert_eq!(
        receivers(&lowered),
        vec![ReceiverOperand::CopyOf(address), ReceiverOperand::CopyOf(address)]
    );
    // Postfix yields the value read before the update.
    let Instr::CallGetter { into, .. } = &lowered.instrs[1] else {
        panic!("expected a getter call");
    };
    assert_eq!(lowered.result, *into);
}

#[test]
fn prefix_decrement_yields_the_updated_value() {
    let mut fx = Fixture::new();
    let point = fx.named("Point", TypeKind::Struct);
    let access = property_access(&fx, point, RefKind::None, Accessors::GET_SET);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::variable(point), AssignOp::Decrement { prefix: true }).unwrap();
    let Instr::Step { delta, into, .. } = &lowered.instrs[2] else {
        panic!("expected a step");
    };
    assert_eq!(*delta, -1);
    assert_eq!(lowered.result, *into);
}

#[test]
fn by_value_struct_rvalues_are_spilled() {
    let mut fx = Fixture::new();
    let point = fx.named("Point", TypeKind::Struct);
    let access = property_access(&fx, point, RefKind::None, Accessors::GET_SET);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::value(point), AssignOp::Compound(BinaryOp::Add)).unwrap();
    assert_eq!(lowered.instrs[0], Instr::ReceiverAddress { into: Temp(0), spill: true });
}

#[test]
fn reference_receivers_are_evaluated_once() {
    let fx = Fixture::new();
    let access = property_access(&fx, Idx::STRING, RefKind::None, Accessors::GET_SET);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::value(Idx::STRING), AssignOp::Compound(BinaryOp::Add)).unwrap();
    assert_eq!(lowered.capture, Some(ReceiverCapture::Value));
    assert_eq!(shape(&lowered), vec!["value", "get", "rhs", "op", "set"]);
    assert_eq!(
        receivers(&lowered),
        vec![ReceiverOperand::Value(Temp(0)), ReceiverOperand::Value(Temp(0))]
    );
}

#[test]
fn by_ref_receivers_must_be_variables() {
    let fx = Fixture::new();
    let ctx = LowerContext::new(&fx.pool, &fx.registry);

    for ref_kind in [RefKind::Ref, RefKind::In, RefKind::RefReadOnly] {
        let err = plan_receiver_capture(&ctx, ref_kind, &ReceiverExpr::value(Idx::INT)).unwrap_err();
        assert_eq!(err.code, ErrorCode::E3105);
        let ok = plan_receiver_capture(&ctx, ref_kind, &ReceiverExpr::variable(Idx::INT)).unwrap();
        assert_eq!(ok, ReceiverCapture::Address { spill: false });
    }

    let readonly = ReceiverExpr::variable(Idx::INT).readonly();
    assert!(plan_receiver_capture(&ctx, RefKind::Ref, &readonly).is_err());
    assert!(plan_receiver_capture(&ctx, RefKind::In, &readonly).is_ok());
}

#[test]
fn ref_receiver_calls_share_the_address() {
    let fx = Fixture::new();
    let access = property_access(&fx, Idx::INT, RefKind::Ref, Accessors::GET_SET);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::variable(Idx::INT), AssignOp::Compound(BinaryOp::Mul)).unwrap();
    assert_eq!(
        receivers(&lowered),
        vec![ReceiverOperand::Address(Temp(0)), ReceiverOperand::Address(Temp(0))]
    );
    let rejected = lower_ext(&fx, &access, ReceiverExpr::value(Idx::INT), AssignOp::Compound(BinaryOp::Mul));
    assert_eq!(rejected.unwrap_err().code, ErrorCode::E3105);
}

#[test]
fn type_parameter_receivers_follow_their_constraints() {
    let mut fx = Fixture::new();
    let t = fx.name("T");
    let params = vec![
        TypeParamDecl::new(t),
        TypeParamDecl::new(t).with_flags(ConstraintFlags::STRUCT),
        TypeParamDecl::new(t).with_flags(ConstraintFlags::CLASS),
    ];
    let refs: Vec<Idx> = (0u32..3)
        .map(|ordinal| fx.pool.type_param(TypeParamOwner::Method, ordinal, t))
        .collect();
    let ctx = LowerContext::new(&fx.pool, &fx.registry).with_env(GenericEnv::default().with_method(&params));

    let planned: Vec<ReceiverCapture> = refs
        .iter()
        .map(|&ty| plan_receiver_capture(&ctx, RefKind::None, &ReceiverExpr::value(ty)).unwrap())
        .collect();
    assert_eq!(
        planned,
        vec![
            ReceiverCapture::RuntimeCategoryCheck { spill: true },
            ReceiverCapture::AddressWithCopies { spill: true },
            ReceiverCapture::Value,
        ]
    );
}

#[test]
fn unknown_category_receivers_are_checked_at_run_time() {
    let mut fx = Fixture::new();
    let t = fx.block_param(0, "T");
    let params = vec![TypeParamDecl::new(fx.name("T"))];
    let block = fx
        .block(0, fx.receiver("r", t))
        .with_type_params(params.clone())
        .with_member(MemberDecl::property(fx.name("P"), Idx::INT, Accessors::GET_SET));
    let table = fx.emit(&[block]);
    let (member, _) = table.skeletons().next().unwrap();
    let target = ExtensionTarget {
        member,
        type_args: vec![t],
        receiver: Some(t),
        receiver_ref_kind: RefKind::None,
        ret: Idx::INT,
    };
    let access = ExtensionAccess::from_target(&table, &target, 0);
    let ctx = LowerContext::new(&fx.pool, &fx.registry).with_env(GenericEnv::block(&params));

    let lowered = lower_extension_assignment(&ctx, &access, &ReceiverExpr::variable(t), AssignOp::Compound(BinaryOp::Add)).unwrap();
    assert_eq!(shape(&lowered), vec!["address", "check", "get", "rhs", "op", "set"]);
    assert_eq!(
        lowered.instrs[1],
        Instr::CategoryCheck { address: Temp(0), stable: Temp(1) }
    );
    // Both accessors see the checked operand, never the raw spilled address.
    assert_eq!(
        receivers(&lowered),
        vec![ReceiverOperand::Checked(Temp(1)), ReceiverOperand::Checked(Temp(1))]
    );
}

// === Operations ===

#[test]
fn index_arguments_are_evaluated_once_after_the_receiver() {
    let fx = Fixture::new();
    let item = fx.name("Item");
    let params = vec![
        cinder_types::ParamInfo::new(fx.name("i"), Idx::INT),
        cinder_types::ParamInfo::new(fx.name("j"), Idx::INT),
    ];
    let block = fx
        .block(0, fx.receiver("s", Idx::STRING))
        .with_member(MemberDecl::indexer(item, params, Idx::INT, Accessors::GET_SET));
    let table = fx.emit(&[block]);
    let (member, _) = table.skeletons().next().unwrap();
    let target = ExtensionTarget {
        member,
        type_args: Vec::new(),
        receiver: Some(Idx::STRING),
        receiver_ref_kind: RefKind::None,
        ret: Idx::INT,
    };
    let access = ExtensionAccess::from_target(&table, &target, 2);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::variable(Idx::STRING), AssignOp::Compound(BinaryOp::Sub)).unwrap();
    assert_eq!(shape(&lowered), vec!["value", "index", "index", "get", "rhs", "op", "set"]);
    let arg_lists: Vec<&[Temp]> = lowered
        .instrs
        .iter()
        .filter_map(|i| match i {
            Instr::CallGetter { args, .. } | Instr::CallSetter { args, .. } => Some(args.as_slice()),
            _ => None,
        })
        .collect();
    assert_eq!(arg_lists, vec![&[Temp(1), Temp(2)][..], &[Temp(1), Temp(2)][..]]);
}

#[test]
fn null_coalescing_sets_only_when_null() {
    let fx = Fixture::new();
    let access = property_access(&fx, Idx::STRING, RefKind::None, Accessors::GET_SET);

    let lowered = lower_ext(&fx, &access, ReceiverExpr::variable(Idx::STRING), AssignOp::NullCoalescing).unwrap();
    assert_eq!(shape(&lowered), vec!["value", "get", "when-null", "rhs", "set", "copy"]);
    assert_eq!(lowered.instrs.len(), 3);
    assert_eq!(lowered.receiver_evaluations(), 1);
}

#[test]
fn deconstruction_distributes_then_sets() {
    let mut fx = Fixture::new();
    let point = fx.named("Point", TypeKind::Struct);
    let access = property_access(&fx, point, RefKind::None, Accessors::SET);
    let ctx = LowerContext::new(&fx.pool, &fx.registry);
    let target = DeconstructionTarget::extension(&ctx, &access, &ReceiverExpr::variable(point)).unwrap();

    let lowered = lower_deconstruction(&[target]);
    assert_eq!(lowered.captures, vec![Some(ReceiverCapture::AddressWithCopies { spill: false })]);
    assert_eq!(
        lowered.instrs,
        vec![
            Instr::ReceiverAddress { into: Temp(0), spill: false },
            Instr::Operand { into: Temp(1) },
            Instr::TupleElement { tuple: Temp(1), element: 0, into: Temp(2) },
            Instr::CallSetter {
                accessor: Accessor::Forwarder(access.setter),
                receiver: ReceiverOperand::CopyOf(Temp(0)),
                args: SmallVec::new(),
                value: Temp(2),
            },
        ]
    );
    assert_eq!(lowered.result, Temp(1));
}

#[test]
fn deconstruction_captures_every_target_before_the_right_hand_side() {
    let mut fx = Fixture::new();
    let point = fx.named("Point", TypeKind::Struct);
    let by_struct = property_access(&fx, point, RefKind::None, Accessors::SET);
    let by_string = property_access(&fx, Idx::STRING, RefKind::None, Accessors::GET_SET);
    let ctx = LowerContext::new(&fx.pool, &fx.registry);
    let targets = [
        DeconstructionTarget::extension(&ctx, &by_struct, &ReceiverExpr::value(point)).unwrap(),
        DeconstructionTarget::extension(&ctx, &by_string, &ReceiverExpr::value(Idx::STRING)).unwrap(),
    ];

    // `(f().P, g().P) = rhs`
    let lowered = lower_deconstruction(&targets);
    let kinds: Vec<&str> = lowered
        .instrs
        .iter()
        .map(|i| match i {
            Instr::ReceiverAddress { .. } => "address",
            Instr::ReceiverValue { .. } => "value",
            Instr::Operand { .. } => "rhs",
            Instr::TupleElement { .. } => "element",
            Instr::CallSetter { .. } => "set",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["address", "value", "rhs", "element", "set", "element", "set"]);
    assert_eq!(lowered.receiver_evaluations(), 2);

    let elements: Vec<(usize, ReceiverOperand)> = lowered
        .instrs
        .windows(2)
        .filter_map(|pair| match pair {
            [Instr::TupleElement { element, tuple, .. }, Instr::CallSetter { receiver, .. }] => {
                assert_eq!(*tuple, lowered.result);
                Some((*element, *receiver))
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        elements,
        vec![(0, ReceiverOperand::CopyOf(Temp(0))), (1, ReceiverOperand::Value(Temp(1)))]
    );
}

#[test]
fn deconstruction_targets_need_only_a_setter() {
    let fx = Fixture::new();
    let ctx = LowerContext::new(&fx.pool, &fx.registry);
    let getter_only = property_access(&fx, Idx::STRING, RefKind::None, Accessors::GET);
    let err = DeconstructionTarget::extension(&ctx, &getter_only, &ReceiverExpr::variable(Idx::STRING)).unwrap_err();
    assert_eq!(err.code, ErrorCode::E3102);

    let by_ref = property_access(&fx, Idx::INT, RefKind::Ref, Accessors::SET);
    let err = DeconstructionTarget::extension(&ctx, &by_ref, &ReceiverExpr::value(Idx::INT)).unwrap_err();
    assert_eq!(err.code, ErrorCode::E3105);
}

#[test]
fn missing_accessors_are_reported() {
    let fx = Fixture::new();
    let getter_only = property_access(&fx, Idx::STRING, RefKind::None, Accessors::GET);
    let err = lower_ext(&fx, &getter_only, ReceiverExpr::variable(Idx::STRING), AssignOp::Simple).unwrap_err();
    assert_eq!(err.code, ErrorCode::E3102);

    let setter_only = property_access(&fx, Idx::STRING, RefKind::None, Accessors::SET);
    let err = lower_ext(&fx, &setter_only, ReceiverExpr::variable(Idx::STRING), AssignOp::Increment { prefix: true }).unwrap_err();
    assert_eq!(err.code, ErrorCode::E3102);
    assert!(lower_ext(&fx, &setter_only, ReceiverExpr::variable(Idx::STRING), AssignOp::Simple).is_ok());
}

#[test]
fn unsupported_members_lower_without_accessors() {
    let fx = Fixture::new();
    let access = ExtensionAccess {
        getter: None,
        setter: None,
        receiver_ref_kind: RefKind::None,
        index_args: 0,
        is_static: false,
        unsupported: true,
    };
    let lowered = lower_ext(&fx, &access, ReceiverExpr::variable(Idx::STRING), AssignOp::Compound(BinaryOp::Add)).unwrap();
    assert_eq!(shape(&lowered), vec!["value", "get", "rhs", "op", "set"]);
}

#[test]
fn static_properties_take_no_receiver() {
    let fx = Fixture::new();
    let access = ExtensionAccess {
        is_static: true,
        ..property_access(&fx, Idx::STRING, RefKind::None, Accessors::GET_SET)
    };
    let lowered = lower_ext(&fx, &access, ReceiverExpr::value(Idx::STRING), AssignOp::Compound(BinaryOp::Add)).unwrap();
    assert_eq!(lowered.capture, None);
    assert_eq!(lowered.receiver_evaluations(), 0);
    assert_eq!(receivers(&lowered), vec![ReceiverOperand::None, ReceiverOperand::None]);
}

#[test]
fn ordinary_struct_properties_mutate_in_place() {
    let mut fx = Fixture::new();
    let point = fx.named("Point", TypeKind::Struct);
    let TypeData::Named { def, .. } = fx.pool.get(point).clone() else {
        panic!("expected a named type");
    };
    let ctx = LowerContext::new(&fx.pool, &fx.registry);
    let access = OrdinaryAccess {
        def,
        index: 0,
        is_static: false,
    };

    let lowered = lower_ordinary_assignment(&ctx, &access, &ReceiverExpr::variable(point), AssignOp::Increment { prefix: true }).unwrap();
    assert_eq!(lowered.capture, Some(ReceiverCapture::Address { spill: false }));
    assert_eq!(
        receivers(&lowered),
        vec![ReceiverOperand::Address(Temp(0)), ReceiverOperand::Address(Temp(0))]
    );
}
