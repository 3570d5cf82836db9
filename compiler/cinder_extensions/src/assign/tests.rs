use super::*;
use crate::encode::encode_receiver;
use crate::test_support::Fixture;
use cinder_types::{Idx, TypeDef};
use pretty_assertions::assert_eq;

fn encoded(fx: &Fixture, index: usize, start: u32, ty: Idx) -> EncodedBlock {
    let receiver = fx.receiver("r", ty);
    EncodedBlock {
        index,
        declaring_type: fx.decl,
        loc: Fixture::loc(start),
        arity: 0,
        signature: encode_receiver(&fx.pool, &fx.registry, &fx.interner, &receiver, &[]),
    }
}

#[test]
fn int_string_int_yields_two_containers() {
    let fx = Fixture::new();
    let blocks = vec![
        encoded(&fx, 0, 0, Idx::INT),
        encoded(&fx, 1, 10, Idx::STRING),
        encoded(&fx, 2, 20, Idx::INT),
    ];
    let assignment = ContainerAssignor::assign(&blocks);
    assert_eq!(assignment.len(), 2);
    assert_eq!(assignment.slot_of(0).and_then(|s| s.ordinal), Some(0));
    assert_eq!(assignment.slot_of(1).and_then(|s| s.ordinal), Some(1));
    assert_eq!(assignment.slot_of(2).and_then(|s| s.ordinal), Some(0));
    assert_eq!(assignment.slots()[0].blocks, vec![0, 2]);
}

#[test]
fn ordinals_follow_source_position_not_input_order() {
    let fx = Fixture::new();
    // Discovered out of order, as a parallel pass might.
    let blocks = vec![
        encoded(&fx, 1, 50, Idx::STRING),
        encoded(&fx, 0, 5, Idx::INT),
    ];
    let assignment = ContainerAssignor::assign(&blocks);
    assert_eq!(assignment.slot_of(0).and_then(|s| s.ordinal), Some(0));
    assert_eq!(assignment.slot_of(1).and_then(|s| s.ordinal), Some(1));

    let reversed: Vec<EncodedBlock> = blocks.into_iter().rev().collect();
    let again = ContainerAssignor::assign(&reversed);
    assert_eq!(again.slots(), assignment.slots());
}

#[test]
fn error_blocks_get_unnumbered_containers() {
    let fx = Fixture::new();
    let blocks = vec![
        encoded(&fx, 0, 0, Idx::ERROR),
        encoded(&fx, 1, 10, Idx::ERROR),
        encoded(&fx, 2, 20, Idx::INT),
    ];
    let assignment = ContainerAssignor::assign(&blocks);
    assert_eq!(assignment.len(), 3);
    assert!(assignment.slot_of(0).is_some_and(ContainerSlot::is_error));
    assert!(assignment.slot_of(1).is_some_and(ContainerSlot::is_error));
    // Error blocks never consume an ordinal.
    assert_eq!(assignment.slot_of(2).and_then(|s| s.ordinal), Some(0));
    assert_eq!(assignment.containers_of(fx.decl).count(), 1);
}

#[test]
fn ordinals_are_per_declaring_type() {
    let mut fx = Fixture::new();
    let other = fx
        .registry
        .register(TypeDef::static_class(fx.name("App"), fx.name("More")));
    let mut second = encoded(&fx, 1, 10, Idx::STRING);
    second.declaring_type = other;
    let blocks = vec![encoded(&fx, 0, 0, Idx::INT), second];
    let assignment = ContainerAssignor::assign(&blocks);
    assert_eq!(assignment.slot_of(0).and_then(|s| s.ordinal), Some(0));
    assert_eq!(assignment.slot_of(1).and_then(|s| s.ordinal), Some(0));
}

#[test]
fn container_names() {
    let slot = ContainerSlot {
        declaring_type: Fixture::new().decl,
        ordinal: Some(3),
        grouping_key: GroupingKey::error(),
        arity: 2,
        blocks: Vec::new(),
    };
    assert_eq!(slot.type_name(), "<>E__3");
    assert_eq!(slot.metadata_name(), "<>E__3`2");
    assert_eq!(parse_container_ordinal("<>E__3`2"), Some(3));
    assert_eq!(parse_container_ordinal("Nested"), None);
}
