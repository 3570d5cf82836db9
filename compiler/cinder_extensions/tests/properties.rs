//! Property-based tests for container assignment.
//!
//! 1. Determinism: the order blocks reach the binder never changes the
//!    containers, their ordinals or their members.
//! 2. Grouping: two blocks share a container exactly when their receivers
//!    are identical up to nullability and tuple names.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::uninlined_format_args,
    reason = "Proptest macros generate code with these patterns"
)]

mod common;

use cinder_extensions::{BindOutput, ExtensionBlockDecl};
use cinder_types::Idx;
use common::World;
use proptest::prelude::*;

/// Receiver types the strategies pick from by index.
fn receivers(world: &mut World) -> Vec<Idx> {
    let nullable_string = world.pool.nullable_ref(Idx::STRING);
    let x = world.name("x");
    let named = world.pool.tuple(&[Idx::INT, Idx::INT], &[Some(x), None]);
    let unnamed = world.pool.tuple(&[Idx::INT, Idx::INT], &[]);
    vec![
        Idx::INT,
        Idx::STRING,
        nullable_string,
        Idx::OBJECT,
        named,
        unnamed,
    ]
}

fn blocks(world: &World, types: &[Idx], choices: &[usize]) -> Vec<ExtensionBlockDecl> {
    choices
        .iter()
        .zip(0u32..)
        .map(|(&choice, i)| {
            world
                .block(i * 10, types[choice])
                .with_member(world.method(&format!("M{i}"), &[], Idx::VOID))
        })
        .collect()
}

/// `(ordinal, grouping key, member names)` per container, by ordinal.
fn summary(world: &World, out: &BindOutput) -> Vec<(Option<u32>, String, Vec<String>)> {
    let mut containers: Vec<_> = out
        .table
        .containers()
        .map(|(_, c)| {
            let mut members: Vec<String> = c
                .skeletons
                .iter()
                .map(|&m| world.interner.lookup(out.table.skeleton(m).name).to_owned())
                .collect();
            members.sort();
            (c.ordinal, c.grouping_key.as_str().to_owned(), members)
        })
        .collect();
    containers.sort();
    containers
}

proptest! {
    #[test]
    fn assignment_ignores_input_order(
        choices in prop::collection::vec(0usize..6, 1..16),
        seed in any::<u64>(),
    ) {
        let mut world = World::new();
        let types = receivers(&mut world);
        let decls = blocks(&world, &types, &choices);

        // Deterministic shuffle driven by the seed.
        let mut shuffled = decls.clone();
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = usize::try_from(state % (i as u64 + 1)).unwrap();
            shuffled.swap(i, j);
        }

        let forward = world.bind(&decls);
        let permuted = world.bind(&shuffled);
        prop_assert_eq!(summary(&world, &forward), summary(&world, &permuted));
    }

    #[test]
    fn containers_group_erased_identical_receivers(
        choices in prop::collection::vec(0usize..6, 2..12),
    ) {
        let mut world = World::new();
        let types = receivers(&mut world);
        let decls = blocks(&world, &types, &choices);
        let out = world.bind(&decls);

        for i in 0..choices.len() {
            for j in 0..choices.len() {
                let same_type = world.pool.identical_erased(types[choices[i]], types[choices[j]]);
                let same_slot = out.assignment.slot_of(i) == out.assignment.slot_of(j);
                prop_assert_eq!(same_type, same_slot, "blocks {} and {}", i, j);
            }
        }

        // Ordinals are dense and follow first appearance in source order.
        let ordinals: Vec<Option<u32>> = out.table.containers().map(|(_, c)| c.ordinal).collect();
        let expected: Vec<Option<u32>> = (0u32..).take(ordinals.len()).map(Some).collect();
        prop_assert_eq!(ordinals, expected);
    }
}
