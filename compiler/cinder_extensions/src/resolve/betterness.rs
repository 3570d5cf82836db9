//! Priority filtering and overload betterness.

use std::cmp::Ordering;

use cinder_types::conversions::is_better_target;
use cinder_types::{DefId, Idx};
use rustc_hash::FxHashMap;

use super::applicability::Candidate;
use super::{Argument, ResolveContext};

/// Drop every candidate below the highest priority of its declaring type.
///
/// Groups are independent: a high priority in one declaring type never
/// removes candidates of another.
pub(super) fn filter_by_priority(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut highest: FxHashMap<DefId, i32> = FxHashMap::default();
    for candidate in &candidates {
        highest
            .entry(candidate.group)
            .and_modify(|p| *p = (*p).max(candidate.priority))
            .or_insert(candidate.priority);
    }
    candidates
        .into_iter()
        .filter(|c| highest.get(&c.group).copied().unwrap_or(c.priority) <= c.priority)
        .collect()
}

/// Index of the unique best candidate, or the indices of every candidate
/// no other candidate beats.
pub(super) fn best(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
    args: &[Argument],
    candidates: &[Candidate],
) -> Result<usize, Vec<usize>> {
    if candidates.len() == 1 {
        return Ok(0);
    }
    let n = candidates.len();
    let better: Vec<Vec<bool>> = candidates
        .iter()
        .enumerate()
        .map(|(i, a)| {
            candidates
                .iter()
                .enumerate()
                .map(|(j, b)| i != j && is_better(ctx, receiver, args, a, b))
                .collect()
        })
        .collect();
    let undominated: Vec<usize> = (0..n)
        .filter(|&i| (0..n).all(|j| !better[j][i]))
        .collect();
    if let [only] = undominated[..] {
        if (0..n).all(|j| j == only || better[only][j]) {
            return Ok(only);
        }
    }
    if undominated.is_empty() {
        Err((0..n).collect())
    } else {
        Err(undominated)
    }
}

/// `a` is better than `b`: no conversion is worse and at least one is
/// better. The receiver of instance extension members counts as the first
/// argument. With identical parameter lists a non-generic member beats a
/// generic one.
fn is_better(
    ctx: &mut ResolveContext<'_>,
    receiver: Idx,
    args: &[Argument],
    a: &Candidate,
    b: &Candidate,
) -> bool {
    let mut pairs: Vec<(Idx, Idx, Idx)> = Vec::with_capacity(args.len() + 1);
    if let (Some(ra), Some(rb)) = (a.receiver, b.receiver) {
        pairs.push((receiver, ra, rb));
    }
    pairs.extend(
        args.iter()
            .zip(a.params.iter().zip(&b.params))
            .map(|(arg, (&pa, &pb))| (arg.ty, pa, pb)),
    );

    let mut strictly = false;
    let mut identical = true;
    for (arg, pa, pb) in pairs {
        match compare(ctx, arg, pa, pb) {
            Some(Ordering::Greater) => strictly = true,
            Some(Ordering::Less) => return false,
            Some(Ordering::Equal) => {}
            None => identical = false,
        }
    }
    if strictly {
        return true;
    }
    identical && !a.is_generic && b.is_generic
}

/// How the conversion from `arg` to `pa` compares with the one to `pb`.
/// `None` when the targets differ but neither conversion is better.
fn compare(ctx: &mut ResolveContext<'_>, arg: Idx, pa: Idx, pb: Idx) -> Option<Ordering> {
    let pool = &mut *ctx.pool;
    if pool.identical_erased(pa, pb) {
        return Some(Ordering::Equal);
    }
    if pool.identical_erased(arg, pa) {
        return Some(Ordering::Greater);
    }
    if pool.identical_erased(arg, pb) {
        return Some(Ordering::Less);
    }
    let env = ctx.env;
    if is_better_target(pool, ctx.registry, &env, pa, pb) {
        return Some(Ordering::Greater);
    }
    if is_better_target(pool, ctx.registry, &env, pb, pa) {
        return Some(Ordering::Less);
    }
    None
}
