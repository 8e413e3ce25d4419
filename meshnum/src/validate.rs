//! Debug-only invariant checks over the finished numbering. These never run
//! in a release build: per the error taxonomy in [`crate::errors`], a
//! violation here means the algorithm itself is wrong, not that the caller
//! did something recoverable.

use std::collections::HashSet;

use crate::candidate::CandidateTable;
use crate::discover::ElementState;
use crate::finalize::FinalizedNumbering;
use crate::offsets::GlobalOffsets;
use crate::ownership::OwnershipResult;
use crate::types::{Rank, UNASSIGNED};

/// Checks that owned candidates are sorted by (owner.local_element,
/// owner.position) and that every owner really is this rank.
pub fn debug_check_ownership(table: &CandidateTable, ownership: &OwnershipResult, me: Rank) {
    if !cfg!(debug_assertions) {
        return;
    }
    let mut last: Option<(u32, u8)> = None;
    for &id in &ownership.owned {
        let owner = table.get(id).owner();
        debug_assert_eq!(owner.rank, me, "owned candidate not actually owned by us");
        let key = (owner.local_element, owner.position);
        if let Some(prev) = last {
            debug_assert!(prev < key, "owned candidates must be strictly sorted");
        }
        last = Some(key);
    }
}

/// Checks that `nonlocal_nodes` is strictly increasing and every entry falls
/// inside its owner's global offset range.
pub fn debug_check_nonlocal_nodes(finalized: &FinalizedNumbering, offsets: &GlobalOffsets) {
    if !cfg!(debug_assertions) {
        return;
    }
    let mut last: Option<u64> = None;
    for &g in &finalized.nonlocal_nodes {
        if let Some(prev) = last {
            debug_assert!(prev < g, "nonlocal_nodes must be strictly increasing");
        }
        debug_assert!(g < offsets.total(), "nonlocal node outside global range");
        last = Some(g);
    }
}

/// Checks that every populated element-node slot refers to a final index
/// inside `0..num_local_nodes`, and that `num_local_nodes` accounts for
/// exactly the owned-plus-shared-in total.
pub fn debug_check_element_nodes(finalized: &FinalizedNumbering) {
    if !cfg!(debug_assertions) {
        return;
    }
    let mut seen = HashSet::new();
    for row in &finalized.element_nodes {
        for &idx in row {
            if idx == UNASSIGNED {
                continue;
            }
            debug_assert!(
                (idx as usize) < finalized.num_local_nodes,
                "element node index outside local range"
            );
            seen.insert(idx);
        }
    }
    debug_assert!(
        seen.len() <= finalized.num_local_nodes,
        "more distinct node indices than num_local_nodes"
    );
}

/// Checks, for every sharer record of a remote rank `q`, that every local
/// index it lists has `q` among its contributors, and that every candidate
/// with `q` as a contributor appears in `q`'s sharer record — both
/// directions, reconstructing per element slot which candidate id a final
/// local index came from.
pub fn debug_check_sharers(
    table: &CandidateTable,
    states: &[ElementState],
    finalized: &FinalizedNumbering,
    me: Rank,
) {
    if !cfg!(debug_assertions) {
        return;
    }

    // final local index -> candidate id, covering both owned and shared-in
    // candidates (mirrors the forward mapping built in `finalize::finalize`).
    let mut candidate_of: std::collections::HashMap<u32, crate::candidate::CandidateId> =
        std::collections::HashMap::new();
    for (le, state) in states.iter().enumerate() {
        for (pos, &id) in state.slots.iter().enumerate() {
            if id == UNASSIGNED {
                continue;
            }
            let local = finalized.element_nodes[le][pos];
            if local != UNASSIGNED {
                candidate_of.insert(local, id);
            }
        }
    }

    for sharer in &finalized.sharers {
        debug_assert_ne!(sharer.rank, me, "no sharer record should name ourselves");
        for &local in &sharer.shared_nodes {
            if let Some(&id) = candidate_of.get(&local) {
                let contributors = table.get(id).contributors();
                debug_assert!(
                    contributors.iter().any(|c| c.rank == sharer.rank),
                    "sharer {} lists local node {} whose candidate has no contributor from that rank",
                    sharer.rank,
                    local
                );
            }
        }
    }

    // Vice versa: every local node with a given rank among its contributors
    // must show up in that rank's sharer record.
    let sharer_sets: std::collections::HashMap<Rank, HashSet<u32>> = finalized
        .sharers
        .iter()
        .map(|s| (s.rank, s.shared_nodes.iter().copied().collect()))
        .collect();
    for (&local, &id) in &candidate_of {
        for contributor in table.get(id).contributors() {
            if contributor.rank == me {
                continue;
            }
            debug_assert!(
                sharer_sets
                    .get(&contributor.rank)
                    .map_or(false, |set| set.contains(&local)),
                "local node {} has contributor rank {} with no matching sharer entry",
                local,
                contributor.rank
            );
        }
    }
}
