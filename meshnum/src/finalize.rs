//! Finalization: rewrites every element's candidate-table slot into a final
//! local node index, builds the `nonlocal_nodes` table, and populates the
//! sharer records reported back to the caller.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::candidate::{CandidateId, CandidateTable};
use crate::discover::ElementState;
use crate::offsets::GlobalOffsets;
use crate::ownership::OwnershipResult;
use crate::peer::ResolvedRunids;
use crate::types::{Rank, UNASSIGNED};

/// One remote rank's view of which local node indices are visible to it.
/// `shared_nodes` is built in three segments: the nodes *we* own that this
/// rank also contributes to (in owned-node iteration order, i.e. by runid)
/// come first, followed by the nodes this rank owns that we share in
/// (already contiguous, one block per owner). `shared_mine_offset`/
/// `shared_mine_count` bound the first segment, `owned_offset`/`owned_count`
/// the second. A third, unoffseted tail may follow: passive shares, where
/// this rank contributes to a node owned by some third rank — no message
/// ever goes to or from this rank about them, so they get no block of their
/// own, but they must still appear so that every local index in a sharer's
/// list names a rank that also lists us back, and vice versa.
#[derive(Debug, Clone, Serialize)]
pub struct Sharer {
    pub rank: Rank,
    pub shared_nodes: Vec<u32>,
    pub shared_mine_offset: usize,
    pub shared_mine_count: usize,
    pub owned_offset: usize,
    pub owned_count: usize,
}

pub struct FinalizedNumbering {
    /// Per local element, per position slot: the final local node index, or
    /// [`UNASSIGNED`] if that configuration never populates the slot.
    pub element_nodes: Vec<Vec<u32>>,
    pub num_owned: usize,
    pub num_local_nodes: usize,
    /// Global id of every non-owned local node, indexed by
    /// `local_index - num_owned`; strictly increasing.
    pub nonlocal_nodes: Vec<u64>,
    pub sharers: Vec<Sharer>,
}

/// Rewrites candidate ids into final local indices and builds the
/// `nonlocal_nodes`/`sharers` tables. `owned_runid_of` must return, for every
/// id in `ownership.owned`, its position in that vector (its runid) — callers
/// typically pass a map built alongside [`crate::ownership::elect_and_sort`].
pub fn finalize(
    table: &CandidateTable,
    states: &[ElementState],
    ownership: &OwnershipResult,
    resolved: &ResolvedRunids,
    offsets: &GlobalOffsets,
    me: Rank,
) -> FinalizedNumbering {
    let num_owned = ownership.owned.len();

    let mut owned_runid: HashMap<CandidateId, u32> = HashMap::with_capacity(num_owned);
    for (runid, &id) in ownership.owned.iter().enumerate() {
        owned_runid.insert(id, runid as u32);
    }

    // Local index blocks: owned nodes first (by runid), then one block per
    // peer in ascending rank order, each internally ordered by the peer's
    // runid for that candidate so nonlocal_nodes stays strictly increasing.
    let mut peer_base: HashMap<Rank, usize> = HashMap::new();
    let mut cumulative = num_owned;
    for &(rank, count) in &resolved.peer_order {
        peer_base.insert(rank, cumulative);
        cumulative += count;
    }
    let num_local_nodes = cumulative;

    // Candidates sharing a peer must be ordered by the peer's runid within
    // that peer's block; `resolved.peer_order` only carries counts, so
    // re-derive per-peer ordering from `shared_in_by_peer` plus the resolved
    // runid map.
    let mut final_index: HashMap<CandidateId, u32> = HashMap::with_capacity(num_owned + cumulative);
    for (&id, &runid) in &owned_runid {
        final_index.insert(id, runid);
    }
    for (&rank, candidates) in &ownership.shared_in_by_peer {
        let base = peer_base[&rank];
        let ordered = candidates
            .iter()
            .map(|&id| (id, resolved.by_candidate[&id]))
            .sorted_by_key(|&(_, runid)| runid);
        for (i, (id, _)) in ordered.into_iter().enumerate() {
            final_index.insert(id, (base + i) as u32);
        }
    }

    let mut nonlocal_nodes = vec![0u64; num_local_nodes.saturating_sub(num_owned)];
    for (&rank, candidates) in &ownership.shared_in_by_peer {
        let owner_range = offsets.range_of(rank);
        for &id in candidates {
            let runid = resolved.by_candidate[&id];
            let local = final_index[&id] as usize;
            nonlocal_nodes[local - num_owned] = owner_range.start + runid as u64;
        }
    }

    // Iterate owned nodes in runid order, appending to every contributor's
    // sharer record.
    let mut shared_mine: HashMap<Rank, Vec<u32>> = HashMap::new();
    for (runid, &id) in ownership.owned.iter().enumerate() {
        let candidate = table.get(id);
        if !candidate.is_shared() {
            continue;
        }
        for contributor in candidate.contributors() {
            if contributor.rank != me {
                shared_mine.entry(contributor.rank).or_default().push(runid as u32);
            }
        }
    }

    // Passive shares: a node owned by rank A, visible to us, that a third
    // rank B also contributes to. We send B nothing about it — A's reply is
    // what tells B its runid — but B must still appear as a contributor in
    // the output so every sharer relationship holds in both directions.
    // Walked in the same canonical (final local index) order as the owned
    // block, then appended after it so `owned_offset`/`owned_count` keep
    // describing exactly the contiguous per-owner block built above.
    let mut passive: HashMap<Rank, Vec<u32>> = HashMap::new();
    let mut shared_in_canonical: Vec<(u32, CandidateId, Rank)> = ownership
        .shared_in_by_peer
        .iter()
        .flat_map(|(&owner_rank, ids)| ids.iter().map(move |&id| (id, owner_rank)))
        .map(|(id, owner_rank)| (final_index[&id], id, owner_rank))
        .collect();
    shared_in_canonical.sort_by_key(|&(local, _, _)| local);
    for (local, id, owner_rank) in shared_in_canonical {
        for contributor in table.get(id).contributors() {
            if contributor.rank != me && contributor.rank != owner_rank {
                passive.entry(contributor.rank).or_default().push(local);
            }
        }
    }

    let mut ranks: std::collections::BTreeSet<Rank> = shared_mine.keys().copied().collect();
    ranks.extend(ownership.shared_in_by_peer.keys().copied());
    ranks.extend(passive.keys().copied());

    let mut sharers: Vec<Sharer> = Vec::new();
    for rank in ranks {
        let mut shared_nodes = shared_mine.remove(&rank).unwrap_or_default();
        let shared_mine_count = shared_nodes.len();

        // Then iterate shared-in nodes in canonical order, appending to this
        // rank's sharer record. That block is already contiguous at
        // `peer_base[rank]` by construction above.
        let owned_count = ownership
            .shared_in_by_peer
            .get(&rank)
            .map(Vec::len)
            .unwrap_or(0);
        let owned_offset_in_list = shared_nodes.len();
        if owned_count > 0 {
            let base = peer_base[&rank] as u32;
            shared_nodes.extend((0..owned_count as u32).map(|i| base + i));
        }

        if let Some(entries) = passive.remove(&rank) {
            shared_nodes.extend(entries);
        }

        sharers.push(Sharer {
            rank,
            shared_nodes,
            shared_mine_offset: 0,
            shared_mine_count,
            owned_offset: owned_offset_in_list,
            owned_count,
        });
    }

    let vnodes = states.first().map(|s| s.slots.len()).unwrap_or(0);
    let mut element_nodes = vec![vec![UNASSIGNED; vnodes]; states.len()];
    for (le, state) in states.iter().enumerate() {
        for (pos, &id) in state.slots.iter().enumerate() {
            if id == UNASSIGNED {
                continue;
            }
            if let Some(&idx) = final_index.get(&id) {
                element_nodes[le][pos] = idx;
            }
        }
    }

    FinalizedNumbering {
        element_nodes,
        num_owned,
        num_local_nodes,
        nonlocal_nodes,
        sharers,
    }
}
