//! Ownership election: the smallest-rank contributor of each active candidate
//! owns it, and owned candidates are given a stable local sort order.

use std::collections::BTreeMap;

use itertools::Itertools;

use crate::candidate::{CandidateId, CandidateTable, Codim};
use crate::discover::{virtual_center_ids, ElementState};
use crate::types::Rank;

pub struct OwnershipResult {
    /// Owned candidates, sorted by (owner.local_element, owner.position).
    /// The index into this vector is the candidate's `runid`.
    pub owned: Vec<CandidateId>,
    /// Candidates owned elsewhere but visible here, grouped by owner rank.
    /// Each peer's vector is in discovery order; §4.5 sorts it by the
    /// owner's runid once the reply arrives.
    pub shared_in_by_peer: BTreeMap<Rank, Vec<CandidateId>>,
}

pub fn elect_and_sort(table: &CandidateTable, states: &[ElementState], me: Rank) -> OwnershipResult {
    let excluded = virtual_center_ids(states);

    let mut owned = Vec::new();
    let mut shared_in_by_peer: BTreeMap<Rank, Vec<CandidateId>> = BTreeMap::new();

    for (id, candidate) in table.iter_active() {
        if excluded.contains_key(&id) && candidate.codim == Codim::Face {
            continue;
        }
        let owner = candidate.owner();
        if owner.rank == me {
            owned.push(id);
        } else {
            shared_in_by_peer.entry(owner.rank).or_default().push(id);
        }
    }

    owned = owned
        .into_iter()
        .sorted_by_key(|&id| {
            let owner = table.get(id).owner();
            (owner.local_element, owner.position)
        })
        .collect();

    OwnershipResult {
        owned,
        shared_in_by_peer,
    }
}
