//! The grow-only candidate-node registry: every position in the mesh that
//! might become an output node gets an entry here, tracking which ranks
//! contribute to it until ownership is elected. A flat `Vec<Candidate>` plus,
//! per element slot, a 32-bit index (or [`crate::types::UNASSIGNED`]) gives
//! arena-style ownership with no cycles — the owner is tracked as an index
//! into the contributor list, recomputed on append, rather than a pointer
//! that growth could invalidate.

use crate::types::{ElementIndex, Rank};

/// Whether a candidate sits on a face boundary or a corner of the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codim {
    Face,
    Corner,
}

/// A (rank, local-element, position) triple asserting that element references
/// this candidate at that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contributor {
    pub rank: Rank,
    pub local_element: ElementIndex,
    pub position: u8,
}

impl Contributor {
    fn key(&self) -> (ElementIndex, u8) {
        (self.local_element, self.position)
    }
}

/// An in-construction record for what may become a single node once ownership
/// is elected. `contributors` is kept sorted by rank with `owner_idx` pointing
/// at the current minimum-rank entry.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub codim: Codim,
    contributors: Vec<Contributor>,
    owner_idx: usize,
    /// Set false for candidates pruned because no local contributor ever
    /// referenced them.
    active: bool,
}

impl Candidate {
    fn new(codim: Codim, first: Contributor) -> Self {
        Candidate {
            codim,
            contributors: vec![first],
            owner_idx: 0,
            active: true,
        }
    }

    pub fn contributors(&self) -> &[Contributor] {
        &self.contributors
    }

    pub fn owner(&self) -> Contributor {
        self.contributors[self.owner_idx]
    }

    pub fn owner_rank(&self) -> Rank {
        self.owner().rank
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn has_local_contributor(&self, me: Rank) -> bool {
        self.contributors.iter().any(|c| c.rank == me)
    }

    pub fn is_shared(&self) -> bool {
        self.contributors.len() > 1
    }

    /// Appends a contribution, maintaining duplicate suppression: a repeated
    /// contribution from the same rank keeps only the smallest (element,
    /// position) pair.
    fn add(&mut self, contributor: Contributor) {
        if let Some(existing) = self
            .contributors
            .iter_mut()
            .find(|c| c.rank == contributor.rank)
        {
            if contributor.key() < existing.key() {
                *existing = contributor;
            }
        } else {
            self.contributors.push(contributor);
        }
        self.recompute_owner();
    }

    fn recompute_owner(&mut self) {
        self.owner_idx = self
            .contributors
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| c.rank)
            .map(|(i, _)| i)
            .expect("candidate always has at least one contributor");
    }

    /// Reclassifies this candidate's codimension in place, e.g. when a
    /// half-style element's face split promotes its center to a corner. The
    /// contributor list is untouched.
    pub fn retag(&mut self, codim: Codim) {
        self.codim = codim;
    }
}

/// Grow-only table of candidate nodes, addressed by a 32-bit id.
#[derive(Debug, Default)]
pub struct CandidateTable {
    candidates: Vec<Candidate>,
}

pub type CandidateId = u32;

impl CandidateTable {
    pub fn new() -> Self {
        CandidateTable {
            candidates: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: CandidateId) -> &Candidate {
        &self.candidates[id as usize]
    }

    pub fn get_mut(&mut self, id: CandidateId) -> &mut Candidate {
        &mut self.candidates[id as usize]
    }

    /// Creates a brand-new candidate and returns its id.
    pub fn insert(&mut self, codim: Codim, contributor: Contributor) -> CandidateId {
        self.candidates.push(Candidate::new(codim, contributor));
        (self.candidates.len() - 1) as CandidateId
    }

    /// Adds a contribution to an existing candidate.
    pub fn contribute(&mut self, id: CandidateId, contributor: Contributor) {
        self.get_mut(id).add(contributor);
    }

    /// Marks candidates with no local contributor inactive: they were only
    /// ever touched by ghost-layer lookups on our side and carry no node this
    /// rank needs to number.
    pub fn prune_invisible(&mut self, me: Rank) {
        for candidate in &mut self.candidates {
            if !candidate.has_local_contributor(me) {
                candidate.active = false;
            }
        }
    }

    pub fn iter_active(&self) -> impl Iterator<Item = (CandidateId, &Candidate)> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.active)
            .map(|(i, c)| (i as CandidateId, c))
    }
}
