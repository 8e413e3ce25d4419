//! Incidence discovery: walks the topology iterator's volume/face/corner
//! callbacks and builds the candidate table, per-element configuration,
//! face-codes, and the (as-yet-unfinalized) element→candidate slot table.

use std::collections::HashMap;

use tracing::instrument;

use crate::candidate::{CandidateId, CandidateTable, Codim, Contributor};
use crate::config::Configuration;
use crate::topology::{CornerEvent, ElementRef, FaceEvent, ForestView, TopologyDispatch};
use crate::types::{
    ElementIndex, Rank, HangingAxis, FaceCode, POS_CENTER, POS_CENTER_CORNER_MID,
    POS_SPLIT_CENTER_MID, POS_SPLIT_HALF_MID, UNASSIGNED,
};

/// Per-local-element traversal state: the configuration code, face code, and
/// the slot table mapping a position index to a candidate id (or
/// [`UNASSIGNED`]).
pub struct ElementState {
    pub config: Configuration,
    pub face_code: FaceCode,
    pub slots: Vec<CandidateId>,
    /// Tracked separately from `slots[4]` even for half-style elements, so a
    /// later promotion to full-style can retag the existing candidate in
    /// place without it ever having counted as an output node beforehand.
    pub(crate) center_candidate: CandidateId,
}

pub struct Discovery {
    pub table: CandidateTable,
    pub states: Vec<ElementState>,
    pub with_faces: bool,
    pub full_style: bool,
    me: Rank,
}

impl Discovery {
    pub fn new(forest: &dyn ForestView, full_style: bool, with_faces: bool) -> Self {
        Discovery {
            table: CandidateTable::new(),
            states: Vec::with_capacity(forest.num_local_elements()),
            with_faces,
            full_style,
            me: forest.my_rank(),
        }
    }

    fn contributor(&self, element: ElementRef, position: u8, forest: &dyn ForestView) -> Contributor {
        let el = forest.element(element);
        Contributor {
            rank: el.owner_rank,
            local_element: el.local_index,
            position,
        }
    }

    fn slot_get(&self, le: ElementIndex, position: u8) -> CandidateId {
        self.states[le as usize].slots[position as usize]
    }

    fn slot_set(&mut self, le: ElementIndex, position: u8, id: CandidateId) {
        self.states[le as usize].slots[position as usize] = id;
    }

    fn get_or_create_local(
        &mut self,
        forest: &dyn ForestView,
        le: ElementIndex,
        position: u8,
        codim: Codim,
    ) -> CandidateId {
        let existing = self.slot_get(le, position);
        if existing != UNASSIGNED {
            return existing;
        }
        let contributor = self.contributor(ElementRef::Local(le), position, forest);
        let id = self.table.insert(codim, contributor);
        self.slot_set(le, position, id);
        id
    }

    #[instrument(skip(self, forest))]
    fn on_volume(&mut self, forest: &dyn ForestView, le: u32) {
        let element = forest.local_element(le);
        let is_full = self.full_style || element.is_level_zero();
        let config = if is_full {
            Configuration::full()
        } else {
            Configuration::half(element.child_id)
        };

        let center_contributor = self.contributor(ElementRef::Local(le), POS_CENTER, forest);
        let center_codim = if is_full { Codim::Corner } else { Codim::Face };
        let center_candidate = self.table.insert(center_codim, center_contributor);

        let mut slots = vec![UNASSIGNED; crate::types::vnodes(self.with_faces)];
        if is_full {
            slots[POS_CENTER as usize] = center_candidate;
        }

        self.states.push(ElementState {
            config,
            face_code: FaceCode::default(),
            slots,
            center_candidate,
        });

        if is_full && self.with_faces {
            self.emit_center_to_corner_midpoints(forest, le);
        }
    }

    fn emit_center_to_corner_midpoints(&mut self, forest: &dyn ForestView, le: u32) {
        for pos in POS_CENTER_CORNER_MID.iter() {
            self.get_or_create_local(forest, le, *pos, Codim::Face);
        }
    }

    #[instrument(skip(self, forest, event))]
    fn on_face(&mut self, forest: &dyn ForestView, event: &FaceEvent) {
        match event {
            // A boundary or conforming face never populates an
            // element-face-midpoint slot (5..8) in the base schema — those
            // slots exist only on the large side of a nonconforming face.
            // with_faces doesn't change that either: the triangle edges a
            // conforming/boundary face would add coincide with the plain
            // corner-to-corner split, which needs no extra point.
            FaceEvent::Boundary(_) => {}
            FaceEvent::Conforming(_, _) => {}
            FaceEvent::Nonconforming {
                large,
                small,
                small_child_ids,
                axis,
            } => self.on_nonconforming_face(forest, large, small, small_child_ids, *axis),
        }
    }

    fn on_nonconforming_face(
        &mut self,
        forest: &dyn ForestView,
        large: &crate::topology::FaceSide,
        small: &[crate::topology::HangingSide; 2],
        small_child_ids: &[u8; 2],
        axis: HangingAxis,
    ) {
        let large_le = match large.element {
            ElementRef::Local(le) => Some(le),
            ElementRef::Ghost(_) => None,
        };

        // The large element's face midpoint is simultaneously a corner of
        // each small element — but which corner depends on that element's
        // own position relative to the hanging face, so each small side
        // carries its own corner id rather than assuming a fixed slot.
        let face_mid_pos = crate::types::POS_FACE_MID[large.face_id as usize];
        let large_contributor = self.contributor(large.element, face_mid_pos, forest);
        let mut id = self.table.insert(Codim::Corner, large_contributor);
        for s in small {
            let c = self.contributor(s.element, s.corner_id, forest);
            self.table.contribute(id, c);
            if let ElementRef::Local(small_le) = s.element {
                self.slot_set(small_le, s.corner_id, id);
            }
        }

        if let Some(le) = large_le {
            self.slot_set(le, face_mid_pos, id);
            let state = &mut self.states[le as usize];
            state.config.split_face(large.face_id as usize);
            if state.config.center_is_corner() {
                self.table.get_mut(state.center_candidate).retag(Codim::Corner);
                state.slots[POS_CENTER as usize] = state.center_candidate;
            }
        }

        for (side, &child_id) in small.iter().zip(small_child_ids.iter()) {
            if let ElementRef::Local(le) = side.element {
                self.states[le as usize].face_code.set(axis, child_id);
            }
        }

        if self.with_faces {
            self.emit_split_face_triangle_midpoints(forest, large, small, &mut id);
        }
    }

    fn emit_split_face_triangle_midpoints(
        &mut self,
        forest: &dyn ForestView,
        large: &crate::topology::FaceSide,
        small: &[crate::topology::HangingSide; 2],
        _large_corner_candidate: &mut CandidateId,
    ) {
        let face_id = large.face_id as usize;
        if let ElementRef::Local(le) = large.element {
            let center_pos = POS_SPLIT_CENTER_MID[face_id];
            self.get_or_create_local(forest, le, center_pos, Codim::Face);

            for (i, half_pos) in POS_SPLIT_HALF_MID[face_id].iter().enumerate() {
                let large_contributor = self.contributor(large.element, *half_pos, forest);
                let cid = self.table.insert(Codim::Face, large_contributor);
                self.slot_set(le, *half_pos, cid);
                if let Some(side) = small.get(i) {
                    if let ElementRef::Local(small_le) = side.element {
                        let small_pos = crate::types::POS_FACE_MID[side.face_id as usize];
                        let c = self.contributor(side.element, small_pos, forest);
                        self.table.contribute(cid, c);
                        self.slot_set(small_le, small_pos, cid);
                    }
                }
            }
        }
    }

    #[instrument(skip(self, forest, event))]
    fn on_corner(&mut self, forest: &dyn ForestView, event: &CornerEvent) {
        let mut id: Option<CandidateId> = None;
        for side in &event.sides {
            let contributor = self.contributor(side.element, side.corner_id, forest);
            match id {
                None => {
                    let new_id = self.table.insert(Codim::Corner, contributor);
                    id = Some(new_id);
                }
                Some(existing) => self.table.contribute(existing, contributor),
            }
        }
        if let Some(id) = id {
            for side in &event.sides {
                if let ElementRef::Local(le) = side.element {
                    self.slot_set(le, side.corner_id, id);
                }
            }
        }
    }

    /// Runs the full traversal and returns the populated discovery state.
    pub fn run(mut self, forest: &dyn ForestView, dispatch: &dyn TopologyDispatch) -> Self {
        dispatch.for_each_volume(&mut |le| self.on_volume(forest, le));
        dispatch.for_each_face(&mut |ev| self.on_face(forest, ev));
        dispatch.for_each_corner(&mut |ev| self.on_corner(forest, ev));
        self.table.prune_invisible(self.me);
        self
    }
}

/// Used by [`crate::ownership`] to decide whether a candidate counts as a
/// real output node: a center candidate that was never promoted to
/// corner-codim is excluded.
pub fn is_countable(codim: Codim, is_center_candidate_and_face: bool) -> bool {
    match codim {
        Codim::Corner => true,
        Codim::Face => !is_center_candidate_and_face,
    }
}

/// Tracks, for each candidate id, whether it is the (still face-codim, i.e.
/// un-promoted) center candidate of some local element — these are excluded
/// from ownership/output entirely.
pub fn virtual_center_ids(states: &[ElementState]) -> HashMap<CandidateId, ()> {
    let mut set = HashMap::new();
    for state in states {
        if state.config.center_is_corner() {
            continue;
        }
        set.insert(state.center_candidate, ());
    }
    set
}
