//! Hand-built forests and dispatchers for the scenario tests. Real topology
//! iterators compute these callbacks from an actual quadtree; here they are
//! supplied directly so the tests exercise `meshnum`'s algorithm against
//! known, fixed incidence data instead of a geometry engine.

use meshnum::topology::{CornerEvent, CornerSide, ElementRef, FaceEvent, ForestView, TopologyDispatch};
use meshnum::types::Element;

pub struct ManualForest {
    pub rank: i32,
    pub elements: Vec<Element>,
    pub ghosts: Vec<Element>,
}

impl ForestView for ManualForest {
    fn my_rank(&self) -> i32 {
        self.rank
    }

    fn num_local_elements(&self) -> usize {
        self.elements.len()
    }

    fn local_element(&self, index: u32) -> Element {
        self.elements[index as usize]
    }

    fn ghost_element(&self, index: u32) -> Element {
        self.ghosts[index as usize]
    }
}

pub struct ManualDispatch {
    pub num_volumes: u32,
    pub corners: Vec<CornerEvent>,
    pub faces: Vec<FaceEvent>,
}

impl TopologyDispatch for ManualDispatch {
    fn for_each_volume(&self, f: &mut dyn FnMut(u32)) {
        for le in 0..self.num_volumes {
            f(le);
        }
    }

    fn for_each_face(&self, f: &mut dyn FnMut(&FaceEvent)) {
        for event in &self.faces {
            f(event);
        }
    }

    fn for_each_corner(&self, f: &mut dyn FnMut(&CornerEvent)) {
        for event in &self.corners {
            f(event);
        }
    }
}

pub fn leaf_element(level: u8, child_id: u8, rank: i32, local_index: u32) -> Element {
    Element {
        global_index: local_index as u64,
        level,
        child_id,
        owner_rank: rank,
        local_index,
    }
}

/// Four boundary corner events for a single isolated element: every corner
/// touches only that element.
pub fn solo_corners(local_element: u32) -> Vec<CornerEvent> {
    (0..4)
        .map(|c| CornerEvent {
            sides: vec![CornerSide {
                element: ElementRef::Local(local_element),
                corner_id: c,
            }],
        })
        .collect()
}
