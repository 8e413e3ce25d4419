//! Core entity types: elements, ghosts, and the position-index schema.

use std::fmt;

use serde::Serialize;

/// MPI-style rank identifier. Signed to match the convention used by the
/// message-passing substrate (`mpi::topology::Rank` is an `i32`).
pub type Rank = i32;

/// Index of a leaf element within whichever rank owns it (local index for a
/// local element, remote-local index for a ghost).
pub type ElementIndex = u32;

/// Sentinel written into `element_nodes` slots that a configuration does not
/// populate, and into any local index field before it has been resolved.
pub const UNASSIGNED: u32 = u32::MAX;

/// Number of node-position slots without triangle-face midpoints.
pub const VNODES_BASE: usize = 9;
/// Number of node-position slots with triangle-face midpoints included.
pub const VNODES_WITH_FACES: usize = 25;

/// The four quad corners, in forest child-id order.
pub const POS_CORNERS: [u8; 4] = [0, 1, 2, 3];
/// The element center.
pub const POS_CENTER: u8 = 4;
/// The four element-face midpoints, in face-id order.
pub const POS_FACE_MID: [u8; 4] = [5, 6, 7, 8];
/// The four center-to-corner triangle-edge midpoints (full-style + with_faces only).
pub const POS_CENTER_CORNER_MID: [u8; 4] = [9, 10, 11, 12];
/// Per split face, the pair of half-face midpoints on the large side, indexed by face id.
pub const POS_SPLIT_HALF_MID: [[u8; 2]; 4] = [[13, 15], [16, 18], [19, 21], [23, 24]];
/// Per split face, the center-of-split-face midpoint, indexed by face id.
pub const POS_SPLIT_CENTER_MID: [u8; 4] = [14, 17, 20, 22];

/// Returns the number of node-position slots for the given configuration.
pub fn vnodes(with_faces: bool) -> usize {
    if with_faces {
        VNODES_WITH_FACES
    } else {
        VNODES_BASE
    }
}

/// A leaf element, local or ghost. Read-only once handed to the constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    /// Index into whichever array the caller's forest keeps it, global across
    /// the whole forest (used only for debug/log context, never for ownership).
    pub global_index: u64,
    pub level: u8,
    pub child_id: u8,
    /// Rank that owns this element. For a local element this is always the
    /// local rank; for a ghost it is the remote owner.
    pub owner_rank: Rank,
    /// Index of this element within its owner's local numbering. For a ghost,
    /// this is the remote-local index the owning rank uses for it.
    pub local_index: ElementIndex,
}

impl Element {
    pub fn is_level_zero(&self) -> bool {
        self.level == 0
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Element(global={}, level={}, child_id={}, owner={}, local={})",
            self.global_index, self.level, self.child_id, self.owner_rank, self.local_index
        )
    }
}

/// One of the two hanging axes a small-side element records in its face-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HangingAxis {
    Horizontal,
    Vertical,
}

/// Bitfield describing which of an element's sides is hanging and the
/// element's child-id, written once per small-side element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FaceCode(pub u8);

impl FaceCode {
    const AXIS_BIT: u8 = 1 << 6;
    const CHILD_MASK: u8 = 0b0011_1111;

    pub fn set(&mut self, axis: HangingAxis, child_id: u8) {
        debug_assert!(child_id <= 3);
        self.0 = match axis {
            HangingAxis::Horizontal => child_id & Self::CHILD_MASK,
            HangingAxis::Vertical => (child_id & Self::CHILD_MASK) | Self::AXIS_BIT,
        };
    }

    pub fn axis(&self) -> HangingAxis {
        if self.0 & Self::AXIS_BIT != 0 {
            HangingAxis::Vertical
        } else {
            HangingAxis::Horizontal
        }
    }

    pub fn child_id(&self) -> u8 {
        self.0 & Self::CHILD_MASK
    }
}
