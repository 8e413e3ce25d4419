//! Per-element configuration: which of the 18 triangulation patterns applies.
//!
//! Encoded as a 6-bit code: four split bits (one per element face, set once a
//! smaller neighbor splits that face), a half-style bit (diagonal
//! orientation, child id 1 or 2, before any split), and a full-style bit.
//! Full-style and half-style are mutually exclusive with each other but not
//! with the split bits; a half-style element's split bits get cleared as soon
//! as a split happens, since a split promotes its center to a real corner
//! node the same way full-style does.

use serde::Serialize;

use crate::types::POS_FACE_MID;

/// Bit for "this element-face is split by a smaller neighbor", one per face id.
const SPLIT_BIT: [u8; 4] = [1, 2, 4, 8];
/// Half-style diagonal orientation (child-id 1 or 2, no split faces yet).
const HALF_BIT: u8 = 1 << 4;
/// Full-style: center and all four element-face midpoints are corner-codim.
const FULL_BIT: u8 = 1 << 5;

/// A 6-bit configuration code, stored exactly as it is reported in
/// `configuration[e]`: values in `{0..16, 32}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Configuration(u8);

impl Configuration {
    pub fn plain() -> Self {
        Configuration(0)
    }

    pub fn half(child_id: u8) -> Self {
        if matches!(child_id, 1 | 2) {
            Configuration(HALF_BIT)
        } else {
            Configuration(0)
        }
    }

    pub fn full() -> Self {
        Configuration(FULL_BIT)
    }

    pub fn is_full(self) -> bool {
        self.0 & FULL_BIT != 0
    }

    pub fn is_half(self) -> bool {
        self.0 & HALF_BIT != 0
    }

    pub fn split_mask(self) -> u8 {
        self.0 & 0b1111
    }

    pub fn is_face_split(self, face_id: usize) -> bool {
        self.0 & SPLIT_BIT[face_id] != 0
    }

    /// True once any face split has happened or the element is full-style:
    /// the element's center is a real, numbered corner-codim node.
    pub fn center_is_corner(self) -> bool {
        self.is_full() || self.split_mask() != 0
    }

    /// Records that `face_id` is split by a smaller neighbor. No-op if the
    /// element is already full-style, since every element-face midpoint is
    /// already a corner there.
    pub fn split_face(&mut self, face_id: usize) {
        if self.is_full() {
            return;
        }
        self.0 = (self.0 & !HALF_BIT) | SPLIT_BIT[face_id];
    }

    /// The position index of the element-face midpoint for `face_id`,
    /// populated only if that face is split (see module docs).
    pub fn face_mid_position(self, face_id: usize) -> Option<u8> {
        if self.is_face_split(face_id) {
            Some(POS_FACE_MID[face_id])
        } else {
            None
        }
    }

    /// Raw byte as reported in `configuration[e]`.
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Reconstructs a `Configuration` from a previously-reported raw byte.
    /// Used by tests and by callers replaying a captured output.
    pub fn from_raw(raw: u8) -> Self {
        Configuration(raw)
    }
}

/// One of the 18 enumerated configuration codes, used for table-driven
/// validation and for downstream triangulation pattern lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCode {
    Plain,
    SplitMask(u8),
    Half,
    Full,
}

impl Configuration {
    pub fn code(self) -> ConfigCode {
        if self.is_full() {
            ConfigCode::Full
        } else if self.is_half() {
            ConfigCode::Half
        } else if self.split_mask() != 0 {
            ConfigCode::SplitMask(self.split_mask())
        } else {
            ConfigCode::Plain
        }
    }
}

/// Count of corner-codim positions this configuration populates among
/// {0,1,2,3,4,5,6,7,8}, i.e. everything the base (no-faces) schema covers.
pub fn corner_position_count(config: Configuration) -> usize {
    let mut n = 4; // the four quad corners always exist
    if config.center_is_corner() {
        n += 1;
    }
    if config.is_full() {
        n += 4;
    } else {
        n += config.split_mask().count_ones() as usize;
    }
    n
}
