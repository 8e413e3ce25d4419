//! Seams to the collaborators this crate treats as externally supplied: the
//! local-element store, the ghost layer, and the topology iterator that
//! dispatches volume/face/corner callbacks over the forest. Nothing here
//! walks an actual quadtree; these traits just give the numbering core
//! something concrete to be generic over, so a real forest implementation
//! can be swapped in without touching `discover`, `ownership`, or `peer`.

use crate::types::{Element, HangingAxis, Rank};

/// One side of a face connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceSide {
    pub element: ElementRef,
    pub face_id: u8,
}

/// One of the two small sides of a nonconforming face connection. Unlike
/// `FaceSide`, this also names which of the element's own corners coincides
/// with the midpoint of the large neighbor's face — that corner depends on
/// the element's position relative to the hanging face and is not the same
/// slot for every small side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HangingSide {
    pub element: ElementRef,
    pub face_id: u8,
    /// Which of the element's four corners (0..3) touches the large
    /// neighbor's face midpoint.
    pub corner_id: u8,
}

/// Either the local index (for a local leaf) or an index into the ghost layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementRef {
    Local(u32),
    Ghost(u32),
}

/// A face connection as dispatched by the topology iterator.
#[derive(Debug, Clone)]
pub enum FaceEvent {
    /// Only one side of the face exists: the forest boundary.
    Boundary(FaceSide),
    /// Two same-size sides meet.
    Conforming(FaceSide, FaceSide),
    /// One large side faces two small sides across the face.
    Nonconforming {
        large: FaceSide,
        /// The two small sides, in a fixed orientation-paired order.
        small: [HangingSide; 2],
        /// Child ids of the two small elements, paired with `small` by index.
        small_child_ids: [u8; 2],
        axis: HangingAxis,
    },
}

/// A corner connection: every participating side contributes to one node.
#[derive(Debug, Clone)]
pub struct CornerEvent {
    pub sides: Vec<CornerSide>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerSide {
    pub element: ElementRef,
    /// Which of the element's four corners (0..3) this connection touches.
    pub corner_id: u8,
}

/// The local-element store plus ghost layer: everything the traversal needs
/// to resolve an `ElementRef` into level/child-id/owner information.
pub trait ForestView {
    fn my_rank(&self) -> Rank;
    fn num_local_elements(&self) -> usize;
    fn local_element(&self, index: u32) -> Element;
    fn ghost_element(&self, index: u32) -> Element;

    fn element(&self, r: ElementRef) -> Element {
        match r {
            ElementRef::Local(i) => self.local_element(i),
            ElementRef::Ghost(i) => self.ghost_element(i),
        }
    }
}

/// The topology iterator: invokes each callback exactly once per
/// volume/face/corner connection in the forest, including connections that
/// cross into the ghost layer.
pub trait TopologyDispatch {
    fn for_each_volume(&self, f: &mut dyn FnMut(u32));
    fn for_each_face(&self, f: &mut dyn FnMut(&FaceEvent));
    fn for_each_corner(&self, f: &mut dyn FnMut(&CornerEvent));
}
