mod support;

use std::thread;

use pretty_assertions::assert_eq;

use meshnum::build_node_numbering;
use meshnum::topology::{CornerEvent, CornerSide, ElementRef, FaceEvent, FaceSide, HangingSide};
use meshnum::transport::LocalFabric;
use meshnum::types::{HangingAxis, UNASSIGNED};

use support::{leaf_element, solo_corners, ManualDispatch, ManualForest};

#[test]
fn single_full_style_leaf_gets_four_corners_and_a_center() {
    let forest = ManualForest {
        rank: 0,
        elements: vec![leaf_element(0, 0, 0, 0)],
        ghosts: vec![],
    };
    let dispatch = ManualDispatch {
        num_volumes: 1,
        corners: solo_corners(0),
        faces: vec![],
    };
    let fabric = LocalFabric::new(1);
    let transport = fabric.transport_for(0);

    let output =
        build_node_numbering(&forest, &dispatch, &transport, /* full_style */ true, false)
            .unwrap();

    assert_eq!(output.owned_count, 5);
    assert_eq!(output.num_local_nodes, 5);
    assert!(output.nonlocal_nodes.is_empty());
    assert_eq!(output.vnodes, 9);

    let nodes = &output.element_nodes[0];
    let corner_nodes: Vec<u32> = nodes[0..4].to_vec();
    let mut sorted = corner_nodes.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 4, "the four corners must be distinct nodes");
    assert_ne!(nodes[4], UNASSIGNED, "full-style center must be a node");
}

#[test]
fn single_half_style_leaf_excludes_the_center() {
    let forest = ManualForest {
        rank: 0,
        elements: vec![leaf_element(1, 1, 0, 0)],
        ghosts: vec![],
    };
    let dispatch = ManualDispatch {
        num_volumes: 1,
        corners: solo_corners(0),
        faces: vec![],
    };
    let fabric = LocalFabric::new(1);
    let transport = fabric.transport_for(0);

    let output =
        build_node_numbering(&forest, &dispatch, &transport, /* full_style */ false, false)
            .unwrap();

    assert_eq!(output.owned_count, 4);
    assert_eq!(output.num_local_nodes, 4);
    assert_eq!(output.element_nodes[0][4], UNASSIGNED);
}

/// Two ranks, each with one full-style leaf, sharing a single corner. Rank 0
/// (the lower rank) must own the shared node; rank 1 resolves its runid over
/// the wire and reports it as a nonlocal node.
#[test]
fn two_ranks_share_one_corner_owned_by_the_lower_rank() {
    let fabric = LocalFabric::new(2);

    let forest0 = ManualForest {
        rank: 0,
        elements: vec![leaf_element(0, 0, 0, 0)],
        ghosts: vec![leaf_element(0, 0, 1, 0)],
    };
    let mut corners0 = solo_corners(0);
    corners0[3] = CornerEvent {
        sides: vec![
            CornerSide {
                element: ElementRef::Local(0),
                corner_id: 3,
            },
            CornerSide {
                element: ElementRef::Ghost(0),
                corner_id: 0,
            },
        ],
    };
    let dispatch0 = ManualDispatch {
        num_volumes: 1,
        corners: corners0,
        faces: vec![],
    };

    let forest1 = ManualForest {
        rank: 1,
        elements: vec![leaf_element(0, 0, 1, 0)],
        ghosts: vec![leaf_element(0, 0, 0, 0)],
    };
    let mut corners1 = solo_corners(0);
    corners1[0] = CornerEvent {
        sides: vec![
            CornerSide {
                element: ElementRef::Local(0),
                corner_id: 0,
            },
            CornerSide {
                element: ElementRef::Ghost(0),
                corner_id: 3,
            },
        ],
    };
    let dispatch1 = ManualDispatch {
        num_volumes: 1,
        corners: corners1,
        faces: vec![],
    };

    let t0 = fabric.transport_for(0);
    let t1 = fabric.transport_for(1);

    let h0 = thread::spawn(move || build_node_numbering(&forest0, &dispatch0, &t0, true, false));
    let h1 = thread::spawn(move || build_node_numbering(&forest1, &dispatch1, &t1, true, false));

    let out0 = h0.join().unwrap().unwrap();
    let out1 = h1.join().unwrap().unwrap();

    // Rank 0 owns all five of its own nodes: the shared corner is among them.
    assert_eq!(out0.owned_count, 5);
    assert_eq!(out0.num_local_nodes, 5);
    assert!(out0.nonlocal_nodes.is_empty());

    // Rank 1 owns its other four corners plus its center, and shares in
    // exactly the one corner rank 0 owns.
    assert_eq!(out1.owned_count, 4);
    assert_eq!(out1.num_local_nodes, 5);
    assert_eq!(out1.nonlocal_nodes.len(), 1);

    // Global ranges are disjoint and contiguous: rank 0 first, rank 1 second.
    assert_eq!(out0.global_offset, 0);
    assert_eq!(out1.global_offset, 5);
    assert_eq!(out0.global_owned_count, 9);
    assert_eq!(out1.global_owned_count, 9);

    // Rank 1's shared corner resolves to one of rank 0's five global ids.
    let shared_global = out1.nonlocal_nodes[0];
    assert!(shared_global < 5);
    let shared_local = out1.element_nodes[0][0];
    assert_eq!(shared_local, 4, "shared corner comes after the four owned nodes");
}

/// Single rank, 2x2 uniform refinement of a unit square, half-style. The
/// four interior corners where all four leaves meet collapse to a single
/// shared node, giving a 3x3 grid of nine owned corners; exactly the two
/// elements with child-id 1 or 2 get the half-style bit set.
#[test]
fn uniform_2x2_refinement_collapses_to_a_nine_node_grid() {
    // Position convention: corner 0 = SW, 1 = SE, 2 = NW, 3 = NE. Grid points
    // P(col,row), row 0 at the bottom, col 0 at the left.
    // E0 = bottom-left (child 0), E1 = bottom-right (child 1),
    // E2 = top-left (child 2), E3 = top-right (child 3).
    let forest = ManualForest {
        rank: 0,
        elements: vec![
            leaf_element(1, 0, 0, 0),
            leaf_element(1, 1, 0, 1),
            leaf_element(1, 2, 0, 2),
            leaf_element(1, 3, 0, 3),
        ],
        ghosts: vec![],
    };

    let side = |le: u32, corner: u8| CornerSide {
        element: ElementRef::Local(le),
        corner_id: corner,
    };
    let solo = |le: u32, corner: u8| CornerEvent {
        sides: vec![side(le, corner)],
    };
    let shared = |sides: Vec<CornerSide>| CornerEvent { sides };

    let corners = vec![
        solo(0, 0),                             // P00, boundary
        shared(vec![side(0, 1), side(1, 0)]),   // P10, shared edge
        solo(1, 1),                             // P20, boundary
        shared(vec![side(0, 2), side(2, 0)]),   // P01, shared edge
        shared(vec![side(0, 3), side(1, 2), side(2, 1), side(3, 0)]), // P11, center
        shared(vec![side(1, 3), side(3, 1)]),   // P21, shared edge
        solo(2, 2),                             // P02, boundary
        shared(vec![side(2, 3), side(3, 2)]),   // P12, shared edge
        solo(3, 3),                             // P22, boundary
    ];

    let dispatch = ManualDispatch {
        num_volumes: 4,
        corners,
        faces: vec![],
    };
    let fabric = LocalFabric::new(1);
    let transport = fabric.transport_for(0);

    let output =
        build_node_numbering(&forest, &dispatch, &transport, /* full_style */ false, false)
            .unwrap();

    assert_eq!(output.owned_count, 9);
    assert_eq!(output.num_local_nodes, 9);

    let half_style_elements: Vec<usize> = output
        .configuration
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_half())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(half_style_elements, vec![1, 2], "only child-id 1 and 2 get the half bit");

    let mut all_corners: Vec<u32> = output
        .element_nodes
        .iter()
        .flat_map(|row| row[0..4].iter().copied())
        .collect();
    all_corners.sort();
    all_corners.dedup();
    assert_eq!(all_corners.len(), 9, "sixteen corner slots collapse to nine distinct nodes");
}

/// Single rank, one coarse half-style element with a single face split by two
/// smaller neighbors. The coarse element is promoted to full-style for that
/// face: its center becomes a real corner node and exactly the one face-bit
/// is set (not the half bit, not the full bit).
#[test]
fn nonconforming_face_promotes_half_style_coarse_element() {
    let forest = ManualForest {
        rank: 0,
        elements: vec![
            leaf_element(1, 1, 0, 0), // large, half-style (child 1) before promotion
            leaf_element(1, 1, 0, 1), // small 0
            leaf_element(1, 2, 0, 2), // small 1
        ],
        ghosts: vec![],
    };

    // Boundary corners not touched by the nonconforming face event: the
    // large element's corners 1..3, and each small element's corners 1..3
    // (corner 0 of each small element is consumed by the face event itself).
    let mut corners = vec![
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 1 }],
        },
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 2 }],
        },
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 3 }],
        },
    ];
    for le in [1u32, 2] {
        for corner_id in 1..4 {
            corners.push(CornerEvent {
                sides: vec![CornerSide { element: ElementRef::Local(le), corner_id }],
            });
        }
    }

    let faces = vec![FaceEvent::Nonconforming {
        large: FaceSide { element: ElementRef::Local(0), face_id: 0 },
        small: [
            HangingSide { element: ElementRef::Local(1), face_id: 1, corner_id: 0 },
            HangingSide { element: ElementRef::Local(2), face_id: 1, corner_id: 0 },
        ],
        small_child_ids: [1, 2],
        axis: HangingAxis::Horizontal,
    }];

    let dispatch = ManualDispatch {
        num_volumes: 3,
        corners,
        faces,
    };
    let fabric = LocalFabric::new(1);
    let transport = fabric.transport_for(0);

    let output =
        build_node_numbering(&forest, &dispatch, &transport, /* full_style */ false, false)
            .unwrap();

    let large_config = output.configuration[0];
    assert!(!large_config.is_half(), "promotion clears the half bit");
    assert!(!large_config.is_full(), "promotion does not set the global full bit");
    assert_eq!(large_config.split_mask().count_ones(), 1, "exactly one face-bit set");
    assert_ne!(
        output.element_nodes[0][4],
        UNASSIGNED,
        "the promoted center must be a real node"
    );

    assert_eq!(output.face_code[1].axis(), HangingAxis::Horizontal);
    assert_eq!(output.face_code[1].child_id(), 1);
    assert_eq!(output.face_code[2].axis(), HangingAxis::Horizontal);
    assert_eq!(output.face_code[2].child_id(), 2);

    // Both small elements' own corner-0 is the same shared hanging node as
    // the large element's (promoted) face-midpoint slot.
    assert_ne!(output.element_nodes[1][0], UNASSIGNED);
    assert_ne!(output.element_nodes[2][0], UNASSIGNED);
    assert_eq!(output.element_nodes[1][0], output.element_nodes[0][5]);
    assert_eq!(output.element_nodes[2][0], output.element_nodes[0][5]);
}

/// Same shape as `nonconforming_face_promotes_half_style_coarse_element`, but
/// each small element's corner touching the large element's face midpoint is
/// a *different*, nonzero corner (2 and 3 respectively) rather than both
/// elements' corner 0. Confirms the hanging corner is read from each side's
/// own record instead of being assumed to be a fixed slot.
#[test]
fn nonconforming_face_uses_each_small_sides_own_corner_id() {
    let forest = ManualForest {
        rank: 0,
        elements: vec![
            leaf_element(1, 1, 0, 0), // large, half-style (child 1) before promotion
            leaf_element(1, 1, 0, 1), // small 0, hanging corner is its corner 2
            leaf_element(1, 2, 0, 2), // small 1, hanging corner is its corner 3
        ],
        ghosts: vec![],
    };

    let mut corners = vec![
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 0 }],
        },
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 1 }],
        },
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 2 }],
        },
        CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 3 }],
        },
    ];
    // small 0's corners 0, 1, 3 are its own (corner 2 is the hanging corner);
    // small 1's corners 0, 1, 2 are its own (corner 3 is the hanging corner).
    for &corner_id in &[0u8, 1, 3] {
        corners.push(CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(1), corner_id }],
        });
    }
    for &corner_id in &[0u8, 1, 2] {
        corners.push(CornerEvent {
            sides: vec![CornerSide { element: ElementRef::Local(2), corner_id }],
        });
    }

    let faces = vec![FaceEvent::Nonconforming {
        large: FaceSide { element: ElementRef::Local(0), face_id: 0 },
        small: [
            HangingSide { element: ElementRef::Local(1), face_id: 1, corner_id: 2 },
            HangingSide { element: ElementRef::Local(2), face_id: 1, corner_id: 3 },
        ],
        small_child_ids: [1, 2],
        axis: HangingAxis::Horizontal,
    }];

    let dispatch = ManualDispatch {
        num_volumes: 3,
        corners,
        faces,
    };
    let fabric = LocalFabric::new(1);
    let transport = fabric.transport_for(0);

    let output =
        build_node_numbering(&forest, &dispatch, &transport, /* full_style */ false, false)
            .unwrap();

    // The shared hanging node lands on each small element's *declared*
    // corner, not corner 0.
    assert_ne!(output.element_nodes[1][2], UNASSIGNED);
    assert_ne!(output.element_nodes[2][3], UNASSIGNED);
    assert_eq!(output.element_nodes[1][2], output.element_nodes[0][5]);
    assert_eq!(output.element_nodes[2][3], output.element_nodes[0][5]);

    // Each small element's corner 0 is its own, unrelated node.
    assert_ne!(output.element_nodes[1][0], output.element_nodes[0][5]);
    assert_ne!(output.element_nodes[2][0], output.element_nodes[0][5]);
}

/// Two ranks: a coarse half-style leaf on rank 0 faces two smaller leaves on
/// rank 1 across one face. The shared hanging midpoint is a corner owned by
/// rank 0 (the lower rank); rank 1 sees it as a nonlocal node and records the
/// hanging axis/child-id in its face codes.
#[test]
fn two_ranks_nonconforming_face_owner_is_the_lower_rank() {
    let fabric = LocalFabric::new(2);

    let forest0 = ManualForest {
        rank: 0,
        elements: vec![leaf_element(1, 1, 0, 0)],
        ghosts: vec![leaf_element(1, 1, 1, 0), leaf_element(1, 2, 1, 1)],
    };
    let corners0 = vec![
        CornerEvent { sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 1 }] },
        CornerEvent { sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 2 }] },
        CornerEvent { sides: vec![CornerSide { element: ElementRef::Local(0), corner_id: 3 }] },
    ];
    let faces0 = vec![FaceEvent::Nonconforming {
        large: FaceSide { element: ElementRef::Local(0), face_id: 0 },
        small: [
            HangingSide { element: ElementRef::Ghost(0), face_id: 1, corner_id: 0 },
            HangingSide { element: ElementRef::Ghost(1), face_id: 1, corner_id: 0 },
        ],
        small_child_ids: [1, 2],
        axis: HangingAxis::Vertical,
    }];
    let dispatch0 = ManualDispatch { num_volumes: 1, corners: corners0, faces: faces0 };

    let forest1 = ManualForest {
        rank: 1,
        elements: vec![leaf_element(1, 1, 1, 0), leaf_element(1, 2, 1, 1)],
        ghosts: vec![leaf_element(1, 1, 0, 0)],
    };
    let mut corners1 = Vec::new();
    for le in [0u32, 1] {
        for corner_id in 1..4 {
            corners1.push(CornerEvent {
                sides: vec![CornerSide { element: ElementRef::Local(le), corner_id }],
            });
        }
    }
    let faces1 = vec![FaceEvent::Nonconforming {
        large: FaceSide { element: ElementRef::Ghost(0), face_id: 0 },
        small: [
            HangingSide { element: ElementRef::Local(0), face_id: 1, corner_id: 0 },
            HangingSide { element: ElementRef::Local(1), face_id: 1, corner_id: 0 },
        ],
        small_child_ids: [1, 2],
        axis: HangingAxis::Vertical,
    }];
    let dispatch1 = ManualDispatch { num_volumes: 2, corners: corners1, faces: faces1 };

    let t0 = fabric.transport_for(0);
    let t1 = fabric.transport_for(1);

    let h0 = thread::spawn(move || build_node_numbering(&forest0, &dispatch0, &t0, false, false));
    let h1 = thread::spawn(move || build_node_numbering(&forest1, &dispatch1, &t1, false, false));

    let out0 = h0.join().unwrap().unwrap();
    let out1 = h1.join().unwrap().unwrap();

    // Rank 0's large element is promoted: one face-bit set, center is a node.
    assert_eq!(out0.configuration[0].split_mask().count_ones(), 1);
    assert_ne!(out0.element_nodes[0][4], UNASSIGNED);
    // Rank 0 owns every node it sees, including the shared hanging midpoint.
    assert_eq!(out0.owned_count, out0.num_local_nodes);
    assert!(out0.nonlocal_nodes.is_empty());

    // Rank 1's two small elements each record the hanging axis and their own child-id.
    assert_eq!(out1.face_code[0].axis(), HangingAxis::Vertical);
    assert_eq!(out1.face_code[0].child_id(), 1);
    assert_eq!(out1.face_code[1].axis(), HangingAxis::Vertical);
    assert_eq!(out1.face_code[1].child_id(), 2);

    // Rank 1 sees the shared hanging-midpoint corner as a nonlocal node owned by rank 0.
    assert_eq!(out1.nonlocal_nodes.len(), 1);
    assert!(out1.nonlocal_nodes[0] < out0.global_owned_count);

    // Both of rank 1's small elements resolve their own corner-0 to that
    // same shared, nonlocal node.
    assert_ne!(out1.element_nodes[0][0], UNASSIGNED);
    assert_eq!(out1.element_nodes[0][0], out1.element_nodes[1][0]);
}
