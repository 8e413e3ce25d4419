//! Single-rank demo: numbers one isolated leaf (its four corners, plus a
//! center if full-style) and prints the resulting numbering as JSON.
//! Exercises the CLI, tracing setup, and `LocalTransport` end to end without
//! an MPI launcher.

use clap::Parser;
use tracing::info;

use meshnum::cli::Cli;
use meshnum::topology::{CornerEvent, CornerSide, ElementRef, FaceEvent, ForestView, TopologyDispatch};
use meshnum::transport::LocalFabric;
use meshnum::types::Element;

struct SingleLeafForest;

impl ForestView for SingleLeafForest {
    fn my_rank(&self) -> i32 {
        0
    }

    fn num_local_elements(&self) -> usize {
        1
    }

    fn local_element(&self, index: u32) -> Element {
        debug_assert_eq!(index, 0);
        Element {
            global_index: 0,
            level: 0,
            child_id: 0,
            owner_rank: 0,
            local_index: 0,
        }
    }

    fn ghost_element(&self, _index: u32) -> Element {
        unreachable!("single-leaf demo forest has no ghosts")
    }
}

struct SingleLeafDispatch;

impl TopologyDispatch for SingleLeafDispatch {
    fn for_each_volume(&self, f: &mut dyn FnMut(u32)) {
        f(0);
    }

    fn for_each_face(&self, _f: &mut dyn FnMut(&FaceEvent)) {}

    fn for_each_corner(&self, f: &mut dyn FnMut(&CornerEvent)) {
        for corner_id in 0..4 {
            f(&CornerEvent {
                sides: vec![CornerSide {
                    element: ElementRef::Local(0),
                    corner_id,
                }],
            });
        }
    }
}

fn main() {
    let cli = Cli::parse();
    tracer::init_tracing(&cli.log_level);

    let forest = SingleLeafForest;
    let dispatch = SingleLeafDispatch;
    let fabric = LocalFabric::new(1);
    let transport = fabric.transport_for(0);

    let output = meshnum::build_node_numbering(
        &forest,
        &dispatch,
        &transport,
        cli.full_style,
        cli.with_faces,
    )
    .expect("single-rank construction cannot hit a transport fault");

    info!(
        owned = output.owned_count,
        local = output.num_local_nodes,
        global = output.global_owned_count,
        "node numbering complete"
    );

    let json = serde_json::to_string_pretty(&output).expect("Output always serializes");
    println!("{json}");
}
