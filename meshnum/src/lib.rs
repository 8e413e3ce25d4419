//! Distributed node numbering for a triangulated sub-mesh of a 2:1-balanced
//! quadtree forest: given a local-element store, a ghost layer, and a
//! topology iterator, assigns every rank a contiguous local numbering of the
//! triangle nodes it touches, split between nodes it owns and nodes owned by
//! a neighboring rank, with global ids strictly partitioned across ranks.

pub mod candidate;
pub mod cli;
pub mod config;
pub mod discover;
pub mod errors;
pub mod finalize;
pub mod offsets;
pub mod ownership;
pub mod peer;
pub mod topology;
pub mod transport;
pub mod types;
pub mod validate;

use serde::Serialize;

use errors::CoreResult;
use topology::{ForestView, TopologyDispatch};
use transport::Transport;
use types::{FaceCode, Rank};

/// Everything this rank knows once construction completes: its own local
/// numbering plus enough of the global partition to translate any other
/// rank's nonlocal references.
#[derive(Serialize)]
pub struct Output {
    pub num_local_elements: usize,
    pub vnodes: usize,
    pub owned_count: usize,
    pub num_local_nodes: usize,
    /// Per local element, per position slot: final local node index.
    pub element_nodes: Vec<Vec<u32>>,
    pub face_code: Vec<FaceCode>,
    pub configuration: Vec<config::Configuration>,
    pub nonlocal_nodes: Vec<u64>,
    /// This rank's owned-node count and the grand total across every rank.
    pub global_owned_count: u64,
    /// This rank's own base offset into the global numbering.
    pub global_offset: u64,
    /// Owned-node count reported by every rank, gather order.
    pub global_owned_counts: Vec<u32>,
    /// Exclusive prefix sum of `global_owned_counts`, one entry longer: rank
    /// `r` owns the global range `global_offsets[r]..global_offsets[r + 1]`.
    pub global_offsets: Vec<u64>,
    pub sharers: Vec<finalize::Sharer>,
}

/// Runs the full construction: incidence discovery, ownership election,
/// global offset exchange, peer query/reply, and finalization.
pub fn build_node_numbering(
    forest: &dyn ForestView,
    dispatch: &dyn TopologyDispatch,
    transport: &dyn Transport,
    full_style: bool,
    with_faces: bool,
) -> CoreResult<Output> {
    let me: Rank = forest.my_rank();

    let discovery = discover::Discovery::new(forest, full_style, with_faces).run(forest, dispatch);
    let ownership = ownership::elect_and_sort(&discovery.table, &discovery.states, me);

    validate::debug_check_ownership(&discovery.table, &ownership, me);

    let offsets = offsets::exchange(transport, ownership.owned.len() as u32)?;
    let resolved = peer::exchange_all(transport, &discovery.table, &ownership, me, with_faces)?;

    let finalized = finalize::finalize(
        &discovery.table,
        &discovery.states,
        &ownership,
        &resolved,
        &offsets,
        me,
    );

    validate::debug_check_nonlocal_nodes(&finalized, &offsets);
    validate::debug_check_element_nodes(&finalized);
    validate::debug_check_sharers(&discovery.table, &discovery.states, &finalized, me);

    let vnodes = types::vnodes(with_faces);
    let face_code = discovery.states.iter().map(|s| s.face_code).collect();
    let configuration = discovery.states.iter().map(|s| s.config).collect();

    Ok(Output {
        num_local_elements: discovery.states.len(),
        vnodes,
        owned_count: finalized.num_owned,
        num_local_nodes: finalized.num_local_nodes,
        element_nodes: finalized.element_nodes,
        face_code,
        configuration,
        nonlocal_nodes: finalized.nonlocal_nodes,
        global_owned_count: offsets.total(),
        global_offset: offsets.range_of(me).start,
        global_owned_counts: offsets.counts.clone(),
        global_offsets: offsets.offsets.clone(),
        sharers: finalized.sharers,
    })
}
