//! Peer query/reply exchange: resolves the runid of every
//! shared candidate this rank does not own, and tells the candidates it does
//! own which remote ranks need their runid. Ownership's minimum-rank rule
//! makes the direction of each pair's exchange fall out for free: the owner
//! of any shared candidate necessarily has the smallest rank among its
//! contributors, so a peer appearing in `shared_in_by_peer` always has a
//! smaller rank than `me`, and a peer that needs one of *our* owned
//! candidates always has a larger one. Low rank is always the responder,
//! high rank always the initiator — no deadlock-avoidance bookkeeping beyond
//! that comparison is needed.

use std::collections::{BTreeMap, HashMap};

use tracing::instrument;

use crate::candidate::{CandidateId, CandidateTable, Codim};
use crate::errors::{CoreError, CoreResult};
use crate::ownership::OwnershipResult;
use crate::types::{ElementIndex, Rank};
use crate::transport::{Request, Transport, TAG_QUERY, TAG_REPLY};

/// The six states a single peer relationship can be in. `Idle` is only ever
/// observed between construction and the first call to [`exchange_all`];
/// every peer reaches `Done` before that function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeerState {
    Idle,
    WaitingRecvQuery,
    QuerySent,
    SendingReply,
    WaitingRecvReply,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PeerRole {
    Initiator,
    Responder,
}

struct InitiatorPeer {
    rank: Rank,
    state: PeerState,
    /// Candidates owned by `rank` that this rank shares in, in the order the
    /// query buffer encodes them.
    candidates: Vec<CandidateId>,
    resolved_runids: Vec<u32>,
}

struct ResponderPeer {
    rank: Rank,
    state: PeerState,
    expected_len: usize,
}

fn encode_position(local_element: ElementIndex, position: u8, vnodes: usize) -> u32 {
    local_element * vnodes as u32 + position as u32
}

/// Runids resolved for every candidate this rank shares in but does not own,
/// keyed by candidate id.
pub struct ResolvedRunids {
    pub by_candidate: HashMap<CandidateId, u32>,
    /// Owning ranks in ascending order, each paired with how many candidates
    /// of theirs this rank shares in — the block layout §4.6 assigns local
    /// indices with.
    pub peer_order: Vec<(Rank, usize)>,
}

/// Runs the full two-phase query/reply exchange for every peer this rank has
/// a shared candidate with, driven by a single wait-any loop over whichever
/// receives are still outstanding. Sends complete synchronously on both
/// transports this crate ships, so only receives ever need polling.
#[instrument(skip(transport, table, ownership))]
pub fn exchange_all(
    transport: &dyn Transport,
    table: &CandidateTable,
    ownership: &OwnershipResult,
    me: Rank,
    with_faces: bool,
) -> CoreResult<ResolvedRunids> {
    let vnodes = crate::types::vnodes(with_faces);

    let mut initiators: Vec<InitiatorPeer> = ownership
        .shared_in_by_peer
        .iter()
        .map(|(&rank, candidates)| {
            debug_assert!(rank < me, "owner rank must be smaller than a sharer's");
            InitiatorPeer {
                rank,
                state: PeerState::Idle,
                candidates: candidates.clone(),
                resolved_runids: Vec::new(),
            }
        })
        .collect();

    let mut responder_groups: BTreeMap<Rank, usize> = BTreeMap::new();
    for &id in &ownership.owned {
        for contributor in table.get(id).contributors() {
            if contributor.rank != me {
                debug_assert!(
                    contributor.rank > me,
                    "a sharer of an owned candidate must have a larger rank"
                );
                *responder_groups.entry(contributor.rank).or_insert(0) += 1;
            }
        }
    }
    let mut responders: Vec<ResponderPeer> = responder_groups
        .into_iter()
        .map(|(rank, count)| ResponderPeer {
            rank,
            state: PeerState::Idle,
            expected_len: count,
        })
        .collect();

    // (local_element, position) -> runid, for answering queries.
    let mut owned_lookup: HashMap<(ElementIndex, u8), u32> = HashMap::new();
    for (runid, &id) in ownership.owned.iter().enumerate() {
        let owner = table.get(id).owner();
        owned_lookup.insert((owner.local_element, owner.position), runid as u32);
    }

    // Pending receives, tagged by an index into `initiators` or `responders`.
    enum Pending {
        Reply(usize),
        Query(usize),
    }
    let mut remaining: Vec<(usize, Request)> = Vec::new();
    let mut kinds: HashMap<usize, Pending> = HashMap::new();
    let mut next_key = 0usize;

    for (i, peer) in initiators.iter_mut().enumerate() {
        let buf: Vec<u32> = peer
            .candidates
            .iter()
            .map(|&id| {
                let owner = table.get(id).owner();
                encode_position(owner.local_element, owner.position, vnodes)
            })
            .collect();
        let len = buf.len();
        transport.post_send(peer.rank, TAG_QUERY, buf).complete()?;
        peer.state = PeerState::QuerySent;
        let recv = transport.post_recv(peer.rank, TAG_REPLY, len);
        peer.state = PeerState::WaitingRecvReply;
        kinds.insert(next_key, Pending::Reply(i));
        remaining.push((next_key, recv));
        next_key += 1;
    }

    for (i, peer) in responders.iter_mut().enumerate() {
        let recv = transport.post_recv(peer.rank, TAG_QUERY, peer.expected_len);
        peer.state = PeerState::WaitingRecvQuery;
        kinds.insert(next_key, Pending::Query(i));
        remaining.push((next_key, recv));
        next_key += 1;
    }

    while !remaining.is_empty() {
        let (key, req) = transport.wait_any(&mut remaining)?;
        let buf = req.complete()?;
        match kinds.remove(&key).expect("tracked request") {
            Pending::Reply(i) => {
                let peer = &mut initiators[i];
                peer.resolved_runids = buf;
                peer.state = PeerState::Done;
            }
            Pending::Query(i) => {
                let peer = &mut responders[i];
                peer.state = PeerState::SendingReply;
                let reply: Vec<u32> = buf
                    .iter()
                    .map(|&code| {
                        let position = (code % vnodes as u32) as u8;
                        let local_element = code / vnodes as u32;
                        *owned_lookup
                            .get(&(local_element, position))
                            .expect("query referenced a candidate we actually own")
                    })
                    .collect();
                transport
                    .post_send(peer.rank, TAG_REPLY, reply)
                    .complete()?;
                peer.state = PeerState::Done;
            }
        }
    }

    debug_assert!(initiators.iter().all(|p| p.state == PeerState::Done));
    debug_assert!(responders.iter().all(|p| p.state == PeerState::Done));

    let mut by_candidate = HashMap::new();
    let mut peer_order = Vec::with_capacity(initiators.len());
    initiators.sort_by_key(|p| p.rank);
    for peer in &initiators {
        if peer.resolved_runids.len() != peer.candidates.len() {
            return Err(CoreError::Transport(format!(
                "peer {} replied with {} runids for {} queried candidates",
                peer.rank,
                peer.resolved_runids.len(),
                peer.candidates.len()
            )));
        }
        for (&id, &runid) in peer.candidates.iter().zip(peer.resolved_runids.iter()) {
            by_candidate.insert(id, runid);
        }
        peer_order.push((peer.rank, peer.candidates.len()));
    }

    Ok(ResolvedRunids {
        by_candidate,
        peer_order,
    })
}
