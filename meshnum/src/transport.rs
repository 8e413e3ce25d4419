//! The message-passing substrate, abstracted behind a [`Transport`] trait so
//! the numbering core never talks to a concrete messaging library directly:
//! one concrete backend talks to a real cluster ([`MpiTransport`], feature
//! `mpi-transport`), the other ([`LocalTransport`]) simulates ranks
//! in-process so `cargo test` never needs an MPI launcher.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use crate::errors::{CoreError, CoreResult};
use crate::types::Rank;

pub const TAG_QUERY: i32 = 0;
pub const TAG_REPLY: i32 = 1;

/// A single outstanding nonblocking send or receive.
pub enum Request {
    /// Sends complete synchronously in every backend this crate ships, since
    /// posting one never blocks on the peer draining it.
    Done(CoreResult<Vec<u32>>),
    /// A receive still being filled in by a background thread.
    Pending(thread::JoinHandle<CoreResult<Vec<u32>>>),
}

impl Request {
    pub fn is_ready(&self) -> bool {
        match self {
            Request::Done(_) => true,
            Request::Pending(h) => h.is_finished(),
        }
    }

    pub fn complete(self) -> CoreResult<Vec<u32>> {
        match self {
            Request::Done(r) => r,
            Request::Pending(h) => h
                .join()
                .map_err(|_| CoreError::Transport("receive thread panicked".into()))?,
        }
    }
}

/// Message-passing primitives the peer-exchange state machine and the global
/// offset exchange need. One all-gather, and per-peer point-to-point
/// send/receive pairs tagged `TAG_QUERY`/`TAG_REPLY` — peer exchange only
/// ever talks to ranks it shares a candidate with, so this must stay a
/// sparse per-peer pattern rather than a single all-to-all.
pub trait Transport {
    fn rank(&self) -> Rank;
    fn size(&self) -> i32;

    fn all_gather_u32(&self, value: u32) -> CoreResult<Vec<u32>>;

    fn post_send(&self, dest: Rank, tag: i32, buf: Vec<u32>) -> Request;
    fn post_recv(&self, source: Rank, tag: i32, len: usize) -> Request;

    /// Blocks until at least one of `requests` is ready, then returns its
    /// index with the request removed. A wait-any primitive so the peer
    /// state machine can drain whichever reply lands first instead of
    /// serializing on send order.
    fn wait_any(&self, requests: &mut Vec<(usize, Request)>) -> CoreResult<(usize, Request)> {
        loop {
            if let Some(pos) = requests.iter().position(|(_, r)| r.is_ready()) {
                return Ok(requests.remove(pos));
            }
            thread::sleep(Duration::from_micros(200));
        }
    }
}

/// An in-process simulation of `size` ranks, used by tests and single-process
/// demo runs. Sends deposit into a channel immediately; receives spawn a
/// short-lived thread that blocks on that channel so `wait_any` can poll
/// multiple pending receives without a real async runtime.
pub struct LocalFabric {
    size: i32,
    senders: Mutex<HashMap<(Rank, Rank, i32), mpsc::Sender<Vec<u32>>>>,
    receivers: Mutex<HashMap<(Rank, Rank, i32), mpsc::Receiver<Vec<u32>>>>,
    gather: Arc<(Mutex<GatherState>, Condvar)>,
}

struct GatherState {
    round: u64,
    slots: Vec<Option<u32>>,
    result: Option<Vec<u32>>,
    readers_done: usize,
}

impl LocalFabric {
    pub fn new(size: i32) -> Arc<Self> {
        Arc::new(LocalFabric {
            size,
            senders: Mutex::new(HashMap::new()),
            receivers: Mutex::new(HashMap::new()),
            gather: Arc::new((
                Mutex::new(GatherState {
                    round: 0,
                    slots: vec![None; size as usize],
                    result: None,
                    readers_done: 0,
                }),
                Condvar::new(),
            )),
        })
    }

    fn channel(&self, src: Rank, dest: Rank, tag: i32) -> mpsc::Sender<Vec<u32>> {
        let mut senders = self.senders.lock().unwrap();
        senders
            .entry((src, dest, tag))
            .or_insert_with(|| {
                let (tx, rx) = mpsc::channel();
                self.receivers.lock().unwrap().insert((src, dest, tag), rx);
                tx
            })
            .clone()
    }

    pub fn transport_for(self: &Arc<Self>, rank: Rank) -> LocalTransport {
        LocalTransport {
            fabric: self.clone(),
            rank,
        }
    }

    pub fn ranks(self: &Arc<Self>) -> impl Iterator<Item = LocalTransport> + '_ {
        (0..self.size).map(move |r| self.transport_for(r))
    }
}

pub struct LocalTransport {
    fabric: Arc<LocalFabric>,
    rank: Rank,
}

impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> i32 {
        self.fabric.size
    }

    fn all_gather_u32(&self, value: u32) -> CoreResult<Vec<u32>> {
        let size = self.fabric.size as usize;
        let (lock, cvar) = &*self.fabric.gather;
        let mut state = lock.lock().unwrap();
        let my_round = state.round;
        state.slots[self.rank as usize] = Some(value);

        if state.slots.iter().all(Option::is_some) {
            let result: Vec<u32> = state.slots.iter().map(|v| v.unwrap()).collect();
            state.result = Some(result.clone());
            state.round += 1;
            state.readers_done = 1;
            if state.readers_done == size {
                state.slots = vec![None; size];
                state.result = None;
                state.readers_done = 0;
            }
            cvar.notify_all();
            Ok(result)
        } else {
            while state.round == my_round {
                state = cvar.wait(state).unwrap();
            }
            let result = state.result.clone().unwrap();
            state.readers_done += 1;
            if state.readers_done == size {
                state.slots = vec![None; size];
                state.result = None;
                state.readers_done = 0;
            }
            Ok(result)
        }
    }

    fn post_send(&self, dest: Rank, tag: i32, buf: Vec<u32>) -> Request {
        let tx = self.fabric.channel(self.rank, dest, tag);
        let result = tx
            .send(buf)
            .map(|_| Vec::new())
            .map_err(|e| CoreError::Transport(format!("send to rank {dest} failed: {e}")));
        Request::Done(result)
    }

    fn post_recv(&self, source: Rank, tag: i32, len: usize) -> Request {
        let _ = self.fabric.channel(source, self.rank, tag);
        let rx = self
            .fabric
            .receivers
            .lock()
            .unwrap()
            .remove(&(source, self.rank, tag));
        let handle = thread::spawn(move || -> CoreResult<Vec<u32>> {
            let rx = rx.ok_or_else(|| {
                CoreError::Transport("receive posted twice for the same (source, tag)".into())
            })?;
            let buf = rx
                .recv()
                .map_err(|e| CoreError::Transport(format!("receive failed: {e}")))?;
            if buf.len() != len {
                return Err(CoreError::Transport(format!(
                    "expected {len} u32s, received {}",
                    buf.len()
                )));
            }
            Ok(buf)
        });
        Request::Pending(handle)
    }
}

#[cfg(feature = "mpi-transport")]
pub mod mpi_backend {
    //! Real distributed runs over `mpi::topology::UserCommunicator`: plain
    //! `world.rank()`, `world.process_at_rank(..)`, `world.all_gather_into`.
    //! `UserCommunicator` is not `Copy`, so any owned copy that must outlive
    //! the borrow of `&self` (e.g. to move into a spawned thread) goes
    //! through `duplicate()` rather than a move.
    use super::*;
    use mpi::point_to_point as p2p;
    use mpi::topology::{Communicator, Rank as MpiRank, UserCommunicator};
    use mpi::request::{scope, WaitGuard};
    use mpi::traits::*;

    pub struct MpiTransport {
        world: UserCommunicator,
    }

    impl MpiTransport {
        pub fn new(world: UserCommunicator) -> Self {
            MpiTransport { world }
        }
    }

    impl Transport for MpiTransport {
        fn rank(&self) -> Rank {
            self.world.rank() as Rank
        }

        fn size(&self) -> i32 {
            self.world.size()
        }

        fn all_gather_u32(&self, value: u32) -> CoreResult<Vec<u32>> {
            let mut out = vec![0u32; self.world.size() as usize];
            self.world.all_gather_into(&value, &mut out[..]);
            Ok(out)
        }

        fn post_send(&self, dest: Rank, _tag: i32, buf: Vec<u32>) -> Request {
            let result: CoreResult<Vec<u32>> = scope(|scope| {
                let process = self.world.process_at_rank(dest as MpiRank);
                let req = process.immediate_send(scope, &buf[..]);
                let _ = WaitGuard::from(req);
                Ok(Vec::new())
            });
            Request::Done(result)
        }

        fn post_recv(&self, source: Rank, _tag: i32, len: usize) -> Request {
            let world = self.world.duplicate();
            let handle = thread::spawn(move || -> CoreResult<Vec<u32>> {
                let mut buf = vec![0u32; len];
                let process = world.process_at_rank(source as MpiRank);
                let status = p2p::ReceiveInto::receive_into(&process, &mut buf[..]);
                let _ = status;
                Ok(buf)
            });
            Request::Pending(handle)
        }
    }
}
#[cfg(feature = "mpi-transport")]
pub use mpi_backend::MpiTransport;
