use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Per-round message exchange and termination detection between the
/// workers of one deployment.
///
/// The engine sends an update for every processed edge whose destination
/// is an outer vertex; the owning worker receives it before its next round
/// begins (all sends of round `k` happen before the `any_active` barrier,
/// so a `receive_all` after the barrier drains everything from round `k`).
/// `any_active` is the collective OR deciding whether another round runs.
pub trait MessageChannel<M> {
    /// This worker's fragment id.
    fn fid(&self) -> u32;

    /// Number of workers in the deployment.
    fn fnum(&self) -> u32;

    /// Queues a payload for the vertex `target_gid` on worker `dst_fid`.
    fn send(&self, dst_fid: u32, target_gid: u64, msg: M);

    /// Drains every payload delivered to this worker.
    fn receive_all(&self) -> Vec<(u64, M)>;

    /// Collective OR over every worker's `local_active` vote. Blocks until
    /// all workers have voted this round.
    fn any_active(&self, local_active: bool) -> bool;

    /// Number of messages sent since the last call; resets the counter.
    fn take_sent(&self) -> usize;
}

/// Shared state of the vote barrier.
///
/// Protocol per round: every worker ORs its vote into `vote` and hits the
/// first barrier; the leader snapshots the accumulated vote into `verdict`
/// and clears `vote` for the next round; the second barrier publishes the
/// snapshot before anyone reads it or votes again, so no vote can leak
/// between rounds.
struct RoundSync {
    barrier: Barrier,
    vote: AtomicBool,
    verdict: AtomicBool,
}

impl RoundSync {
    fn new(parties: usize) -> Self {
        Self {
            barrier: Barrier::new(parties),
            vote: AtomicBool::new(false),
            verdict: AtomicBool::new(false),
        }
    }

    fn any_active(&self, local: bool) -> bool {
        self.vote.fetch_or(local, Ordering::SeqCst);
        if self.barrier.wait().is_leader() {
            let round_vote = self.vote.swap(false, Ordering::SeqCst);
            self.verdict.store(round_vote, Ordering::SeqCst);
        }
        self.barrier.wait();
        self.verdict.load(Ordering::SeqCst)
    }
}

/// In-process [`MessageChannel`] for a deployment whose workers are
/// threads of one process: one unbounded channel per worker plus the
/// shared vote barrier.
pub struct LocalMessageHub<M> {
    fid: u32,
    senders: Vec<Sender<(u64, M)>>,
    receiver: Receiver<(u64, M)>,
    sync: Arc<RoundSync>,
    sent: AtomicUsize,
}

impl<M: Send> LocalMessageHub<M> {
    /// Creates one connected hub per worker. Element `i` of the returned
    /// vector belongs to the worker of fragment `i`.
    pub fn create(fnum: u32) -> Vec<Self> {
        let mut senders = Vec::with_capacity(fnum as usize);
        let mut receivers = Vec::with_capacity(fnum as usize);
        for _ in 0..fnum {
            let (tx, rx) = unbounded();
            senders.push(tx);
            receivers.push(rx);
        }
        let sync = Arc::new(RoundSync::new(fnum as usize));
        receivers
            .into_iter()
            .enumerate()
            .map(|(fid, receiver)| Self {
                fid: fid as u32,
                senders: senders.clone(),
                receiver,
                sync: Arc::clone(&sync),
                sent: AtomicUsize::new(0),
            })
            .collect()
    }
}

impl<M: Send> MessageChannel<M> for LocalMessageHub<M> {
    fn fid(&self) -> u32 {
        self.fid
    }

    fn fnum(&self) -> u32 {
        self.senders.len() as u32
    }

    fn send(&self, dst_fid: u32, target_gid: u64, msg: M) {
        self.senders[dst_fid as usize]
            .send((target_gid, msg))
            .expect("peer worker hung up");
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    fn receive_all(&self) -> Vec<(u64, M)> {
        self.receiver.try_iter().collect()
    }

    fn any_active(&self, local_active: bool) -> bool {
        self.sync.any_active(local_active)
    }

    fn take_sent(&self) -> usize {
        self.sent.swap(0, Ordering::Relaxed)
    }
}

/// Channel for a single-fragment deployment: no peers, so the collective
/// OR is just the local vote. Sends loop back to the own inbox, which
/// keeps the contract total even though a one-fragment graph never
/// mirrors a vertex.
pub struct NullChannel<M> {
    sender: Sender<(u64, M)>,
    receiver: Receiver<(u64, M)>,
    sent: AtomicUsize,
}

impl<M: Send> NullChannel<M> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            sent: AtomicUsize::new(0),
        }
    }
}

impl<M: Send> Default for NullChannel<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Send> MessageChannel<M> for NullChannel<M> {
    fn fid(&self) -> u32 {
        0
    }

    fn fnum(&self) -> u32 {
        1
    }

    fn send(&self, dst_fid: u32, target_gid: u64, msg: M) {
        debug_assert_eq!(dst_fid, 0);
        self.sender.send((target_gid, msg)).expect("loopback closed");
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    fn receive_all(&self) -> Vec<(u64, M)> {
        self.receiver.try_iter().collect()
    }

    fn any_active(&self, local_active: bool) -> bool {
        local_active
    }

    fn take_sent(&self) -> usize {
        self.sent.swap(0, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test_messages {
    use super::*;
    use std::thread;

    #[test]
    fn test_messages_cross_between_hubs() {
        let mut hubs = LocalMessageHub::<i32>::create(2);
        let hub1 = hubs.pop().unwrap();
        let hub0 = hubs.pop().unwrap();

        hub0.send(1, 42, 7);
        hub0.send(1, 43, 8);
        hub1.send(0, 10, -1);

        assert_eq!(hub0.take_sent(), 2);
        assert_eq!(hub1.take_sent(), 1);
        let mut inbox1 = hub1.receive_all();
        inbox1.sort_unstable();
        assert_eq!(inbox1, vec![(42, 7), (43, 8)]);
        assert_eq!(hub0.receive_all(), vec![(10, -1)]);
        // Drained means drained.
        assert!(hub1.receive_all().is_empty());
    }

    #[test]
    fn test_any_active_is_global_or() {
        let hubs = LocalMessageHub::<()>::create(4);
        // Round 1: exactly one worker active -> everyone sees true.
        // Round 2: nobody active -> everyone sees false (the round-1 vote
        // must not leak).
        let handles: Vec<_> = hubs
            .into_iter()
            .enumerate()
            .map(|(i, hub)| {
                thread::spawn(move || {
                    let first = hub.any_active(i == 2);
                    let second = hub.any_active(false);
                    (first, second)
                })
            })
            .collect();
        for h in handles {
            let (first, second) = h.join().unwrap();
            assert!(first);
            assert!(!second);
        }
    }

    #[test]
    fn test_null_channel_loopback() {
        let chan = NullChannel::<u64>::new();
        assert_eq!(chan.fnum(), 1);
        assert!(chan.any_active(true));
        assert!(!chan.any_active(false));
        chan.send(0, 5, 99);
        assert_eq!(chan.take_sent(), 1);
        assert_eq!(chan.receive_all(), vec![(5, 99)]);
    }
}
