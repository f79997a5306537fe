use tracing::debug;

use crate::engine::messages::MessageChannel;
use crate::engine::vertex_subset::VertexSubset;
use crate::fragment::Fragment;
use crate::types::vertex_array::VertexValues;

/// Lifecycle of one worker's computation:
/// `Init -> PEval -> IncEval* -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Init,
    PEval,
    IncEval,
    Done,
}

/// An algorithm expressed against the superstep engine.
///
/// `p_eval` performs the first-round local work and returns the active
/// subset; each `inc_eval` receives the previous round's output subset
/// together with the inbound messages (boundary updates from peers, to be
/// applied as local vertex updates) and advances one vertex/edge map
/// round. The worker owns scheduling and termination; a program only
/// reports which vertices remain active.
pub trait SuperstepProgram<V, E> {
    /// Per-vertex algorithm value.
    type Value: Clone + Default + Send + Sync;
    /// Payload of boundary-crossing updates.
    type Message: Send;

    fn p_eval(
        &mut self,
        frag: &Fragment<V, E>,
        values: &mut VertexValues<Self::Value>,
        channel: &dyn MessageChannel<Self::Message>,
    ) -> VertexSubset;

    fn inc_eval(
        &mut self,
        frag: &Fragment<V, E>,
        values: &mut VertexValues<Self::Value>,
        channel: &dyn MessageChannel<Self::Message>,
        frontier: VertexSubset,
        messages: Vec<(u64, Self::Message)>,
    ) -> VertexSubset;
}

/// One partition's computation driver: the fragment, the per-vertex value
/// array, and the channel to the rest of the deployment.
///
/// A round suspends at the `any_active` barrier and at message receive;
/// mutation of the fragment happens strictly between `run` calls through
/// [`Worker::fragment_mut`], never inside a round.
pub struct Worker<V, E, T, C> {
    frag: Fragment<V, E>,
    values: VertexValues<T>,
    channel: C,
    state: WorkerState,
}

impl<V, E, T, C> Worker<V, E, T, C>
where
    V: Clone + Default,
    E: Clone + Default,
    T: Clone + Default,
{
    /// Wraps a fragment and its channel, sizing the value array to the
    /// fragment's current slot counts.
    pub fn new(frag: Fragment<V, E>, channel: C, init: T) -> Self {
        let values = VertexValues::new(
            frag.inner_vertices_num() as usize,
            frag.outer_vertices_num() as usize,
            frag.max_local_id(),
            init,
        );
        Self {
            frag,
            values,
            channel,
            state: WorkerState::Init,
        }
    }

    pub fn fragment(&self) -> &Fragment<V, E> {
        &self.frag
    }

    /// Mutable fragment access for between-rounds mutation. After a
    /// mutation grew the fragment, call [`Worker::refresh_values`] so the
    /// value array covers the new slots.
    pub fn fragment_mut(&mut self) -> &mut Fragment<V, E> {
        &mut self.frag
    }

    pub fn values(&self) -> &VertexValues<T> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut VertexValues<T> {
        &mut self.values
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Grows the value array to the fragment's current slot counts,
    /// filling new slots with `init`.
    pub fn refresh_values(&mut self, init: T) {
        self.values.resize(
            self.frag.inner_vertices_num() as usize,
            self.frag.outer_vertices_num() as usize,
            init,
        );
    }

    /// Runs the program to global quiescence.
    ///
    /// # Returns
    /// The number of rounds executed (the first being `p_eval`). The
    /// terminal round is the one on which every worker reported an empty
    /// subset and no outbound messages.
    pub fn run<P>(&mut self, program: &mut P) -> usize
    where
        P: SuperstepProgram<V, E, Value = T>,
        C: MessageChannel<P::Message>,
    {
        self.run_capped(program, usize::MAX).0
    }

    /// Runs the program for at most `max_rounds` rounds. The cap belongs
    /// to the algorithm layer (non-terminating programs); the engine's own
    /// exit is natural convergence.
    ///
    /// Every worker of the deployment must use the same cap, since rounds
    /// advance in lockstep across the vote barrier.
    ///
    /// # Returns
    /// `(rounds, capped)` where `capped` reports whether the cap fired
    /// before global quiescence.
    pub fn run_capped<P>(&mut self, program: &mut P, max_rounds: usize) -> (usize, bool)
    where
        P: SuperstepProgram<V, E, Value = T>,
        C: MessageChannel<P::Message>,
    {
        self.state = WorkerState::PEval;
        let mut subset = program.p_eval(&self.frag, &mut self.values, &self.channel);
        let mut rounds = 1;
        loop {
            let sent = self.channel.take_sent();
            let local_active = !subset.is_empty() || sent > 0;
            debug!(
                fid = self.frag.fid(),
                round = rounds,
                active = subset.len(),
                sent,
                "round finished"
            );
            if !self.channel.any_active(local_active) {
                self.state = WorkerState::Done;
                return (rounds, false);
            }
            if rounds >= max_rounds {
                self.state = WorkerState::Done;
                return (rounds, true);
            }
            self.state = WorkerState::IncEval;
            let inbox = self.channel.receive_all();
            subset = program.inc_eval(&self.frag, &mut self.values, &self.channel, subset, inbox);
            rounds += 1;
        }
    }
}

#[cfg(test)]
mod test_superstep {
    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::map_ops::{edge_map, vertex_map, EdgeProgram, VertexProgram};
    use crate::engine::messages::{LocalMessageHub, NullChannel};
    use crate::partition::VertexIdMap;
    use crate::types::{Edge, EdgeDirection, LoadStrategy};
    use std::sync::Arc;
    use std::thread;

    /// Minimum-label propagation: every vertex adopts the smallest object
    /// id reachable from it. Labels converge component-wise.
    struct MinLabel;

    impl MinLabel {
        fn program<'a>() -> EdgeProgram<'a, u64, i32> {
            EdgeProgram::new(
                |s, _e, d| s < d,
                |s, _e, _d| *s,
                |_lid, _v| true,
                |a: u64, b: u64| a.min(b),
            )
        }
    }

    impl SuperstepProgram<(), i32> for MinLabel {
        type Value = u64;
        type Message = u64;

        fn p_eval(
            &mut self,
            frag: &Fragment<(), i32>,
            values: &mut VertexValues<u64>,
            channel: &dyn MessageChannel<u64>,
        ) -> VertexSubset {
            // Seed every slot (ghosts included) with its own object id.
            for lid in frag.inner_vertices().chain(frag.outer_vertices()) {
                let oid = frag
                    .vertex_map()
                    .get_oid(frag.lid_to_gid(lid))
                    .expect("registered vertex");
                values.set(lid, oid);
            }
            let all = VertexSubset::all(frag);
            edge_map(
                frag,
                values,
                &all,
                EdgeDirection::Out,
                &Self::program(),
                channel,
            )
        }

        fn inc_eval(
            &mut self,
            frag: &Fragment<(), i32>,
            values: &mut VertexValues<u64>,
            channel: &dyn MessageChannel<u64>,
            frontier: VertexSubset,
            messages: Vec<(u64, u64)>,
        ) -> VertexSubset {
            // Inbound boundary updates are local vertex updates; receiving
            // vertices join the frontier.
            let mut lids = frontier.to_lids();
            for (gid, label) in messages {
                if let Some(lid) = frag.gid_to_lid(gid) {
                    if frag.is_inner_lid(lid) && label < *values.get(lid) {
                        values.set(lid, label);
                        lids.push(lid);
                    }
                }
            }
            let frontier = VertexSubset::from_lids(lids, frag.inner_vertices_num());
            if frontier.is_empty() {
                return frontier;
            }
            edge_map(
                frag,
                values,
                &frontier,
                EdgeDirection::Out,
                &Self::program(),
                channel,
            )
        }
    }

    #[test]
    fn test_single_fragment_min_label_converges() {
        // Path 0 - 1 - 2 - 3: every label collapses to 0, and the engine
        // quiesces the round after convergence.
        let map = Arc::new(VertexIdMap::new(1));
        for oid in 0..4 {
            map.add_vertex(oid);
        }
        let edges = (0..3).map(|i| Edge::new(i, i + 1, 1)).collect();
        let frag: Fragment<(), i32> = Fragment::init(
            0,
            false,
            Arc::clone(&map),
            vec![],
            edges,
            LoadStrategy::OnlyOut,
            EngineConfig::default(),
        );

        let mut worker = Worker::new(frag, NullChannel::<u64>::new(), 0u64);
        let rounds = worker.run(&mut MinLabel);

        assert!(rounds <= 4, "expected convergence within 4 rounds");
        assert_eq!(worker.state(), WorkerState::Done);
        for lid in 0..4u64 {
            assert_eq!(*worker.values().get(lid), 0, "vertex {} not labeled 0", lid);
        }
    }

    #[test]
    fn test_two_workers_converge_over_message_channel() {
        // End-to-end: path 0 - 1 - 2 - 3 - 4 split across two fragments.
        // Minimum-label propagation must drive every label to 0 within
        // four working rounds plus the terminal round, with boundary
        // updates flowing through the hub.
        let map = Arc::new(VertexIdMap::new(2));
        for oid in 0..5 {
            map.add_vertex(oid);
        }
        let path: Vec<(u64, u64)> = (0..4).map(|i| (i, i + 1)).collect();

        let mut hubs: Vec<LocalMessageHub<u64>> = LocalMessageHub::create(2);
        let hub1 = hubs.pop().unwrap();
        let hub0 = hubs.pop().unwrap();

        let spawn_worker = |fid: u32, hub: LocalMessageHub<u64>| {
            let map = Arc::clone(&map);
            let path = path.clone();
            thread::spawn(move || {
                // The caller contract: an edge is issued on every fragment
                // owning one of its endpoints.
                let partitioner = *map.partitioner();
                let edges: Vec<Edge<i32>> = path
                    .iter()
                    .filter(|(a, b)| {
                        partitioner.partition(*a) == fid || partitioner.partition(*b) == fid
                    })
                    .map(|(a, b)| {
                        Edge::new(map.get_gid(*a).unwrap(), map.get_gid(*b).unwrap(), 1)
                    })
                    .collect();
                let frag: Fragment<(), i32> = Fragment::init(
                    fid,
                    false,
                    Arc::clone(&map),
                    vec![],
                    edges,
                    LoadStrategy::OnlyOut,
                    EngineConfig::default(),
                );
                let mut worker = Worker::new(frag, hub, 0u64);
                let rounds = worker.run(&mut MinLabel);

                let labels: Vec<(u64, u64)> = worker
                    .fragment()
                    .inner_vertices()
                    .map(|lid| {
                        let oid = map
                            .get_oid(worker.fragment().lid_to_gid(lid))
                            .unwrap();
                        (oid, *worker.values().get(lid))
                    })
                    .collect();
                (rounds, labels)
            })
        };

        let h0 = spawn_worker(0, hub0);
        let h1 = spawn_worker(1, hub1);
        let (rounds0, labels0) = h0.join().unwrap();
        let (rounds1, labels1) = h1.join().unwrap();

        // Lockstep rounds, bounded by path length + terminal round.
        assert_eq!(rounds0, rounds1);
        assert!(rounds0 <= 5, "took {} rounds", rounds0);
        let mut all_labels: Vec<(u64, u64)> = labels0.into_iter().chain(labels1).collect();
        all_labels.sort_unstable();
        assert_eq!(all_labels.len(), 5);
        for (oid, label) in all_labels {
            assert_eq!(label, 0, "vertex {} converged to {}", oid, label);
        }
    }

    #[test]
    fn test_mutation_between_runs_extends_computation() {
        // Quiesce, mutate (attach vertex 4 to the path), rerun: the new
        // vertex joins the component and adopts its label.
        let map = Arc::new(VertexIdMap::new(1));
        for oid in 0..4 {
            map.add_vertex(oid);
        }
        let edges = (0..3).map(|i| Edge::new(i, i + 1, 1)).collect();
        let frag: Fragment<(), i32> = Fragment::init(
            0,
            false,
            Arc::clone(&map),
            vec![],
            edges,
            LoadStrategy::OnlyOut,
            EngineConfig::default(),
        );
        let mut worker = Worker::new(frag, NullChannel::<u64>::new(), 0u64);
        worker.run(&mut MinLabel);

        let (g4, _) = map.add_vertex(4);
        let mut batch = crate::fragment::mutation::Mutation::new();
        batch.add_vertex(g4, ()).add_edge(map.get_gid(3).unwrap(), g4, 1);
        worker.fragment_mut().mutate(batch);
        worker.refresh_values(0);

        worker.run(&mut MinLabel);
        let l4 = worker.fragment().gid_to_lid(g4).unwrap();
        assert_eq!(*worker.values().get(l4), 0);
    }

    /// A program that never quiesces on its own: every round touches every
    /// vertex.
    struct Restless;

    impl SuperstepProgram<(), i32> for Restless {
        type Value = u64;
        type Message = u64;

        fn p_eval(
            &mut self,
            frag: &Fragment<(), i32>,
            values: &mut VertexValues<u64>,
            _channel: &dyn MessageChannel<u64>,
        ) -> VertexSubset {
            let all = VertexSubset::all(frag);
            let bump = VertexProgram::update_only(|_lid, v: &mut u64| *v += 1);
            vertex_map(frag, values, &all, &bump, true)
        }

        fn inc_eval(
            &mut self,
            frag: &Fragment<(), i32>,
            values: &mut VertexValues<u64>,
            channel: &dyn MessageChannel<u64>,
            _frontier: VertexSubset,
            _messages: Vec<(u64, u64)>,
        ) -> VertexSubset {
            self.p_eval(frag, values, channel)
        }
    }

    #[test]
    fn test_round_cap_stops_restless_program() {
        let map = Arc::new(VertexIdMap::new(1));
        for oid in 0..3 {
            map.add_vertex(oid);
        }
        let frag: Fragment<(), i32> = Fragment::init(
            0,
            true,
            Arc::clone(&map),
            vec![],
            vec![Edge::new(0, 1, 1)],
            LoadStrategy::BothOutIn,
            EngineConfig::default(),
        );
        let mut worker = Worker::new(frag, NullChannel::<u64>::new(), 0u64);
        let (rounds, capped) = worker.run_capped(&mut Restless, 3);
        assert_eq!(rounds, 3);
        assert!(capped);
        // Three rounds bumped every value three times.
        assert_eq!(*worker.values().get(0), 3);
    }
}
