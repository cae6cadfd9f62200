use crate::bucket_vec::BucketVec;
use std::collections::VecDeque;
use std::ops::Range;

/// Capacity type shared by every builder and both solvers.
pub type Cap = i64;

/// Capacity of structurally unbounded arcs. Leaves headroom so that residual
/// updates on such arcs can never overflow.
pub const INF_CAP: Cap = i64::MAX / 4;

pub const MAX_RANK: usize = 5;

/// An arc pair as appended by a builder, before the layout exists.
#[derive(Debug, Clone, Copy)]
struct StagedArc {
    tail: usize,
    head: usize,
    cap: Cap,
    rev_cap: Cap,
}

/// Forward-star graph over an integer lattice of rank 1..=5.
///
/// Nodes are lattice points addressed by their row-major linear index (last
/// coordinate fastest). Every appended arc becomes two slots, `tail -> head`
/// carrying `cap` and the paired `head -> tail` carrying `rev_cap`. After
/// `finalize` the slots of a node are contiguous, its forward slots first.
/// Terminal arcs are folded into one signed capacity per node: positive is
/// connected to the source, negative to the sink.
pub struct GridGraph {
    dims: [usize; MAX_RANK],
    strides: [usize; MAX_RANK],
    rank: usize,
    n_nodes: usize,

    tcap: Vec<Cap>,
    flow_offset: Cap,

    staged: BucketVec<StagedArc>,
    finalized: bool,

    // Forward-star layout, valid once finalized.
    pub(crate) first: Vec<usize>,
    pub(crate) heads: Vec<usize>,
    pub(crate) pairs: Vec<usize>,
    pub(crate) caps: Vec<Cap>,
    pub(crate) rcaps: Vec<Cap>,
    fwd: Vec<bool>,

    source_side: Vec<bool>,
}

impl GridGraph {
    pub fn new(dims: &[usize]) -> Self {
        assert!(
            (1..=MAX_RANK).contains(&dims.len()),
            "lattice rank must be 1..={MAX_RANK}, got {}",
            dims.len()
        );
        assert!(dims.iter().all(|&d| d > 0), "lattice dims must be non-zero");

        let rank = dims.len();
        let mut d = [1usize; MAX_RANK];
        d[..rank].copy_from_slice(dims);

        let mut strides = [0usize; MAX_RANK];
        let mut s = 1usize;
        for i in (0..rank).rev() {
            strides[i] = s;
            s *= d[i];
        }
        let n_nodes = s;

        Self {
            dims: d,
            strides,
            rank,
            n_nodes,
            tcap: vec![0; n_nodes],
            flow_offset: 0,
            staged: BucketVec::new(),
            finalized: false,
            first: Vec::new(),
            heads: Vec::new(),
            pairs: Vec::new(),
            caps: Vec::new(),
            rcaps: Vec::new(),
            fwd: Vec::new(),
            source_side: vec![false; n_nodes],
        }
    }

    // Lattice
    // -------------------------------------------------------------------------

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims[..self.rank]
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    #[inline]
    pub fn index(&self, coord: &[usize]) -> usize {
        debug_assert_eq!(coord.len(), self.rank, "coordinate rank mismatch");
        let mut i = 0;
        for (k, &c) in coord.iter().enumerate() {
            debug_assert!(c < self.dims[k], "coordinate {c} out of range on axis {k}");
            i += c * self.strides[k];
        }
        i
    }

    /// Inverse of `index`. Entries past `rank()` are zero.
    pub fn coord(&self, mut i: usize) -> [usize; MAX_RANK] {
        assert!(i < self.n_nodes);
        let mut c = [0usize; MAX_RANK];
        for k in 0..self.rank {
            c[k] = i / self.strides[k];
            i %= self.strides[k];
        }
        c
    }

    // Construction
    // -------------------------------------------------------------------------

    /// Adds terminal capacities to `node`. The part both terminals share is
    /// cut whatever side the node lands on, so it moves into `flow_offset`.
    /// Each terminal saturates at `INF_CAP`.
    pub fn add_tweights(&mut self, node: usize, src: Cap, snk: Cap) {
        assert!(node < self.n_nodes);
        debug_assert!(src >= 0 && snk >= 0);
        let t = self.tcap[node];
        let s = (t.max(0) + src.min(INF_CAP)).min(INF_CAP);
        let k = ((-t).max(0) + snk.min(INF_CAP)).min(INF_CAP);
        self.flow_offset = self.flow_offset.saturating_add(s.min(k));
        self.tcap[node] = s - k;
    }

    /// Stages the arc pair `tail -> head` (`cap`) / `head -> tail` (`rev_cap`).
    pub fn append_arc(&mut self, tail: usize, head: usize, cap: Cap, rev_cap: Cap) {
        assert!(!self.finalized, "append_arc called on a finalized graph");
        assert!(tail < self.n_nodes && head < self.n_nodes, "arc endpoint out of range");
        assert!(cap >= 0 && rev_cap >= 0, "arc capacities must be non-negative");
        if tail == head || (cap == 0 && rev_cap == 0) {
            return;
        }
        self.staged.push(StagedArc {
            tail,
            head,
            cap,
            rev_cap,
        });
    }

    pub fn n_staged(&self) -> usize {
        self.staged.len()
    }

    /// Upper bound on every cut that avoids `INF_CAP` capacities: the offset
    /// plus every finite terminal and staged arc capacity. Saturates at
    /// `INF_CAP`.
    pub fn finite_cut_bound(&self) -> Cap {
        assert!(!self.finalized, "finite_cut_bound reads the staged arcs");
        let finite = |c: Cap| if c < INF_CAP { c } else { 0 };
        let terminals = self
            .tcap
            .iter()
            .fold(0 as Cap, |acc, &t| acc.saturating_add(finite(t.abs())));
        let arcs = self.staged.iter().fold(0 as Cap, |acc, a| {
            acc.saturating_add(finite(a.cap)).saturating_add(finite(a.rev_cap))
        });
        self.flow_offset.saturating_add(terminals).saturating_add(arcs).min(INF_CAP)
    }

    /// Counting sort of the staged arcs into the forward-star layout.
    pub fn finalize(&mut self) {
        assert!(!self.finalized, "finalize called twice");
        let n = self.n_nodes;
        let n_slots = 2 * self.staged.len();

        // Pass 1: out-degree per node, forward slots counted separately.
        let mut first = vec![0usize; n + 1];
        let mut n_fwd = vec![0usize; n];
        for a in &self.staged {
            first[a.tail + 1] += 1;
            first[a.head + 1] += 1;
            n_fwd[a.tail] += 1;
        }
        for i in 0..n {
            first[i + 1] += first[i];
        }

        // Pass 2: scatter. Forward halves fill the front of each range.
        let mut next_rev: Vec<usize> = (0..n).map(|u| first[u] + n_fwd[u]).collect();
        let mut next_fwd = n_fwd;
        next_fwd.copy_from_slice(&first[..n]);

        let mut heads = vec![0usize; n_slots];
        let mut pairs = vec![0usize; n_slots];
        let mut caps = vec![0 as Cap; n_slots];
        let mut fwd = vec![false; n_slots];
        for a in &self.staged {
            let s = next_fwd[a.tail];
            next_fwd[a.tail] += 1;
            let r = next_rev[a.head];
            next_rev[a.head] += 1;

            heads[s] = a.head;
            caps[s] = a.cap;
            fwd[s] = true;
            pairs[s] = r;

            heads[r] = a.tail;
            caps[r] = a.rev_cap;
            pairs[r] = s;
        }

        self.staged.clear();
        self.rcaps = caps.clone();
        self.first = first;
        self.heads = heads;
        self.pairs = pairs;
        self.caps = caps;
        self.fwd = fwd;
        self.source_side = vec![false; n];
        self.finalized = true;
    }

    /// Drops every arc and terminal so the graph can be rebuilt.
    pub fn clear_arcs(&mut self) {
        self.staged.clear();
        self.first = Vec::new();
        self.heads = Vec::new();
        self.pairs = Vec::new();
        self.caps = Vec::new();
        self.rcaps = Vec::new();
        self.fwd = Vec::new();
        self.tcap.fill(0);
        self.flow_offset = 0;
        self.source_side.fill(false);
        self.finalized = false;
    }

    // Queries
    // -------------------------------------------------------------------------

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Number of arc pairs in the layout.
    pub fn n_arcs(&self) -> usize {
        self.heads.len() / 2
    }

    #[inline]
    pub fn slots(&self, u: usize) -> Range<usize> {
        self.first[u]..self.first[u + 1]
    }

    #[inline]
    pub fn head(&self, a: usize) -> usize {
        self.heads[a]
    }

    #[inline]
    pub fn pair(&self, a: usize) -> usize {
        self.pairs[a]
    }

    #[inline]
    pub fn cap(&self, a: usize) -> Cap {
        self.caps[a]
    }

    #[inline]
    pub fn residual(&self, a: usize) -> Cap {
        self.rcaps[a]
    }

    #[inline]
    pub fn is_forward(&self, a: usize) -> bool {
        self.fwd[a]
    }

    #[inline]
    pub fn tcap(&self, u: usize) -> Cap {
        self.tcap[u]
    }

    pub fn flow_offset(&self) -> Cap {
        self.flow_offset
    }

    #[inline]
    pub fn is_source_side(&self, u: usize) -> bool {
        self.source_side[u]
    }

    // Solver support
    // -------------------------------------------------------------------------

    pub(crate) fn reset_residuals(&mut self) {
        self.rcaps.copy_from_slice(&self.caps);
        self.source_side.fill(false);
    }

    /// Moves `delta` units of residual capacity from slot `a` to its pair.
    #[inline(always)]
    pub(crate) fn push_slot(&mut self, a: usize, delta: Cap) {
        self.rcaps[a] -= delta;
        let p = self.pairs[a];
        self.rcaps[p] += delta;
    }

    pub(crate) fn set_source_side(&mut self, side: Vec<bool>) {
        assert_eq!(side.len(), self.n_nodes);
        self.source_side = side;
    }

    /// Source side := nodes that cannot reach the sink in the residual graph.
    /// `sink_res[u]` is the residual capacity of `u`'s sink arc.
    pub(crate) fn mark_source_side_by_residual(&mut self, sink_res: &[Cap]) {
        let n = self.n_nodes;
        assert_eq!(sink_res.len(), n);
        let mut reach = vec![false; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for u in 0..n {
            if sink_res[u] > 0 {
                reach[u] = true;
                queue.push_back(u);
            }
        }
        while let Some(v) = queue.pop_front() {
            for a in self.slots(v) {
                let w = self.heads[a];
                if !reach[w] && self.rcaps[self.pairs[a]] > 0 {
                    reach[w] = true;
                    queue.push_back(w);
                }
            }
        }
        for u in 0..n {
            self.source_side[u] = !reach[u];
        }
    }

    /// Capacity of the current source/sink partition, terminals and
    /// `flow_offset` included.
    pub fn cut_value(&self) -> Cap {
        assert!(self.finalized, "cut_value needs a finalized graph");
        let mut total = self.flow_offset;
        for u in 0..self.n_nodes {
            let t = self.tcap[u];
            if self.source_side[u] {
                if t < 0 {
                    total = total.saturating_add(-t);
                }
                for a in self.slots(u) {
                    if !self.source_side[self.heads[a]] {
                        total = total.saturating_add(self.caps[a]);
                    }
                }
            } else if t > 0 {
                total = total.saturating_add(t);
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_and_coord_round_trip_on_a_5d_lattice() {
        let g = GridGraph::new(&[2, 3, 1, 4, 5]);
        assert_eq!(g.n_nodes(), 120);
        assert_eq!(g.rank(), 5);
        let i = g.index(&[1, 2, 0, 3, 4]);
        assert_eq!(i, 60 + 2 * 20 + 3 * 5 + 4);
        assert_eq!(&g.coord(i)[..5], &[1, 2, 0, 3, 4]);
    }

    #[test]
    fn finalize_groups_slots_by_tail_forward_first() {
        let mut g = GridGraph::new(&[4]);
        g.append_arc(2, 0, 5, 0);
        g.append_arc(0, 1, 3, 1);
        g.append_arc(1, 0, 7, 2);
        g.append_arc(0, 3, 0, 0); // dropped
        g.finalize();

        assert_eq!(g.n_arcs(), 3);
        // Node 0 owns forward slot 0->1 and reverse slots 0->2, 0->1.
        let s0: Vec<usize> = g.slots(0).collect();
        assert_eq!(s0.len(), 3);
        assert!(g.is_forward(s0[0]));
        assert_eq!(g.head(s0[0]), 1);
        assert_eq!(g.cap(s0[0]), 3);
        assert!(!g.is_forward(s0[1]) && !g.is_forward(s0[2]));
        assert_eq!(g.head(s0[1]), 2);
        assert_eq!(g.cap(s0[1]), 0);
        assert_eq!(g.head(s0[2]), 1);
        assert_eq!(g.cap(s0[2]), 2);

        for a in 0..2 * g.n_arcs() {
            assert_eq!(g.pair(g.pair(a)), a);
            assert_ne!(g.is_forward(a), g.is_forward(g.pair(a)));
        }
        assert_eq!(g.slots(3).len(), 0);
    }

    #[test]
    fn tweights_fold_the_shared_part_into_the_offset() {
        let mut g = GridGraph::new(&[2]);
        g.add_tweights(0, 5, 0);
        g.add_tweights(0, 0, 3);
        assert_eq!(g.tcap(0), 2);
        assert_eq!(g.flow_offset(), 3);
        g.add_tweights(0, 1, 10);
        assert_eq!(g.tcap(0), -7);
        assert_eq!(g.flow_offset(), 6);
    }

    #[test]
    fn cut_value_counts_crossing_slots_and_terminals() {
        let mut g = GridGraph::new(&[3]);
        g.add_tweights(0, 4, 0);
        g.add_tweights(2, 0, 6);
        g.append_arc(0, 1, 2, 9);
        g.append_arc(1, 2, 3, 0);
        g.finalize();

        g.set_source_side(vec![true, true, false]);
        assert_eq!(g.cut_value(), 3);
        g.set_source_side(vec![true, false, false]);
        assert_eq!(g.cut_value(), 2);
        g.set_source_side(vec![false, false, false]);
        assert_eq!(g.cut_value(), 4);
    }

    #[test]
    fn finite_cut_bound_skips_infinite_capacities() {
        let mut g = GridGraph::new(&[3]);
        g.add_tweights(0, 4, 1);
        g.add_tweights(1, 0, INF_CAP);
        g.add_tweights(2, 0, 6);
        g.append_arc(0, 1, 2, 9);
        g.append_arc(1, 2, INF_CAP, 3);
        // Offset 1, terminals 3 + 6, arcs 2 + 9 + 3.
        assert_eq!(g.finite_cut_bound(), 24);
    }

    #[test]
    #[should_panic(expected = "finalized")]
    fn append_after_finalize_panics() {
        let mut g = GridGraph::new(&[2]);
        g.finalize();
        g.append_arc(0, 1, 1, 0);
    }

    #[test]
    fn clear_arcs_reenables_append() {
        let mut g = GridGraph::new(&[2, 2]);
        g.append_arc(0, 3, 1, 1);
        g.add_tweights(1, 2, 0);
        g.finalize();
        g.clear_arcs();
        assert!(!g.is_finalized());
        assert_eq!(g.tcap(1), 0);
        g.append_arc(3, 0, 1, 0);
        g.finalize();
        assert_eq!(g.n_arcs(), 1);
    }
}
