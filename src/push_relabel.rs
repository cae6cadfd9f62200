//! Highest-label push-relabel with gap and global relabelling.
//!
//! Phase one computes a maximum preflow and leaves unreturned excess on
//! nodes that can no longer reach the sink. Phase two cancels flow cycles
//! among those nodes and returns the excess, which turns the preflow into
//! a flow. The minimum cut is read from residual reachability to the sink.

use crate::error::{SegError, SegResult};
use crate::graph::{Cap, GridGraph};
use crate::observe::SolveStats;

const NIL: usize = usize::MAX;

/// Work charged per relabel on top of the scanned degree.
const RELABEL_WORK: usize = 12;
/// Work charged per node toward the global relabel threshold.
const NODE_WORK: usize = 6;
const GLOBAL_UPDATE_FREQ: f64 = 0.5;

struct PushRelabel {
    n: usize,
    /// Label of nodes that cannot reach the sink.
    unreachable: usize,
    label: Vec<usize>,
    excess: Vec<Cap>,
    sink_res: Vec<Cap>,
    src_flow: Vec<Cap>,
    cur: Vec<usize>,

    // Per-label buckets. A node with a label below `unreachable` sits in
    // exactly one of them unless it is being discharged.
    active: Vec<usize>,
    inactive: Vec<usize>,
    next: Vec<usize>,
    prev: Vec<usize>,
    a_max: usize,
    d_max: usize,

    work: usize,
    work_limit: f64,
    flow: Cap,
    stats: SolveStats,
}

/// Runs both phases on a finalized graph and marks the minimum cut.
/// Returns the maximum flow value, `flow_offset` included.
pub fn solve(g: &mut GridGraph) -> SegResult<(Cap, SolveStats)> {
    if !g.is_finalized() {
        return Err(SegError::Precondition("push-relabel needs a finalized graph".into()));
    }
    g.reset_residuals();

    let mut pr = PushRelabel::new(g);
    pr.stage_one(g);
    g.mark_source_side_by_residual(&pr.sink_res);
    pr.stage_two(g);

    Ok((pr.flow + g.flow_offset(), pr.stats))
}

impl PushRelabel {
    fn new(g: &GridGraph) -> Self {
        let n = g.n_nodes();
        let unreachable = n + 1;
        let mut pr = Self {
            n,
            unreachable,
            label: vec![1; n],
            excess: vec![0; n],
            sink_res: vec![0; n],
            src_flow: vec![0; n],
            cur: g.first[..n].to_vec(),
            active: vec![NIL; unreachable + 1],
            inactive: vec![NIL; unreachable + 1],
            next: vec![NIL; n],
            prev: vec![NIL; n],
            a_max: 0,
            d_max: 1,
            work: 0,
            work_limit: GLOBAL_UPDATE_FREQ * (NODE_WORK * n + g.heads.len()) as f64,
            flow: 0,
            stats: SolveStats::default(),
        };

        for u in 0..n {
            let t = g.tcap(u);
            if t > 0 {
                pr.excess[u] = t;
                pr.src_flow[u] = t;
                pr.add_active(u, 1);
            } else {
                pr.sink_res[u] = -t;
                pr.add_inactive(u, 1);
            }
        }
        pr
    }

    // Buckets
    // -------------------------------------------------------------------------

    fn add_active(&mut self, u: usize, d: usize) {
        self.next[u] = self.active[d];
        self.active[d] = u;
        self.a_max = self.a_max.max(d);
    }

    fn add_inactive(&mut self, u: usize, d: usize) {
        let head = self.inactive[d];
        self.next[u] = head;
        self.prev[u] = NIL;
        if head != NIL {
            self.prev[head] = u;
        }
        self.inactive[d] = u;
    }

    fn remove_inactive(&mut self, u: usize) {
        let d = self.label[u];
        let (p, nx) = (self.prev[u], self.next[u]);
        if p != NIL {
            self.next[p] = nx;
        } else {
            self.inactive[d] = nx;
        }
        if nx != NIL {
            self.prev[nx] = p;
        }
    }

    // Phase one
    // -------------------------------------------------------------------------

    fn stage_one(&mut self, g: &mut GridGraph) {
        while self.a_max >= 1 {
            let u = self.active[self.a_max];
            if u == NIL {
                self.a_max -= 1;
                continue;
            }
            self.active[self.a_max] = self.next[u];
            self.discharge(g, u);

            if self.work as f64 > self.work_limit {
                self.global_relabel(g);
            }
        }
    }

    fn discharge(&mut self, g: &mut GridGraph, u: usize) {
        loop {
            let d = self.label[u];

            if d == 1 && self.sink_res[u] > 0 {
                let delta = self.excess[u].min(self.sink_res[u]);
                self.sink_res[u] -= delta;
                self.excess[u] -= delta;
                self.flow += delta;
                self.stats.pushes += 1;
            }

            let end = g.first[u + 1];
            let mut a = self.cur[u];
            while self.excess[u] > 0 && a < end {
                if g.rcaps[a] > 0 {
                    let v = g.heads[a];
                    if self.label[v] + 1 == d {
                        let delta = self.excess[u].min(g.rcaps[a]);
                        g.push_slot(a, delta);
                        if self.excess[v] == 0 {
                            self.remove_inactive(v);
                            self.add_active(v, d - 1);
                        }
                        self.excess[v] += delta;
                        self.excess[u] -= delta;
                        self.stats.pushes += 1;
                        if self.excess[u] == 0 {
                            break;
                        }
                    }
                }
                a += 1;
            }
            self.cur[u] = a;

            if self.excess[u] == 0 {
                self.add_inactive(u, d);
                return;
            }

            self.relabel(g, u);
            if self.active[d] == NIL && self.inactive[d] == NIL {
                self.gap(d);
                self.label[u] = self.unreachable;
            }
            if self.label[u] >= self.unreachable {
                return;
            }
            self.a_max = self.a_max.max(self.label[u]);
        }
    }

    fn relabel(&mut self, g: &GridGraph, u: usize) {
        self.stats.relabels += 1;
        self.work += RELABEL_WORK;

        let mut min_d = self.unreachable - 1;
        let mut min_a = g.first[u];
        if self.sink_res[u] > 0 {
            min_d = 0;
        }
        for a in g.slots(u) {
            self.work += 1;
            if g.rcaps[a] > 0 {
                let lv = self.label[g.heads[a]];
                if lv < min_d {
                    min_d = lv;
                    min_a = a;
                }
            }
        }

        let new = min_d + 1;
        self.label[u] = new;
        if new < self.unreachable {
            self.cur[u] = min_a;
            self.d_max = self.d_max.max(new);
        }
    }

    /// Level `d` emptied: nothing above it can reach the sink.
    fn gap(&mut self, d: usize) {
        self.stats.gaps += 1;
        for level in d + 1..=self.d_max {
            for bucket in [self.active[level], self.inactive[level]] {
                let mut v = bucket;
                while v != NIL {
                    self.label[v] = self.unreachable;
                    v = self.next[v];
                }
            }
            self.active[level] = NIL;
            self.inactive[level] = NIL;
        }
        self.d_max = d - 1;
        self.a_max = d - 1;
    }

    /// Exact distances to the sink by reverse breadth-first search.
    fn global_relabel(&mut self, g: &GridGraph) {
        self.stats.global_relabels += 1;
        self.work = 0;

        self.label.fill(self.unreachable);
        self.active.fill(NIL);
        self.inactive.fill(NIL);

        let mut queue: Vec<usize> = Vec::new();
        for u in 0..self.n {
            if self.sink_res[u] > 0 {
                self.label[u] = 1;
                queue.push(u);
            }
        }
        let mut qi = 0;
        while qi < queue.len() {
            let v = queue[qi];
            qi += 1;
            let next_d = self.label[v] + 1;
            if next_d >= self.unreachable {
                continue;
            }
            for a in g.slots(v) {
                let w = g.heads[a];
                if self.label[w] == self.unreachable && g.rcaps[g.pairs[a]] > 0 {
                    self.label[w] = next_d;
                    queue.push(w);
                }
            }
        }

        self.a_max = 0;
        self.d_max = 1;
        for u in 0..self.n {
            let d = self.label[u];
            if d >= self.unreachable {
                continue;
            }
            self.cur[u] = g.first[u];
            self.d_max = self.d_max.max(d);
            if self.excess[u] > 0 {
                self.add_active(u, d);
            } else {
                self.add_inactive(u, d);
            }
        }
    }

    // Phase two
    // -------------------------------------------------------------------------

    /// Cancels flow cycles inside the source side, then returns every
    /// remaining excess to the source, downstream nodes first.
    fn stage_two(&mut self, g: &mut GridGraph) {
        const WHITE: u8 = 0;
        const GRAY: u8 = 1;
        const BLACK: u8 = 2;

        let n = self.n;
        let flow_on = |g: &GridGraph, a: usize| g.caps[a] - g.rcaps[a];

        let mut color = vec![WHITE; n];
        let mut parent = vec![NIL; n];
        let mut pos = vec![0usize; n];
        let mut scan: Vec<usize> = g.first[..n].to_vec();
        let mut order: Vec<usize> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();

        for root in 0..n {
            if color[root] != WHITE || !g.is_source_side(root) {
                continue;
            }
            color[root] = GRAY;
            pos[root] = 0;
            stack.push(root);

            while let Some(&u) = stack.last() {
                let end = g.first[u + 1];
                let mut descended = false;
                while scan[u] < end {
                    let a = scan[u];
                    let v = g.heads[a];
                    if !g.is_source_side(v) || flow_on(g, a) <= 0 || color[v] == BLACK {
                        scan[u] += 1;
                        continue;
                    }
                    if color[v] == WHITE {
                        parent[v] = a;
                        color[v] = GRAY;
                        pos[v] = stack.len();
                        stack.push(v);
                        descended = true;
                        break;
                    }

                    // Gray: the stack from `v` up to `u` plus `a` is a cycle.
                    let start = pos[v];
                    let mut delta = flow_on(g, a);
                    for &w in &stack[start + 1..] {
                        delta = delta.min(flow_on(g, parent[w]));
                    }
                    g.push_slot(g.pairs[a], delta);
                    for &w in &stack[start + 1..] {
                        let p = parent[w];
                        g.push_slot(g.pairs[p], delta);
                    }
                    self.stats.cycles_cancelled += 1;

                    // Resume below the lowest emptied tree arc.
                    if let Some(j) = (start + 1..stack.len()).find(|&j| flow_on(g, parent[stack[j]]) == 0) {
                        for w in stack.drain(j..) {
                            color[w] = WHITE;
                        }
                    }
                    descended = true;
                    break;
                }
                if !descended {
                    color[u] = BLACK;
                    order.push(u);
                    stack.pop();
                }
            }
        }

        for &u in &order {
            if self.excess[u] == 0 {
                continue;
            }
            let back = self.excess[u].min(self.src_flow[u]);
            self.src_flow[u] -= back;
            self.excess[u] -= back;

            for a in g.first[u]..g.first[u + 1] {
                if self.excess[u] == 0 {
                    break;
                }
                let incoming = flow_on(g, g.pairs[a]);
                if incoming > 0 {
                    let delta = self.excess[u].min(incoming);
                    let w = g.heads[a];
                    g.push_slot(a, delta);
                    self.excess[u] -= delta;
                    self.excess[w] += delta;
                }
            }
        }
        debug_assert!(self.excess.iter().all(|&e| e == 0), "excess left after phase two");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{brute_force_min_cut, net_outflow};

    fn diamond() -> GridGraph {
        // s -> 0 (10), s -> 1 (5); 0 -> 1 (15); 0 -> 2 (9); 1 -> 3 (8);
        // 2 -> 3 (4, back 6); 2 -> t (10); 3 -> t (10)
        let mut g = GridGraph::new(&[4]);
        g.add_tweights(0, 10, 0);
        g.add_tweights(1, 5, 0);
        g.add_tweights(2, 0, 10);
        g.add_tweights(3, 0, 10);
        g.append_arc(0, 1, 15, 0);
        g.append_arc(0, 2, 9, 0);
        g.append_arc(1, 3, 8, 0);
        g.append_arc(2, 3, 4, 6);
        g.finalize();
        g
    }

    #[test]
    fn diamond_flow_matches_the_cut() {
        let mut g = diamond();
        let (flow, stats) = solve(&mut g).unwrap();
        assert_eq!(flow, 15);
        assert_eq!(g.cut_value(), 15);
        assert!(stats.pushes > 0);
        assert_eq!(brute_force_min_cut(&g), 15);
    }

    #[test]
    fn excess_returns_to_the_source() {
        // Source supplies 10 to node 0 but only 3 can leave through node 1.
        let mut g = GridGraph::new(&[3]);
        g.add_tweights(0, 10, 0);
        g.add_tweights(1, 0, 3);
        g.append_arc(0, 1, 7, 0);
        g.append_arc(2, 0, 5, 5);
        g.finalize();

        let (flow, _) = solve(&mut g).unwrap();
        assert_eq!(flow, 3);
        // Only the sink arc of node 1 is saturated.
        assert!((0..3).all(|u| g.is_source_side(u)));
        assert_eq!(g.cut_value(), 3);
        assert_eq!(net_outflow(&g, 0), 3);
        assert_eq!(net_outflow(&g, 2), 0);
    }

    #[test]
    fn flow_cycles_are_cancelled() {
        // A saturated ring inside the source side.
        let mut g = GridGraph::new(&[4]);
        g.add_tweights(0, 20, 0);
        g.add_tweights(3, 0, 1);
        g.append_arc(0, 1, 9, 0);
        g.append_arc(1, 2, 9, 0);
        g.append_arc(2, 0, 9, 0);
        g.append_arc(2, 3, 1, 0);
        g.finalize();

        let (flow, _) = solve(&mut g).unwrap();
        assert_eq!(flow, 1);
        assert_eq!(g.cut_value(), 1);
        for u in 0..3 {
            let inflow_from_source = if u == 0 { 1 } else { 0 };
            assert_eq!(net_outflow(&g, u), inflow_from_source);
        }
    }

    #[test]
    fn offset_is_part_of_the_flow() {
        let mut g = GridGraph::new(&[1]);
        g.add_tweights(0, 4, 7);
        g.finalize();
        let (flow, _) = solve(&mut g).unwrap();
        assert_eq!(flow, 4);
        assert!(!g.is_source_side(0));
    }

    #[test]
    fn unfinalized_graph_is_a_precondition_error() {
        let mut g = GridGraph::new(&[2]);
        assert!(matches!(solve(&mut g), Err(SegError::Precondition(_))));
    }
}
