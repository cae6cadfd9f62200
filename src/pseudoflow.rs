//! Highest-label pseudoflow.
//!
//! Every terminal arc starts saturated, so nodes carry signed excess and
//! form a forest of normalized trees. Strong trees (positive root excess)
//! are merged under weak nodes one label below and push their excess up
//! the merged tree, splitting at saturated edges. When no strong root is
//! left, the strong nodes are the source side of a minimum cut.

use crate::error::{SegError, SegResult};
use crate::graph::{Cap, GridGraph};
use crate::observe::SolveStats;

const NIL: usize = usize::MAX;

struct Pseudoflow {
    n: usize,
    /// Label given to every node of a tree lifted at a gap.
    lifted: usize,
    label: Vec<usize>,
    excess: Vec<Cap>,
    label_count: Vec<usize>,

    // Forest
    parent: Vec<usize>,
    arc_to_parent: Vec<usize>,
    first_child: Vec<usize>,
    sib_next: Vec<usize>,
    sib_prev: Vec<usize>,
    next_scan: Vec<usize>,

    // Out-of-tree slots of each node, stored in the node's own slot range
    // of the graph layout. `oot_pos[a]` is the position of slot `a` in its
    // tail's list, `next_arc[u]` the scan cursor.
    oot: Vec<usize>,
    oot_len: Vec<usize>,
    oot_pos: Vec<usize>,
    next_arc: Vec<usize>,

    // Strong roots, one FIFO per label.
    bucket_first: Vec<usize>,
    bucket_last: Vec<usize>,
    b_next: Vec<usize>,
    hsl: usize,

    stats: SolveStats,
}

/// Runs pseudoflow on a finalized graph and marks the minimum cut.
/// Returns the minimum cut value, which equals the maximum flow.
pub fn solve(g: &mut GridGraph) -> SegResult<(Cap, SolveStats)> {
    if !g.is_finalized() {
        return Err(SegError::Precondition("pseudoflow needs a finalized graph".into()));
    }
    g.reset_residuals();

    let mut pf = Pseudoflow::new(g);
    while let Some(root) = pf.highest_strong_root() {
        pf.process_root(g, root);
    }

    let side = pf.label.iter().map(|&l| l >= pf.lifted).collect();
    g.set_source_side(side);
    Ok((g.cut_value(), pf.stats))
}

impl Pseudoflow {
    fn new(g: &GridGraph) -> Self {
        let n = g.n_nodes();
        let n_slots = g.heads.len();
        let lifted = n + 1;
        let mut pf = Self {
            n,
            lifted,
            label: vec![0; n],
            excess: vec![0; n],
            label_count: vec![0; lifted + 1],
            parent: vec![NIL; n],
            arc_to_parent: vec![NIL; n],
            first_child: vec![NIL; n],
            sib_next: vec![NIL; n],
            sib_prev: vec![NIL; n],
            next_scan: vec![NIL; n],
            oot: (0..n_slots).collect(),
            oot_len: (0..n).map(|u| g.first[u + 1] - g.first[u]).collect(),
            oot_pos: vec![0; n_slots],
            next_arc: vec![0; n],
            bucket_first: vec![NIL; lifted + 1],
            bucket_last: vec![NIL; lifted + 1],
            b_next: vec![NIL; n],
            hsl: 1,
            stats: SolveStats::default(),
        };

        for u in 0..n {
            for a in g.slots(u) {
                pf.oot_pos[a] = a - g.first[u];
            }
            let t = g.tcap(u);
            pf.excess[u] = t;
            if t > 0 {
                pf.label[u] = 1;
                pf.label_count[1] += 1;
                pf.bucket_push(u, 1);
            } else {
                pf.label_count[0] += 1;
            }
        }
        pf
    }

    // Strong-root buckets
    // -------------------------------------------------------------------------

    fn bucket_push(&mut self, u: usize, l: usize) {
        self.b_next[u] = NIL;
        if self.bucket_last[l] != NIL {
            self.b_next[self.bucket_last[l]] = u;
        } else {
            self.bucket_first[l] = u;
        }
        self.bucket_last[l] = u;
    }

    fn bucket_pop(&mut self, l: usize) -> Option<usize> {
        let u = self.bucket_first[l];
        if u == NIL {
            return None;
        }
        self.bucket_first[l] = self.b_next[u];
        if self.bucket_first[l] == NIL {
            self.bucket_last[l] = NIL;
        }
        self.b_next[u] = NIL;
        Some(u)
    }

    /// Highest-label strong root, lifting whole trees at gaps on the way.
    fn highest_strong_root(&mut self) -> Option<usize> {
        let mut i = self.hsl.min(self.n);
        while i > 0 {
            if self.bucket_first[i] != NIL {
                self.hsl = i;
                if self.label_count[i - 1] > 0 {
                    return self.bucket_pop(i);
                }
                self.stats.gaps += 1;
                while let Some(r) = self.bucket_pop(i) {
                    self.lift_all(r);
                }
            }
            i -= 1;
        }

        // Strong roots that are still at label zero start over at one.
        if self.bucket_first[0] == NIL {
            return None;
        }
        while let Some(r) = self.bucket_pop(0) {
            self.label_count[0] -= 1;
            self.label[r] = 1;
            self.label_count[1] += 1;
            self.bucket_push(r, 1);
        }
        self.hsl = 1;
        self.bucket_pop(1)
    }

    fn lift_all(&mut self, root: usize) {
        let mut cur = root;
        self.next_scan[cur] = self.first_child[cur];
        self.lift(cur);
        loop {
            while self.next_scan[cur] != NIL {
                let t = self.next_scan[cur];
                self.next_scan[cur] = self.sib_next[t];
                cur = t;
                self.next_scan[cur] = self.first_child[cur];
                self.lift(cur);
            }
            cur = self.parent[cur];
            if cur == NIL {
                break;
            }
        }
    }

    fn lift(&mut self, u: usize) {
        self.label_count[self.label[u]] -= 1;
        self.label[u] = self.lifted;
        self.stats.lifted += 1;
    }

    // Forest
    // -------------------------------------------------------------------------

    fn add_child(&mut self, p: usize, c: usize) {
        self.parent[c] = p;
        self.sib_prev[c] = NIL;
        self.sib_next[c] = self.first_child[p];
        if self.first_child[p] != NIL {
            self.sib_prev[self.first_child[p]] = c;
        }
        self.first_child[p] = c;
    }

    fn remove_child(&mut self, p: usize, c: usize) {
        let (pv, nx) = (self.sib_prev[c], self.sib_next[c]);
        if pv != NIL {
            self.sib_next[pv] = nx;
        } else {
            self.first_child[p] = nx;
        }
        if nx != NIL {
            self.sib_prev[nx] = pv;
        }
        self.parent[c] = NIL;
        self.sib_prev[c] = NIL;
        self.sib_next[c] = NIL;
    }

    // Out-of-tree lists
    // -------------------------------------------------------------------------

    fn oot_add(&mut self, g: &GridGraph, u: usize, a: usize) {
        let base = g.first[u];
        let len = self.oot_len[u];
        self.oot[base + len] = a;
        self.oot_pos[a] = len;
        self.oot_len[u] = len + 1;
    }

    /// Removes slot `a` from its tail's list without skipping unscanned
    /// entries: the scanned prefix `..next_arc` stays scanned.
    fn oot_remove(&mut self, g: &GridGraph, u: usize, a: usize) {
        let base = g.first[u];
        let j = self.oot_pos[a];
        let cursor = self.next_arc[u];
        let mut hole = j;
        if j < cursor {
            let moved = self.oot[base + cursor - 1];
            self.oot[base + j] = moved;
            self.oot_pos[moved] = j;
            self.next_arc[u] = cursor - 1;
            hole = cursor - 1;
        }
        let last = self.oot_len[u] - 1;
        if hole != last {
            let tail = self.oot[base + last];
            self.oot[base + hole] = tail;
            self.oot_pos[tail] = hole;
        }
        self.oot_len[u] = last;
        self.oot_pos[a] = NIL;
    }

    // Main loop
    // -------------------------------------------------------------------------

    fn process_root(&mut self, g: &mut GridGraph, root: usize) {
        let mut s = root;
        self.next_scan[s] = self.first_child[s];

        if let Some((a, w)) = self.find_weak(g, s) {
            self.merge(g, w, s, a);
            self.push_excess(g, root);
            return;
        }
        self.check_children(s);

        loop {
            while self.next_scan[s] != NIL {
                let t = self.next_scan[s];
                self.next_scan[s] = self.sib_next[t];
                s = t;
                self.next_scan[s] = self.first_child[s];

                if let Some((a, w)) = self.find_weak(g, s) {
                    self.merge(g, w, s, a);
                    self.push_excess(g, root);
                    return;
                }
                self.check_children(s);
            }
            s = self.parent[s];
            if s == NIL {
                break;
            }
            self.check_children(s);
        }

        self.bucket_push(root, self.label[root]);
        self.hsl += 1;
    }

    /// Next out-of-tree residual slot from `s` to a node one label below
    /// the highest strong label. The slot and its pair leave the lists.
    fn find_weak(&mut self, g: &GridGraph, s: usize) -> Option<(usize, usize)> {
        let base = g.first[s];
        let target = self.hsl - 1;
        let mut i = self.next_arc[s];
        while i < self.oot_len[s] {
            let a = self.oot[base + i];
            let w = g.heads[a];
            if g.rcaps[a] > 0 && self.label[w] == target {
                self.next_arc[s] = i;
                self.oot_remove(g, s, a);
                self.oot_remove(g, w, g.pairs[a]);
                return Some((a, w));
            }
            i += 1;
        }
        self.next_arc[s] = self.oot_len[s];
        None
    }

    /// Relabels `s` unless some child shares its label.
    fn check_children(&mut self, s: usize) {
        while self.next_scan[s] != NIL {
            if self.label[self.next_scan[s]] == self.label[s] {
                return;
            }
            self.next_scan[s] = self.sib_next[self.next_scan[s]];
        }
        self.label_count[self.label[s]] -= 1;
        self.label[s] += 1;
        self.label_count[self.label[s]] += 1;
        self.next_arc[s] = 0;
        self.stats.relabels += 1;
    }

    /// Re-roots the strong tree at `s` and hangs it under the weak node `w`
    /// through slot `a` (`s -> w`).
    fn merge(&mut self, g: &GridGraph, w: usize, s: usize, a: usize) {
        self.stats.merges += 1;
        let mut cur = s;
        let mut new_parent = w;
        let mut new_arc = a;
        while self.parent[cur] != NIL {
            let old_arc = self.arc_to_parent[cur];
            let old_parent = self.parent[cur];
            self.arc_to_parent[cur] = new_arc;
            self.remove_child(old_parent, cur);
            self.add_child(new_parent, cur);
            new_parent = cur;
            cur = old_parent;
            new_arc = g.pairs[old_arc];
        }
        self.arc_to_parent[cur] = new_arc;
        self.add_child(new_parent, cur);
    }

    /// Pushes the excess of the old root up to the new root, splitting the
    /// tree at every edge too small to carry it.
    fn push_excess(&mut self, g: &mut GridGraph, root: usize) {
        let mut cur = root;
        let mut prev_excess: Cap = 1;
        while self.excess[cur] > 0 && self.parent[cur] != NIL {
            let p = self.parent[cur];
            prev_excess = self.excess[p];
            let a = self.arc_to_parent[cur];
            let res = g.rcaps[a];
            self.stats.pushes += 1;
            if res >= self.excess[cur] {
                let ex = self.excess[cur];
                g.push_slot(a, ex);
                self.excess[p] += ex;
                self.excess[cur] = 0;
            } else {
                g.push_slot(a, res);
                self.excess[p] += res;
                self.excess[cur] -= res;
                self.remove_child(p, cur);
                self.oot_add(g, p, g.pairs[a]);
                self.oot_add(g, cur, a);
                self.bucket_push(cur, self.label[cur]);
            }
            cur = p;
        }
        if self.excess[cur] > 0 && prev_excess <= 0 {
            self.bucket_push(cur, self.label[cur]);
        }
    }
}
