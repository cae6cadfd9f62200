use crate::frame::SurfaceFrame;
use crate::graph::{Cap, GridGraph, INF_CAP};
use crate::vol::CostVol;

/// Node weights of one column: the base carries the full cost of the
/// lowest feasible level, every level above carries the increment
/// `c(l) - c(l-1)`. Summing the weights up to `h` gives `c(h)`.
pub fn column_weights(profile: &[Cap]) -> Vec<Cap> {
    let mut out = Vec::with_capacity(profile.len());
    let mut prev = 0;
    for (i, &c) in profile.iter().enumerate() {
        out.push(if i == 0 { c } else { c - prev });
        prev = c;
    }
    out
}

/// Source capacity for a negative weight, sink capacity for a positive one.
#[inline]
fn add_weight(g: &mut GridGraph, node: usize, w: Cap) {
    if w < 0 {
        g.add_tweights(node, -w, 0);
    } else if w > 0 {
        g.add_tweights(node, 0, w);
    }
}

/// Writes the terminal capacities of one surface from channel `ch` of
/// `costs`. The source side of each column is every level at or below the
/// surface, so a cut pays `c(h)` per column.
pub fn apply_cost_transform(g: &mut GridGraph, frame: &SurfaceFrame, costs: &CostVol, ch: usize) {
    let (lo, hi) = (frame.lo, frame.hi);
    let mut profile: Vec<Cap> = Vec::with_capacity(hi - lo + 1);

    for c in frame.orient.columns() {
        profile.clear();
        for l in lo..=hi {
            profile.push(costs.get_xyz(frame.orient.to_xyz(c, l), ch));
        }
        for (i, w) in column_weights(&profile).into_iter().enumerate() {
            let node = frame.node(g, c, lo + i);
            add_weight(g, node, w);
        }
    }
}

/// Source capacity at the base of column `[0, 0]` of every surface, larger
/// than any cut that avoids infinite arcs. Whenever a feasible surface
/// exists, the empty cut loses to it and every base plane stays on the
/// source side. Must run after every finite arc is staged. Returns the
/// translation amount.
pub fn translate_surfaces(g: &mut GridGraph, frames: &[SurfaceFrame]) -> Cap {
    let translation = g.finite_cut_bound().saturating_add(1).min(INF_CAP);
    for frame in frames {
        let reference = frame.node(g, [0, 0], frame.lo);
        g.add_tweights(reference, translation, 0);
    }
    translation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::SurfaceDesc;
    use crate::orient::{Orientation, ScanDir};
    use crate::vol::Vol;

    #[test]
    fn weights_telescope_back_to_the_profile() {
        let profile = [5, 3, 3, 9, -2];
        let w = column_weights(&profile);
        assert_eq!(w, vec![5, -2, 0, 6, -11]);
        let mut acc = 0;
        for (i, wi) in w.iter().enumerate() {
            acc += wi;
            assert_eq!(acc, profile[i]);
        }
        assert_eq!(column_weights(&profile), w);
    }

    #[test]
    fn translation_outweighs_every_finite_cut() {
        let desc = SurfaceDesc::default();
        let extent = [2, 1, 3];
        let frame = SurfaceFrame {
            sub: 0,
            orient: Orientation::new(ScanDir::PosZ, extent),
            lo: 0,
            hi: 2,
            desc: &desc,
        };
        // Column (0,0): 4, 1, 6. Column (1,0): -3, -3, 0.
        let costs = Vol::from_arr(2, 1, 3, 1, vec![4, -3, 1, -3, 6, 0]);
        let mut g = GridGraph::new(&[1, 2, 1, 3]);
        apply_cost_transform(&mut g, &frame, &costs, 0);

        assert_eq!(g.tcap(frame.node(&g, [0, 0], 0)), -4);
        assert_eq!(g.tcap(frame.node(&g, [0, 0], 1)), 3);
        assert_eq!(g.tcap(frame.node(&g, [0, 0], 2)), -5);
        assert_eq!(g.tcap(frame.node(&g, [1, 0], 0)), 3);
        assert_eq!(g.tcap(frame.node(&g, [1, 0], 1)), 0);
        assert_eq!(g.tcap(frame.node(&g, [1, 0], 2)), -3);

        g.append_arc(frame.node(&g, [0, 0], 2), frame.node(&g, [1, 0], 2), 7, 0);
        let t = translate_surfaces(&mut g, &[frame]);
        // Terminals 4 + 3 + 5 + 3 + 3, arc 7.
        assert_eq!(t, 25 + 1);
        // Reference base: weight 4 (sink) folded with the translation.
        assert_eq!(g.tcap(frame.node(&g, [0, 0], 0)), 22);
        assert_eq!(g.flow_offset(), 4);
    }
}
