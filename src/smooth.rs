//! Arcs inside one surface subgraph: column monotonicity, the base plane,
//! and the coupling between neighbouring columns (hard bound or convex
//! shape prior, chosen per column direction).

use crate::desc::PriorDirDesc;
use crate::frame::SurfaceFrame;
use crate::graph::{Cap, GridGraph, INF_CAP};

/// `V(c, l) -> V(c, l-1)` for every column: a level on the source side
/// drags every level below it along.
pub fn build_intra_column(g: &mut GridGraph, frame: &SurfaceFrame) {
    for c in frame.orient.columns() {
        for l in frame.lo + 1..=frame.hi {
            let u = frame.node(g, c, l);
            let v = frame.node(g, c, l - 1);
            g.append_arc(u, v, INF_CAP, 0);
        }
    }
}

/// Ties the bases of neighbouring columns together in both directions so
/// the base plane is either all source side or all sink side.
pub fn build_base_plane(g: &mut GridGraph, frame: &SurfaceFrame) {
    for c in frame.orient.columns() {
        for dir in 0..2 {
            if let Some(c2) = frame.orient.neighbor(c, dir, frame.desc.circular[dir]) {
                let u = frame.node(g, c, frame.lo);
                let v = frame.node(g, c2, frame.lo);
                g.append_arc(u, v, INF_CAP, INF_CAP);
            }
        }
    }
}

/// `|h(c) - h(c')| <= bound` between neighbours along `dir`.
///
/// Targets at or below the base are implied by the base plane and skipped.
pub fn build_hard_smoothness(g: &mut GridGraph, frame: &SurfaceFrame, dir: usize, bound: u32) {
    let b = bound as usize;
    for c in frame.orient.columns() {
        let Some(c2) = frame.orient.neighbor(c, dir, frame.desc.circular[dir]) else {
            continue;
        };
        for l in frame.lo + 1..=frame.hi {
            if l <= frame.lo + b {
                continue;
            }
            let t = l - b;
            let (a0, a1) = (frame.node(g, c, l), frame.node(g, c2, t));
            g.append_arc(a0, a1, INF_CAP, 0);
            let (b0, b1) = (frame.node(g, c2, l), frame.node(g, c, t));
            g.append_arc(b0, b1, INF_CAP, 0);
        }
    }
}

/// Capacity increments of the convex penalty `coef * k^p`: entry `k` is
/// `coef * (g(k+1) - 2g(k) + g(k-1))` with `g(k) = max(k, 0)^p`, so
/// `sum_t inc[t] * max(d - t, 0) == coef * d^p` for every `d <= n`.
pub fn convex_increments(coef: f64, p: f64, n: usize) -> Vec<Cap> {
    let g = |k: i64| -> f64 { (k.max(0) as f64).powf(p) };
    (0..n as i64)
        .map(|k| {
            let v = coef * (g(k + 1) - 2.0 * g(k) + g(k - 1));
            v.round().clamp(0.0, INF_CAP as f64) as Cap
        })
        .collect()
}

/// One family of the convex prior: arcs `V(tail_c, l) -> V(head_c, l - shift - t)`
/// for `t` in `0..=slack`, finite with capacity `inc[t]` below the slack and
/// infinite at it.
///
/// A target above the feasible range puts the same capacity on the tail's
/// sink arc; a target at or below the base is implied and skipped.
fn build_prior_family(
    g: &mut GridGraph,
    frame: &SurfaceFrame,
    tail_c: [usize; 2],
    head_c: [usize; 2],
    shift: i32,
    slack: u32,
    inc: &[Cap],
) {
    let slack = slack as usize;
    for l in frame.lo..=frame.hi {
        let tail = frame.node(g, tail_c, l);
        for t in 0..=slack {
            let cap = if t < slack { inc[t] } else { INF_CAP };
            if cap == 0 {
                continue;
            }
            let target = l as isize - shift as isize - t as isize;
            if target <= frame.lo as isize {
                break;
            }
            if target > frame.hi as isize {
                g.add_tweights(tail, 0, cap);
                continue;
            }
            let head = frame.node(g, head_c, target as usize);
            g.append_arc(tail, head, cap, 0);
        }
    }
}

/// Convex shape prior between neighbours along `dir`. With `d = h(c') - h(c) - mean`,
/// positive `d` costs `fwd * d^p` up to `up`, negative `d` costs
/// `bwd * |d|^p` up to `low`, and anything beyond the slack is infeasible.
pub fn build_shape_prior(g: &mut GridGraph, frame: &SurfaceFrame, dir: usize, p: f64, prior: &PriorDirDesc) {
    for c in frame.orient.columns() {
        let Some(c2) = frame.orient.neighbor(c, dir, frame.desc.circular[dir]) else {
            continue;
        };
        let ci = frame.orient.col_index(c);
        let mean = prior.mean.at(ci);
        let (up, low) = (prior.up.at(ci), prior.low.at(ci));

        let inc_fwd = convex_increments(prior.fwd.at(ci), p, up as usize);
        build_prior_family(g, frame, c2, c, mean, up, &inc_fwd);

        let inc_bwd = convex_increments(prior.bwd.at(ci), p, low as usize);
        build_prior_family(g, frame, c, c2, -mean, low, &inc_bwd);
    }
}

/// Every intra-surface arc of one surface. Returns the number of arc pairs
/// appended.
pub fn build_surface_arcs(g: &mut GridGraph, frame: &SurfaceFrame) -> usize {
    let before = g.n_staged();
    build_intra_column(g, frame);
    build_base_plane(g, frame);
    let prior = frame.desc.prior.as_ref();
    for dir in 0..2 {
        match prior.and_then(|pr| pr.dirs[dir].as_ref().map(|d| (pr.p, d))) {
            Some((p, d)) => build_shape_prior(g, frame, dir, p, d),
            None => build_hard_smoothness(g, frame, dir, frame.desc.smooth[dir]),
        }
    }
    g.n_staged() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desc::{PerColumn, SurfaceDesc};
    use crate::orient::{Orientation, ScanDir};

    #[test]
    fn increments_sum_to_the_convex_penalty() {
        for &(coef, p) in &[(1.0, 2.0), (3.0, 2.0), (2.0, 1.0), (1.0, 3.0)] {
            let inc = convex_increments(coef, p, 6);
            for d in 0..=6usize {
                let total: Cap = (0..inc.len()).map(|t| inc[t] * (d.saturating_sub(t)) as Cap).sum();
                assert_eq!(total, (coef * (d as f64).powf(p)).round() as Cap, "coef {coef} p {p} d {d}");
            }
        }
        assert_eq!(convex_increments(1.0, 2.0, 4), vec![1, 2, 2, 2]);
        assert_eq!(convex_increments(5.0, 1.0, 3), vec![5, 0, 0]);
    }

    fn frame_on(desc: &SurfaceDesc, extent: [usize; 3]) -> SurfaceFrame<'_> {
        let orient = Orientation::new(desc.scan_dir, extent);
        SurfaceFrame {
            sub: 0,
            orient,
            lo: 0,
            hi: orient.n_levels() - 1,
            desc,
        }
    }

    #[test]
    fn hard_bound_skips_arcs_implied_by_the_base() {
        let desc = SurfaceDesc {
            smooth: [2, 0],
            ..Default::default()
        };
        let frame = frame_on(&desc, [2, 1, 4]);
        let mut g = GridGraph::new(&[1, 2, 1, 4]);
        build_hard_smoothness(&mut g, &frame, 0, 2);
        // Levels 3 only (l - 2 > 0), both directions.
        assert_eq!(g.n_staged(), 2);
    }

    #[test]
    fn base_plane_wraps_on_circular_columns() {
        let desc = SurfaceDesc {
            circular: [true, false],
            ..Default::default()
        };
        let frame = frame_on(&desc, [4, 1, 2]);
        let mut g = GridGraph::new(&[1, 4, 1, 2]);
        build_base_plane(&mut g, &frame);
        assert_eq!(g.n_staged(), 4);
    }

    #[test]
    fn prior_targets_above_the_range_become_sink_capacity() {
        let desc = SurfaceDesc {
            scan_dir: ScanDir::PosZ,
            ..Default::default()
        };
        let frame = frame_on(&desc, [2, 1, 3]);
        let prior = PriorDirDesc {
            mean: PerColumn::Uniform(-1),
            up: PerColumn::Uniform(0),
            low: PerColumn::Uniform(0),
            fwd: PerColumn::Uniform(1.0),
            bwd: PerColumn::Uniform(1.0),
        };
        let mut g = GridGraph::new(&[1, 2, 1, 3]);
        build_shape_prior(&mut g, &frame, 0, 2.0, &prior);
        // Forward family: V(c1, l) -> V(c0, l + 1); l = 2 targets level 3.
        assert_eq!(g.tcap(frame.node(&g, [1, 0], 2)), -INF_CAP);
        assert_eq!(g.tcap(frame.node(&g, [1, 0], 1)), 0);
    }
}
