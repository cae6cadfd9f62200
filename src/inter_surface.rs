use crate::desc::RelationDesc;
use crate::error::ConfigError;
use crate::frame::SurfaceFrame;
use crate::graph::{GridGraph, INF_CAP};

/// A relation `r0 <= h(k1) - h(k0) <= r1` must name two distinct surfaces,
/// have a non-empty range, and must not force `k1` strictly above `k0` on
/// both ends (swap the surfaces instead).
pub fn validate_relation(rel: &RelationDesc, n_surfaces: usize) -> Result<(), ConfigError> {
    let invalid = |reason| ConfigError::InvalidRelation {
        k0: rel.k0,
        k1: rel.k1,
        r0: rel.r0,
        r1: rel.r1,
        reason,
    };
    if rel.k0 >= n_surfaces || rel.k1 >= n_surfaces {
        return Err(invalid("surface index out of range"));
    }
    if rel.k0 == rel.k1 {
        return Err(invalid("a surface cannot be related to itself"));
    }
    if rel.r0 > rel.r1 {
        return Err(invalid("r0 exceeds r1"));
    }
    if rel.r0 > 0 && rel.r1 > 0 {
        return Err(invalid("both bounds positive"));
    }
    Ok(())
}

/// Narrows per-surface `(lo, hi)` ranges until every relation can hold at
/// both ends. Relaxes all relations per pass; a system that still moves
/// after `n + 1` passes is cyclic.
pub fn propagate_margins(initial: &[(i32, i32)], relations: &[RelationDesc]) -> Result<Vec<(i32, i32)>, ConfigError> {
    let mut m = initial.to_vec();
    let passes = m.len() + 1;

    for _ in 0..passes {
        let mut changed = false;
        for rel in relations {
            let (lo0, hi0) = m[rel.k0];
            let (lo1, hi1) = m[rel.k1];
            let nlo1 = lo1.max(lo0 + rel.r0);
            let nhi1 = hi1.min(hi0 + rel.r1);
            let nlo0 = lo0.max(nlo1 - rel.r1);
            let nhi0 = hi0.min(nhi1 - rel.r0);
            if (nlo0, nhi0, nlo1, nhi1) != (lo0, hi0, lo1, hi1) {
                changed = true;
                m[rel.k0] = (nlo0, nhi0);
                m[rel.k1] = (nlo1, nhi1);
            }
        }

        if let Some((surface, &(lo, hi))) = m.iter().enumerate().find(|(_, (lo, hi))| lo > hi) {
            return Err(ConfigError::EmptyMargin { surface, lo, hi });
        }
        if !changed {
            return Ok(m);
        }
    }
    Err(ConfigError::MarginsDiverged { passes })
}

/// Per column: `V(k0, l) -> V(k1, l + r0)` and `V(k1, l) -> V(k0, l - r1)`.
/// Targets at or below a base clamp onto that base.
pub fn build_relation_arcs(g: &mut GridGraph, f0: &SurfaceFrame, f1: &SurfaceFrame, rel: &RelationDesc) {
    debug_assert_eq!(f0.orient, f1.orient);
    for c in f0.orient.columns() {
        link_column(g, f0, f1, c, rel.r0);
        link_column(g, f1, f0, c, -rel.r1);
    }
}

fn link_column(g: &mut GridGraph, from: &SurfaceFrame, to: &SurfaceFrame, c: [usize; 2], offset: i32) {
    let mut base_linked = false;
    for l in from.lo..=from.hi {
        // Propagated margins keep targets at or below `to.hi`.
        let Some(t) = to.clamp_low(l as isize + offset as isize) else {
            continue;
        };
        if t == to.lo {
            // Only the lowest such level matters; the rest follow through
            // the intra-column arcs.
            if base_linked {
                continue;
            }
            base_linked = true;
        }
        let u = from.node(g, c, l);
        let v = to.node(g, c, t);
        g.append_arc(u, v, INF_CAP, 0);
    }
}
