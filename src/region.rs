use crate::desc::RegionDesc;
use crate::graph::{Cap, GridGraph};
use crate::vol::{CostVol, IntensityVol};
use rayon::prelude::*;

/// Terminal capacities of region subgraph `sub` from channel `ch` of the
/// object and background cost volumes. A source-side voxel is object and
/// pays `obj`; a sink-side voxel pays `bkg`. Negative pairs are shifted so
/// both terminals stay non-negative.
pub fn build_region_terms(g: &mut GridGraph, sub: usize, ch: usize, obj: &CostVol, bkg: &CostVol) {
    for z in 0..obj.d {
        for y in 0..obj.h {
            for x in 0..obj.w {
                let (o, b) = (obj.get(x, y, z, ch), bkg.get(x, y, z, ch));
                let shift = o.min(b).min(0);
                let node = g.index(&[sub, x, y, z]);
                g.add_tweights(node, b - shift, o - shift);
            }
        }
    }
}

/// `round(coef * exp(-(di / theta)^2 / 2))`
#[inline]
pub fn boundary_weight(coef: f64, theta: f64, di: f64) -> Cap {
    let r = di / theta;
    (coef * (-0.5 * r * r).exp()).round() as Cap
}

/// Boundary weights toward the +x, +y, +z neighbour of every voxel (zero
/// past the volume edge), from intensity channel `ch`.
pub fn boundary_weights(intensity: &IntensityVol, ch: usize, desc: &RegionDesc) -> Vec<[Cap; 3]> {
    let (w, h, d) = (intensity.w, intensity.h, intensity.d);
    (0..intensity.n_voxels())
        .into_par_iter()
        .map(|i| {
            let (x, y, z) = (i % w, (i / w) % h, i / (w * h));
            let here = intensity.get(x, y, z, ch) as f64;
            let mut out = [0 as Cap; 3];
            let nbrs = [(x + 1 < w, [x + 1, y, z]), (y + 1 < h, [x, y + 1, z]), (z + 1 < d, [x, y, z + 1])];
            for (k, (inside, xyz)) in nbrs.into_iter().enumerate() {
                if inside {
                    let di = intensity.get_xyz(xyz, ch) as f64 - here;
                    out[k] = boundary_weight(desc.boundary_coef, desc.bandwidth, di);
                }
            }
            out
        })
        .collect()
}

/// Symmetric 6-neighbour arcs of region subgraph `sub`.
pub fn build_boundary_terms(g: &mut GridGraph, sub: usize, extent: [usize; 3], weights: &[[Cap; 3]]) {
    let [w, h, d] = extent;
    debug_assert_eq!(weights.len(), w * h * d);
    for z in 0..d {
        for y in 0..h {
            for x in 0..w {
                let ws = weights[(z * h + y) * w + x];
                let u = g.index(&[sub, x, y, z]);
                let nbrs = [[x + 1, y, z], [x, y + 1, z], [x, y, z + 1]];
                for (k, [nx, ny, nz]) in nbrs.into_iter().enumerate() {
                    if ws[k] > 0 {
                        let v = g.index(&[sub, nx, ny, nz]);
                        g.append_arc(u, v, ws[k], ws[k]);
                    }
                }
            }
        }
    }
}
