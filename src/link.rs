use crate::desc::{LinkDesc, LinkKind};
use crate::frame::SurfaceFrame;
use crate::graph::{GridGraph, INF_CAP};
use crate::vol::CostVol;

/// Couples a surface to a region along the surface's columns. The region
/// voxel at level `l` pairs with surface level `l - shift`.
///
/// `Inside`: a region voxel is object only if the surface reaches its
/// paired level; above the surface's range the voxel is forced background.
/// `Enclose`: every voxel whose paired level the surface reaches is object.
pub fn link_surface_region(g: &mut GridGraph, frame: &SurfaceFrame, region_sub: usize, link: &LinkDesc) {
    let shift = link.shift as isize;
    for c in frame.orient.columns() {
        for l in 0..frame.n_levels() {
            let r = frame.region_node(g, region_sub, c, l);
            let target = frame.clamp_low(l as isize - shift);
            match (link.kind, target) {
                (LinkKind::Inside, Some(t)) => {
                    let v = frame.node(g, c, t);
                    g.append_arc(r, v, INF_CAP, 0);
                }
                (LinkKind::Inside, None) => g.add_tweights(r, 0, INF_CAP),
                (LinkKind::Enclose, Some(t)) => {
                    let v = frame.node(g, c, t);
                    g.append_arc(v, r, INF_CAP, 0);
                }
                (LinkKind::Enclose, None) => {}
            }
        }
    }
}

/// Symmetric per-voxel arcs between two region subgraphs: a voxel that is
/// object in exactly one of them pays the context cost from channel `ch`.
pub fn link_regions(g: &mut GridGraph, sub0: usize, sub1: usize, ctx: &CostVol, ch: usize) {
    for z in 0..ctx.d {
        for y in 0..ctx.h {
            for x in 0..ctx.w {
                let w = ctx.get(x, y, z, ch);
                if w > 0 {
                    let u = g.index(&[sub0, x, y, z]);
                    let v = g.index(&[sub1, x, y, z]);
                    g.append_arc(u, v, w, w);
                }
            }
        }
    }
}
