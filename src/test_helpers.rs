use crate::graph::{Cap, GridGraph};
use crate::vol::{CostVol, HeightMap, MaskVol, Vol};

/// Column-major cost volume for one surface scanned along +z: every row of
/// `grid` is one x-column of a `w x 1 x d` volume, written bottom (z = 0)
/// to top, one digit per level.
pub fn costs_from_ascii(grid: &str) -> CostVol {
    let rows: Vec<&str> = grid.lines().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();

    let w = rows.len();
    assert!(w > 0, "grid must have at least one non-empty row");
    let d = rows[0].len();
    for r in &rows {
        assert_eq!(r.len(), d, "all rows must have equal length");
    }

    Vol::from_fn(w, 1, d, 1, |x, _, z, _| {
        let ch = rows[x].as_bytes()[z] as char;
        ch.to_digit(10)
            .unwrap_or_else(|| panic!("invalid cost char '{ch}', expected digit")) as i64
    })
}

/// One digit per column, first column axis along the row.
pub fn heights_to_ascii(hm: &HeightMap) -> String {
    let mut out = String::new();
    for y in 0..hm.h {
        for x in 0..hm.w {
            let v = hm.get(x, y, 0, 0);
            let ch = match v {
                0..=9 => (b'0' + v as u8) as char,
                10..=35 => (b'A' + (v - 10) as u8) as char,
                _ => '*',
            };
            out.push(ch);
        }
        out.push('\n');
    }
    out
}

/// `#` for object, `.` for background, one z-slice of one channel.
pub fn mask_to_ascii(mask: &MaskVol, z: usize, ch: usize) -> String {
    let mut out = String::new();
    for y in 0..mask.h {
        for x in 0..mask.w {
            out.push(if mask.get(x, y, z, ch) != 0 { '#' } else { '.' });
        }
        out.push('\n');
    }
    out
}

/// Rank-1 graph with `n` nodes. Terminal pairs and arc endpoints past `n`
/// wrap around.
pub fn random_graph(n: usize, tweights: &[(Cap, Cap)], arcs: &[(usize, usize, Cap, Cap)]) -> GridGraph {
    let mut g = GridGraph::new(&[n]);
    for (u, &(s, t)) in tweights.iter().take(n).enumerate() {
        g.add_tweights(u, s, t);
    }
    for &(u, v, cap, rev) in arcs {
        g.append_arc(u % n, v % n, cap, rev);
    }
    g.finalize();
    g
}

/// Cut capacity of an arbitrary partition, `flow_offset` included.
pub fn cut_value_of(g: &GridGraph, side: &[bool]) -> Cap {
    let mut total = g.flow_offset();
    for u in 0..g.n_nodes() {
        let t = g.tcap(u);
        if side[u] {
            total += (-t).max(0);
            for a in g.slots(u) {
                if !side[g.head(a)] {
                    total += g.cap(a);
                }
            }
        } else {
            total += t.max(0);
        }
    }
    total
}

/// Minimum over every partition. Only for a handful of nodes.
pub fn brute_force_min_cut(g: &GridGraph) -> Cap {
    let n = g.n_nodes();
    assert!(n <= 16, "brute force over {n} nodes");
    let mut best = Cap::MAX;
    let mut side = vec![false; n];
    for bits in 0u32..(1 << n) {
        for (u, s) in side.iter_mut().enumerate() {
            *s = bits & (1 << u) != 0;
        }
        best = best.min(cut_value_of(g, &side));
    }
    best
}

/// Net flow leaving `u` along arcs, read from the residuals.
pub fn net_outflow(g: &GridGraph, u: usize) -> Cap {
    g.slots(u).map(|a| g.cap(a) - g.residual(a)).sum()
}
