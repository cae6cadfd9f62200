use crate::desc::SurfaceDesc;
use crate::graph::GridGraph;
use crate::orient::Orientation;

/// A surface subgraph as the builders see it: which lattice slab it owns,
/// how its columns map onto the volume, and its feasible levels `lo..=hi`.
///
/// Only nodes at feasible levels carry arcs; the level `lo` of every column
/// is that column's base.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceFrame<'a> {
    pub sub: usize,
    pub orient: Orientation,
    pub lo: usize,
    pub hi: usize,
    pub desc: &'a SurfaceDesc,
}

impl SurfaceFrame<'_> {
    #[inline]
    pub fn node(&self, g: &GridGraph, c: [usize; 2], l: usize) -> usize {
        debug_assert!(l >= self.lo && l <= self.hi, "level {l} outside [{}, {}]", self.lo, self.hi);
        let [x, y, z] = self.orient.to_xyz(c, l);
        g.index(&[self.sub, x, y, z])
    }

    /// Node of the region subgraph `region_sub` at this frame's (column, level).
    #[inline]
    pub fn region_node(&self, g: &GridGraph, region_sub: usize, c: [usize; 2], l: usize) -> usize {
        let [x, y, z] = self.orient.to_xyz(c, l);
        g.index(&[region_sub, x, y, z])
    }

    pub fn n_levels(&self) -> usize {
        self.orient.n_levels()
    }

    /// Clamps a signed level into the feasible range. `None` above `hi`.
    #[inline]
    pub fn clamp_low(&self, l: isize) -> Option<usize> {
        if l > self.hi as isize {
            None
        } else {
            Some(l.max(self.lo as isize) as usize)
        }
    }
}
