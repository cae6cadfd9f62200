use serde::{Deserialize, Serialize};

/// Direction in which a surface's columns are scanned.
///
/// The base of every column sits at the low end of the scan axis for `Pos*`
/// and at the high end for `Neg*`. All six directions share one graph
/// construction; only the coordinate mapping below differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanDir {
    PosX,
    NegX,
    PosY,
    NegY,
    #[default]
    PosZ,
    NegZ,
}

impl ScanDir {
    pub const ALL: [ScanDir; 6] = [
        ScanDir::PosX,
        ScanDir::NegX,
        ScanDir::PosY,
        ScanDir::NegY,
        ScanDir::PosZ,
        ScanDir::NegZ,
    ];

    pub fn axis(self) -> usize {
        match self {
            ScanDir::PosX | ScanDir::NegX => 0,
            ScanDir::PosY | ScanDir::NegY => 1,
            ScanDir::PosZ | ScanDir::NegZ => 2,
        }
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, ScanDir::NegX | ScanDir::NegY | ScanDir::NegZ)
    }
}

/// Maps (column, level) in a surface's own frame to volume (x, y, z).
///
/// Column axes are the two volume axes other than the scan axis, in
/// ascending order. Column direction 0 is the first of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
    pub dir: ScanDir,
    col_axes: [usize; 2],
    extent: [usize; 3],
}

impl Orientation {
    pub fn new(dir: ScanDir, extent: [usize; 3]) -> Self {
        let col_axes = match dir.axis() {
            0 => [1, 2],
            1 => [0, 2],
            _ => [0, 1],
        };
        Self {
            dir,
            col_axes,
            extent,
        }
    }

    pub fn col_axes(&self) -> [usize; 2] {
        self.col_axes
    }

    pub fn n_cols(&self) -> [usize; 2] {
        [self.extent[self.col_axes[0]], self.extent[self.col_axes[1]]]
    }

    pub fn n_columns(&self) -> usize {
        let [n0, n1] = self.n_cols();
        n0 * n1
    }

    pub fn n_levels(&self) -> usize {
        self.extent[self.dir.axis()]
    }

    /// Volume coordinate along the scan axis for level `l`.
    #[inline]
    pub fn level_to_axis(&self, l: usize) -> usize {
        if self.dir.is_reversed() {
            self.n_levels() - 1 - l
        } else {
            l
        }
    }

    #[inline]
    pub fn to_xyz(&self, c: [usize; 2], l: usize) -> [usize; 3] {
        let mut xyz = [0usize; 3];
        xyz[self.col_axes[0]] = c[0];
        xyz[self.col_axes[1]] = c[1];
        xyz[self.dir.axis()] = self.level_to_axis(l);
        xyz
    }

    /// Linear column index, first column axis fastest.
    #[inline]
    pub fn col_index(&self, c: [usize; 2]) -> usize {
        c[1] * self.n_cols()[0] + c[0]
    }

    pub fn columns(&self) -> impl Iterator<Item = [usize; 2]> + use<> {
        let [n0, n1] = self.n_cols();
        (0..n1).flat_map(move |c1| (0..n0).map(move |c0| [c0, c1]))
    }

    /// The column one step forward along column direction `dir`, wrapping
    /// when `circular`. `None` past a non-circular boundary, or when the
    /// direction has a single column.
    pub fn neighbor(&self, c: [usize; 2], dir: usize, circular: bool) -> Option<[usize; 2]> {
        let n = self.n_cols()[dir];
        let mut out = c;
        if c[dir] + 1 < n {
            out[dir] = c[dir] + 1;
        } else if circular && n > 2 {
            out[dir] = 0;
        } else {
            return None;
        }
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_direction_maps_levels_onto_its_axis() {
        let extent = [4, 3, 5];
        for dir in ScanDir::ALL {
            let o = Orientation::new(dir, extent);
            assert_eq!(o.n_columns() * o.n_levels(), 60);
            let base = o.to_xyz([0, 0], 0);
            let top = o.to_xyz([0, 0], o.n_levels() - 1);
            let ax = dir.axis();
            if dir.is_reversed() {
                assert_eq!(base[ax], extent[ax] - 1);
                assert_eq!(top[ax], 0);
            } else {
                assert_eq!(base[ax], 0);
                assert_eq!(top[ax], extent[ax] - 1);
            }
        }
    }

    #[test]
    fn y_scan_uses_x_and_z_as_columns() {
        let o = Orientation::new(ScanDir::NegY, [4, 3, 5]);
        assert_eq!(o.n_cols(), [4, 5]);
        assert_eq!(o.to_xyz([2, 4], 0), [2, 2, 4]);
        assert_eq!(o.col_index([2, 4]), 18);
        assert_eq!(o.columns().count(), 20);
    }

    #[test]
    fn neighbor_wraps_only_when_circular() {
        let o = Orientation::new(ScanDir::PosZ, [3, 2, 4]);
        assert_eq!(o.neighbor([2, 0], 0, false), None);
        assert_eq!(o.neighbor([2, 0], 0, true), Some([0, 0]));
        assert_eq!(o.neighbor([0, 0], 1, false), Some([0, 1]));
        // Two columns are already adjacent; wrapping would double the pair.
        assert_eq!(o.neighbor([0, 1], 1, true), None);
    }
}
