/// Dense multi-channel volume.
///
/// Layout is z-plane, then row y, then column x, then channel, so a single
/// channel of a `d == 1` volume is laid out exactly like a 2-D image.
#[derive(Debug, Clone, PartialEq)]
pub struct Vol<T> {
    pub w: usize,
    pub h: usize,
    pub d: usize,
    pub n_ch: usize,
    pub arr: Vec<T>,
}

// Constructor
// -----------------------------------------------------------------------------
impl<T: Copy + Default> Vol<T> {
    pub fn new(w: usize, h: usize, d: usize, n_ch: usize) -> Self {
        let arr = vec![T::default(); w * h * d * n_ch];
        Self { w, h, d, n_ch, arr }
    }
}

impl<T: Copy> Vol<T> {
    pub fn filled(w: usize, h: usize, d: usize, n_ch: usize, v: T) -> Self {
        let arr = vec![v; w * h * d * n_ch];
        Self { w, h, d, n_ch, arr }
    }

    pub fn from_arr(w: usize, h: usize, d: usize, n_ch: usize, arr: Vec<T>) -> Self {
        assert_eq!(arr.len(), w * h * d * n_ch, "arr length does not match dims");
        Self { w, h, d, n_ch, arr }
    }

    /// Builds a volume by evaluating `f(x, y, z, ch)` at every element.
    pub fn from_fn(
        w: usize,
        h: usize,
        d: usize,
        n_ch: usize,
        mut f: impl FnMut(usize, usize, usize, usize) -> T,
    ) -> Self {
        let mut arr = Vec::with_capacity(w * h * d * n_ch);
        for z in 0..d {
            for y in 0..h {
                for x in 0..w {
                    for ch in 0..n_ch {
                        arr.push(f(x, y, z, ch));
                    }
                }
            }
        }
        Self { w, h, d, n_ch, arr }
    }

    #[inline(always)]
    pub fn get(&self, x: usize, y: usize, z: usize, ch: usize) -> T {
        self.arr[self.idx(x, y, z, ch)]
    }

    #[inline(always)]
    pub fn set(&mut self, x: usize, y: usize, z: usize, ch: usize, v: T) {
        let i = self.idx(x, y, z, ch);
        self.arr[i] = v;
    }

    #[inline(always)]
    pub fn get_xyz(&self, xyz: [usize; 3], ch: usize) -> T {
        self.get(xyz[0], xyz[1], xyz[2], ch)
    }
}

impl<T> Vol<T> {
    #[inline(always)]
    pub fn idx(&self, x: usize, y: usize, z: usize, ch: usize) -> usize {
        debug_assert!(x < self.w && y < self.h && z < self.d && ch < self.n_ch);
        ((z * self.h + y) * self.w + x) * self.n_ch + ch
    }

    /// Spatial extent `[w, h, d]`.
    pub fn extent(&self) -> [usize; 3] {
        [self.w, self.h, self.d]
    }

    pub fn n_voxels(&self) -> usize {
        self.w * self.h * self.d
    }
}

pub type CostVol = Vol<i64>;
pub type IntensityVol = Vol<f32>;

/// 255 where the voxel is labelled object, one channel per region.
pub type MaskVol = Vol<u8>;

/// Per-column surface heights: `w x h` columns, `d == 1`, one channel.
pub type HeightMap = Vol<i32>;

impl HeightMap {
    pub fn height(&self, c0: usize, c1: usize) -> i32 {
        self.get(c0, c1, 0, 0)
    }
}
