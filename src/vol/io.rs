use super::core::{HeightMap, MaskVol};
use image::ImageResult;
use std::path::Path;

// Helpers
// -----------------------------------------------------------------------------
fn dim_mismatch_err() -> image::ImageError {
    image::ImageError::Parameter(image::error::ParameterError::from_kind(
        image::error::ParameterErrorKind::DimensionMismatch,
    ))
}

// PNG export
// -----------------------------------------------------------------------------
impl HeightMap {
    /// Saves the heights as a 16-bit grey PNG. Heights are clamped to `0..=u16::MAX`.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        if self.d != 1 || self.n_ch != 1 {
            return Err(dim_mismatch_err());
        }
        let raw: Vec<u16> = self
            .arr
            .iter()
            .map(|&v| v.clamp(0, u16::MAX as i32) as u16)
            .collect();

        let img = image::ImageBuffer::<image::Luma<u16>, _>::from_raw(self.w as u32, self.h as u32, raw)
            .ok_or_else(dim_mismatch_err)?;

        img.save_with_format(path, image::ImageFormat::Png)
    }
}

impl MaskVol {
    /// Saves one z-slice of one region channel as an 8-bit grey PNG.
    pub fn save_slice_png<P: AsRef<Path>>(&self, z: usize, ch: usize, path: P) -> ImageResult<()> {
        if z >= self.d || ch >= self.n_ch {
            return Err(dim_mismatch_err());
        }
        let mut raw: Vec<u8> = Vec::with_capacity(self.w * self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                raw.push(self.get(x, y, z, ch));
            }
        }

        let img = image::GrayImage::from_raw(self.w as u32, self.h as u32, raw)
            .ok_or_else(dim_mismatch_err)?;

        img.save_with_format(path, image::ImageFormat::Png)
    }
}
