pub mod core;
#[allow(unused_imports)]
pub use core::{CostVol, HeightMap, IntensityVol, MaskVol, Vol};

// Optional extras
// -----------------------------------------------------------------------------

#[cfg(feature = "vol-io")]
pub mod io;
