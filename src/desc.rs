use crate::orient::ScanDir;
use serde::{Deserialize, Serialize};

/// Which maximum-flow solver runs on the composite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    #[default]
    PushRelabel,
    Pseudoflow,
}

/// A value that is either the same for every column or given per column
/// (first column axis fastest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PerColumn<T> {
    Uniform(T),
    Table(Vec<T>),
}

impl<T: Copy> PerColumn<T> {
    #[inline]
    pub fn at(&self, col_i: usize) -> T {
        match self {
            PerColumn::Uniform(v) => *v,
            PerColumn::Table(vs) => vs[col_i],
        }
    }

    /// `None` when the table length matches `n_columns`, else the actual length.
    pub fn bad_len(&self, n_columns: usize) -> Option<usize> {
        match self {
            PerColumn::Uniform(_) => None,
            PerColumn::Table(vs) if vs.len() == n_columns => None,
            PerColumn::Table(vs) => Some(vs.len()),
        }
    }
}

impl<T: Default> Default for PerColumn<T> {
    fn default() -> Self {
        PerColumn::Uniform(T::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegDesc {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Volume extent `[w, h, d]` shared by every subgraph.
    pub extent: [usize; 3],
    #[serde(default)]
    pub surfaces: Vec<SurfaceDesc>,
    #[serde(default)]
    pub relations: Vec<RelationDesc>,
    #[serde(default)]
    pub regions: Vec<RegionDesc>,
    #[serde(default)]
    pub links: Vec<LinkDesc>,
    #[serde(default)]
    pub contexts: Vec<ContextDesc>,
    #[serde(default)]
    pub solver: SolverKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDesc {
    #[serde(default)]
    pub scan_dir: ScanDir,
    /// Optional user narrowing `[lo, hi]` of the feasible levels.
    #[serde(default)]
    pub margin: Option<[i32; 2]>,
    /// Hard smoothness bound per column direction.
    #[serde(default = "default_smooth")]
    pub smooth: [u32; 2],
    #[serde(default)]
    pub circular: [bool; 2],
    #[serde(default)]
    pub prior: Option<ShapePriorDesc>,
}

impl Default for SurfaceDesc {
    fn default() -> Self {
        Self {
            scan_dir: ScanDir::default(),
            margin: None,
            smooth: default_smooth(),
            circular: [false, false],
            prior: None,
        }
    }
}

/// Convex shape prior. A direction with a prior ignores the hard bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapePriorDesc {
    #[serde(default = "default_convexity")]
    pub p: f64,
    #[serde(default)]
    pub dirs: [Option<PriorDirDesc>; 2],
}

/// Expected offset `h(c+e) - h(c)` of the neighbouring column and the
/// tolerated deviation above (`up`) and below (`low`) it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorDirDesc {
    #[serde(default)]
    pub mean: PerColumn<i32>,
    pub up: PerColumn<u32>,
    pub low: PerColumn<u32>,
    #[serde(default = "default_coef")]
    pub fwd: PerColumn<f64>,
    #[serde(default = "default_coef")]
    pub bwd: PerColumn<f64>,
}

/// `r0 <= h(k1) - h(k0) <= r1` at every column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDesc {
    pub k0: usize,
    pub k1: usize,
    pub r0: i32,
    pub r1: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionDesc {
    #[serde(default)]
    pub boundary_coef: f64,
    #[serde(default = "default_bandwidth")]
    pub bandwidth: f64,
}

impl Default for RegionDesc {
    fn default() -> Self {
        Self {
            boundary_coef: 0.0,
            bandwidth: default_bandwidth(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Region voxels lie at or below the shifted surface.
    #[default]
    Inside,
    /// Every voxel at or below the shifted surface belongs to the region.
    Enclose,
}

/// Couples surface `surface` to region `region` along the surface's columns.
/// The region voxel at level `l` pairs with the surface level `l - shift`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDesc {
    pub surface: usize,
    pub region: usize,
    #[serde(default)]
    pub shift: i32,
    #[serde(default)]
    pub kind: LinkKind,
}

/// Couples two regions through a per-voxel context cost. The costs live in
/// the context volume channel with the same index as this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDesc {
    pub r0: usize,
    pub r1: usize,
}

pub const DEFAULT_BANDWIDTH: f64 = 1.0;

fn default_version() -> u32 {
    1
}

fn default_smooth() -> [u32; 2] {
    [1, 1]
}

fn default_convexity() -> f64 {
    2.0
}

fn default_coef() -> PerColumn<f64> {
    PerColumn::Uniform(1.0)
}

fn default_bandwidth() -> f64 {
    DEFAULT_BANDWIDTH
}

pub fn parse_seg_json(json_text: &str) -> Result<SegDesc, serde_json::Error> {
    serde_json::from_str(json_text)
}
