//! Builds the composite graph for a segmentation request, runs one solver
//! and reads surfaces and regions back out of the cut.
//!
//! Lattice layout is `[n_surfaces + n_regions, w, h, d]`: surfaces first,
//! then regions, every subgraph in volume coordinates.

use crate::cost::{apply_cost_transform, translate_surfaces};
use crate::desc::{PerColumn, SegDesc, SolverKind, SurfaceDesc};
use crate::error::{ConfigError, SegError, SegResult};
use crate::frame::SurfaceFrame;
use crate::graph::{Cap, GridGraph};
use crate::inter_surface::{build_relation_arcs, propagate_margins, validate_relation};
use crate::link::{link_regions, link_surface_region};
use crate::observe::{SolveObserver, SolveStats, Stage, TracingObserver};
use crate::orient::Orientation;
use crate::region::{boundary_weights, build_boundary_terms, build_region_terms};
use crate::smooth::build_surface_arcs;
use crate::vol::{CostVol, HeightMap, IntensityVol, MaskVol, Vol};
use crate::{pseudoflow, push_relabel};

/// Borrowed input volumes. Each is required only when the request uses it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegInputs<'a> {
    /// One channel per surface, cost of the surface passing through a voxel.
    pub surface_costs: Option<&'a CostVol>,
    /// One channel per region.
    pub obj_costs: Option<&'a CostVol>,
    pub bkg_costs: Option<&'a CostVol>,
    /// One channel per region; only needed by regions with a boundary term.
    pub intensity: Option<&'a IntensityVol>,
    /// One channel per context relation.
    pub context_costs: Option<&'a CostVol>,
}

#[derive(Debug, Clone)]
pub struct SegOutput {
    /// Per surface, the scan-axis coordinate of the surface at each column.
    pub heights: Vec<HeightMap>,
    /// One channel per region, 255 for object.
    pub masks: MaskVol,
    pub flow: Cap,
    pub stats: SolveStats,
    /// Feasible `(lo, hi)` level range of each surface after propagation.
    pub margins: Vec<(i32, i32)>,
}

/// Validates, builds, solves and decodes with the request's solver.
pub fn solve(desc: &SegDesc, inputs: SegInputs, observer: &mut dyn SolveObserver) -> SegResult<SegOutput> {
    let mut seg = Segmenter::new(desc, inputs, observer)?;
    seg.build(observer)?;
    let (flow, stats) = seg.run(desc.solver, observer)?;
    let (heights, masks) = seg.decode()?;
    observer.on_stage(Stage::Decode, seg.graph().n_arcs());
    Ok(SegOutput {
        heights,
        masks,
        flow,
        stats,
        margins: seg.margins,
    })
}

/// `solve` reporting through `tracing`.
pub fn segment(desc: &SegDesc, inputs: SegInputs) -> SegResult<SegOutput> {
    solve(desc, inputs, &mut TracingObserver)
}

pub struct Segmenter<'a> {
    desc: &'a SegDesc,
    inputs: SegInputs<'a>,
    margins: Vec<(i32, i32)>,
    graph: GridGraph,
    solved: bool,
}

impl<'a> Segmenter<'a> {
    /// Checks the whole request and propagates surface margins. Nothing is
    /// allocated for arcs until `build`.
    pub fn new(desc: &'a SegDesc, inputs: SegInputs<'a>, observer: &mut dyn SolveObserver) -> SegResult<Self> {
        let margins = validate(desc, &inputs)?;
        for (k, &(lo, hi)) in margins.iter().enumerate() {
            observer.on_margins(k, lo, hi);
        }
        let [w, h, d] = desc.extent;
        let n_subs = desc.surfaces.len() + desc.regions.len();
        Ok(Self {
            desc,
            inputs,
            margins,
            graph: GridGraph::new(&[n_subs, w, h, d]),
            solved: false,
        })
    }

    pub fn margins(&self) -> &[(i32, i32)] {
        &self.margins
    }

    pub fn graph(&self) -> &GridGraph {
        &self.graph
    }

    fn frames(&self) -> Vec<SurfaceFrame<'a>> {
        let desc: &'a SegDesc = self.desc;
        desc.surfaces
            .iter()
            .zip(&self.margins)
            .enumerate()
            .map(|(k, (s, &(lo, hi)))| SurfaceFrame {
                sub: k,
                orient: Orientation::new(s.scan_dir, desc.extent),
                lo: lo as usize,
                hi: hi as usize,
                desc: s,
            })
            .collect()
    }

    /// Appends every arc of the request and finalizes the graph. Any earlier
    /// build or solution is discarded.
    pub fn build(&mut self, observer: &mut dyn SolveObserver) -> SegResult<()> {
        let desc = self.desc;
        let inputs = self.inputs;
        let frames = self.frames();
        let n_surfaces = frames.len();
        self.solved = false;
        let g = &mut self.graph;
        g.clear_arcs();

        if n_surfaces > 0 {
            let costs = required(inputs.surface_costs, "surface costs")?;
            for (k, frame) in frames.iter().enumerate() {
                apply_cost_transform(g, frame, costs, k);
            }
        }
        observer.on_stage(Stage::Costs, g.n_staged());

        for frame in &frames {
            build_surface_arcs(g, frame);
        }
        observer.on_stage(Stage::Smoothness, g.n_staged());

        for rel in &desc.relations {
            build_relation_arcs(g, &frames[rel.k0], &frames[rel.k1], rel);
        }
        observer.on_stage(Stage::Relations, g.n_staged());

        if !desc.regions.is_empty() {
            let obj = required(inputs.obj_costs, "object costs")?;
            let bkg = required(inputs.bkg_costs, "background costs")?;
            for (r, region) in desc.regions.iter().enumerate() {
                let sub = n_surfaces + r;
                build_region_terms(g, sub, r, obj, bkg);
                if region.boundary_coef > 0.0 {
                    let intensity = required(inputs.intensity, "intensity")?;
                    let weights = boundary_weights(intensity, r, region);
                    build_boundary_terms(g, sub, desc.extent, &weights);
                }
            }
        }
        observer.on_stage(Stage::Regions, g.n_staged());

        for link in &desc.links {
            link_surface_region(g, &frames[link.surface], n_surfaces + link.region, link);
        }
        if !desc.contexts.is_empty() {
            let ctx = required(inputs.context_costs, "context costs")?;
            for (i, c) in desc.contexts.iter().enumerate() {
                link_regions(g, n_surfaces + c.r0, n_surfaces + c.r1, ctx, i);
            }
        }
        observer.on_stage(Stage::Links, g.n_staged());

        if n_surfaces > 0 {
            translate_surfaces(g, &frames);
        }
        g.finalize();
        observer.on_stage(Stage::Finalize, g.n_arcs());
        Ok(())
    }

    /// Runs `kind` on the built graph. Returns the maximum flow value.
    pub fn run(&mut self, kind: SolverKind, observer: &mut dyn SolveObserver) -> SegResult<(Cap, SolveStats)> {
        if !self.graph.is_finalized() {
            return Err(SegError::Precondition("build must run before the solver".into()));
        }
        let (flow, stats) = match kind {
            SolverKind::PushRelabel => push_relabel::solve(&mut self.graph)?,
            SolverKind::Pseudoflow => pseudoflow::solve(&mut self.graph)?,
        };
        self.solved = true;
        observer.on_stage(Stage::Solve, self.graph.n_arcs());
        observer.on_solved(kind, flow, &stats);
        Ok((flow, stats))
    }

    /// Height maps and region masks of the current cut.
    pub fn decode(&self) -> SegResult<(Vec<HeightMap>, MaskVol)> {
        let [w, h, d] = self.desc.extent;
        let mut heights: Vec<HeightMap> = self
            .frames()
            .iter()
            .map(|f| {
                let [n0, n1] = f.orient.n_cols();
                HeightMap::new(n0, n1, 1, 1)
            })
            .collect();
        let mut masks = MaskVol::new(w, h, d, self.desc.regions.len());
        self.decode_into(&mut heights, &mut masks)?;
        Ok((heights, masks))
    }

    /// Writes the current cut into caller-owned outputs, which must match
    /// the request's shapes.
    pub fn decode_into(&self, heights: &mut [HeightMap], masks: &mut MaskVol) -> SegResult<()> {
        if !self.solved {
            return Err(SegError::Precondition("decode needs a solved graph".into()));
        }
        let frames = self.frames();
        if heights.len() != frames.len() {
            return Err(SegError::Precondition(format!(
                "expected {} height maps, got {}",
                frames.len(),
                heights.len()
            )));
        }
        let [w, h, d] = self.desc.extent;
        if masks.extent() != [w, h, d] || masks.n_ch != self.desc.regions.len() {
            return Err(SegError::Precondition(format!(
                "mask volume is {}x{}x{}x{}, expected {w}x{h}x{d}x{}",
                masks.w,
                masks.h,
                masks.d,
                masks.n_ch,
                self.desc.regions.len()
            )));
        }

        let g = &self.graph;
        for (frame, hm) in frames.iter().zip(heights.iter_mut()) {
            let [n0, n1] = frame.orient.n_cols();
            if hm.extent() != [n0, n1, 1] || hm.n_ch != 1 {
                return Err(SegError::Precondition(format!(
                    "height map for surface {} must be {n0}x{n1}",
                    frame.sub
                )));
            }
            for c in frame.orient.columns() {
                let level = (frame.lo..=frame.hi)
                    .rev()
                    .find(|&l| g.is_source_side(frame.node(g, c, l)))
                    .ok_or(SegError::Infeasible {
                        surface: frame.sub,
                        column: c,
                    })?;
                hm.set(c[0], c[1], 0, 0, frame.orient.level_to_axis(level) as i32);
            }
        }

        let n_surfaces = frames.len();
        for r in 0..self.desc.regions.len() {
            for z in 0..d {
                for y in 0..h {
                    for x in 0..w {
                        let object = g.is_source_side(g.index(&[n_surfaces + r, x, y, z]));
                        masks.set(x, y, z, r, if object { 255 } else { 0 });
                    }
                }
            }
        }
        Ok(())
    }
}

fn required<'v, T>(v: Option<&'v T>, what: &'static str) -> Result<&'v T, ConfigError> {
    v.ok_or(ConfigError::MissingInput(what))
}

// Validation
// -----------------------------------------------------------------------------

fn check_vol<T>(what: &'static str, v: &Vol<T>, extent: [usize; 3], n_ch: usize) -> Result<(), ConfigError> {
    if v.extent() == extent && v.n_ch == n_ch {
        return Ok(());
    }
    let [w, h, d] = extent;
    Err(ConfigError::SizeMismatch {
        what,
        expected: format!("{w}x{h}x{d}x{n_ch}"),
        actual: format!("{}x{}x{}x{}", v.w, v.h, v.d, v.n_ch),
    })
}

fn check_table<T: Copy>(
    surface: usize,
    name: &str,
    table: &PerColumn<T>,
    n_columns: usize,
) -> Result<(), ConfigError> {
    match table.bad_len(n_columns) {
        None => Ok(()),
        Some(len) => Err(ConfigError::BadSurface {
            surface,
            reason: format!("{name} has {len} entries for {n_columns} columns"),
        }),
    }
}

fn check_coefs(surface: usize, name: &str, table: &PerColumn<f64>) -> Result<(), ConfigError> {
    let ok = |v: f64| v.is_finite() && v >= 0.0;
    let all_ok = match table {
        PerColumn::Uniform(v) => ok(*v),
        PerColumn::Table(vs) => vs.iter().all(|&v| ok(v)),
    };
    if all_ok {
        Ok(())
    } else {
        Err(ConfigError::BadSurface {
            surface,
            reason: format!("{name} coefficients must be finite and non-negative"),
        })
    }
}

/// Initial `(lo, hi)` of one surface.
fn check_surface(k: usize, s: &SurfaceDesc, extent: [usize; 3]) -> Result<(i32, i32), ConfigError> {
    let orient = Orientation::new(s.scan_dir, extent);
    let top = orient.n_levels() as i32 - 1;
    let [lo, hi] = s.margin.unwrap_or([0, top]);
    if lo < 0 || hi > top || lo > hi {
        return Err(ConfigError::BadSurface {
            surface: k,
            reason: format!("margin [{lo}, {hi}] outside [0, {top}]"),
        });
    }

    if let Some(prior) = &s.prior {
        if !prior.p.is_finite() || prior.p < 1.0 {
            return Err(ConfigError::BadSurface {
                surface: k,
                reason: format!("convexity exponent {} must be at least 1", prior.p),
            });
        }
        let n_columns = orient.n_columns();
        for dir in prior.dirs.iter().flatten() {
            check_table(k, "mean", &dir.mean, n_columns)?;
            check_table(k, "up", &dir.up, n_columns)?;
            check_table(k, "low", &dir.low, n_columns)?;
            check_table(k, "fwd", &dir.fwd, n_columns)?;
            check_table(k, "bwd", &dir.bwd, n_columns)?;
            check_coefs(k, "fwd", &dir.fwd)?;
            check_coefs(k, "bwd", &dir.bwd)?;
        }
    }
    Ok((lo, hi))
}

/// Every configuration check, before any arc exists. Returns the
/// propagated margins.
fn validate(desc: &SegDesc, inputs: &SegInputs) -> Result<Vec<(i32, i32)>, ConfigError> {
    let extent = desc.extent;
    let [w, h, d] = extent;
    if w == 0 || h == 0 || d == 0 {
        return Err(ConfigError::EmptyExtent { w, h, d });
    }
    let n_surfaces = desc.surfaces.len();
    let n_regions = desc.regions.len();
    if n_surfaces + n_regions == 0 {
        return Err(ConfigError::NothingToSolve);
    }

    let mut initial = Vec::with_capacity(n_surfaces);
    if n_surfaces > 0 {
        check_vol("surface costs", required(inputs.surface_costs, "surface costs")?, extent, n_surfaces)?;
        for (k, s) in desc.surfaces.iter().enumerate() {
            initial.push(check_surface(k, s, extent)?);
        }
    }

    for rel in &desc.relations {
        validate_relation(rel, n_surfaces)?;
        if desc.surfaces[rel.k0].scan_dir != desc.surfaces[rel.k1].scan_dir {
            return Err(ConfigError::RelationDirectionMismatch { k0: rel.k0, k1: rel.k1 });
        }
    }

    if n_regions > 0 {
        check_vol("object costs", required(inputs.obj_costs, "object costs")?, extent, n_regions)?;
        check_vol("background costs", required(inputs.bkg_costs, "background costs")?, extent, n_regions)?;
        for (r, region) in desc.regions.iter().enumerate() {
            if !region.boundary_coef.is_finite() || region.boundary_coef < 0.0 {
                return Err(ConfigError::BadRegion {
                    region: r,
                    reason: "boundary coefficient must be finite and non-negative".into(),
                });
            }
            if !region.bandwidth.is_finite() || region.bandwidth <= 0.0 {
                return Err(ConfigError::BadRegion {
                    region: r,
                    reason: "bandwidth must be positive".into(),
                });
            }
        }
        if desc.regions.iter().any(|r| r.boundary_coef > 0.0) {
            check_vol("intensity", required(inputs.intensity, "intensity")?, extent, n_regions)?;
        }
    }

    for link in &desc.links {
        if link.surface >= n_surfaces {
            return Err(ConfigError::IndexOutOfRange {
                what: "link surface",
                index: link.surface,
                count: n_surfaces,
            });
        }
        if link.region >= n_regions {
            return Err(ConfigError::IndexOutOfRange {
                what: "link region",
                index: link.region,
                count: n_regions,
            });
        }
    }

    if !desc.contexts.is_empty() {
        for c in &desc.contexts {
            for r in [c.r0, c.r1] {
                if r >= n_regions {
                    return Err(ConfigError::IndexOutOfRange {
                        what: "context region",
                        index: r,
                        count: n_regions,
                    });
                }
            }
            if c.r0 == c.r1 {
                return Err(ConfigError::BadRegion {
                    region: c.r0,
                    reason: "context relation needs two distinct regions".into(),
                });
            }
        }
        let ctx = required(inputs.context_costs, "context costs")?;
        check_vol("context costs", ctx, extent, desc.contexts.len())?;
        if let Some(i) = ctx.arr.iter().position(|&v| v < 0) {
            let ch = i % ctx.n_ch;
            return Err(ConfigError::BadRegion {
                region: desc.contexts[ch].r0,
                reason: format!("negative context cost in channel {ch}"),
            });
        }
    }

    propagate_margins(&initial, &desc.relations)
}
