use cosurf::desc::parse_seg_json;
use cosurf::seg::{SegInputs, segment};
use cosurf::vol::{CostVol, Vol};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TEST_JSON: &str = r#"
    {
        "version": 1,
        "extent": [24, 1, 16],
        "surfaces": [
            { "scan_dir": "pos_z", "smooth": [1, 1] },
            {
                "scan_dir": "pos_z",
                "prior": {
                    "p": 2.0,
                    "dirs": [ { "mean": 0, "up": 2, "low": 2, "fwd": 2.0, "bwd": 2.0 }, null ]
                }
            }
        ],
        "relations": [
            { "k0": 1, "k1": 0, "r0": -8, "r1": -3 }
        ],
        "regions": [ { "boundary_coef": 0.0 } ],
        "links": [ { "surface": 0, "region": 0, "shift": 0, "kind": "inside" } ],
        "solver": "push_relabel"
    }
"#;

/// Two noisy layers: a sine-shaped lower boundary and a flatter one above.
fn synthetic_costs(w: usize, d: usize) -> CostVol {
    let lower = |x: usize| 4.0 + 2.5 * (x as f64 * 0.4).sin();
    let upper = |x: usize| 11.0 + 1.0 * (x as f64 * 0.25).cos();
    Vol::from_fn(w, 1, d, 2, |x, _, z, k| {
        let target = if k == 0 { lower(x) } else { upper(x) };
        let noise = ((x * 7 + z * 13 + k * 3) % 5) as f64 - 2.0;
        (8.0 * (z as f64 - target).abs() + noise).round() as i64
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let desc = parse_seg_json(TEST_JSON).expect("Failed to parse seg JSON");
    let [w, h, d] = desc.extent;

    let surface_costs = synthetic_costs(w, d);
    let obj_costs: CostVol = Vol::filled(w, h, d, 1, 0);
    let bkg_costs: CostVol = Vol::filled(w, h, d, 1, 2);
    let inputs = SegInputs {
        surface_costs: Some(&surface_costs),
        obj_costs: Some(&obj_costs),
        bkg_costs: Some(&bkg_costs),
        ..Default::default()
    };

    let out = segment(&desc, inputs).expect("segmentation failed");
    info!(flow = out.flow, "done");

    // Print the volume's single y-slice, top row first.
    for z in (0..d).rev() {
        let row: String = (0..w)
            .map(|x| {
                if out.heights[1].height(x, 0) as usize == z {
                    '='
                } else if out.heights[0].height(x, 0) as usize == z {
                    '-'
                } else if out.masks.get(x, 0, z, 0) != 0 {
                    '#'
                } else {
                    '.'
                }
            })
            .collect();
        println!("{row}");
    }

    #[cfg(feature = "vol-io")]
    {
        for (k, hm) in out.heights.iter().enumerate() {
            let path = format!("surface_{k}.png");
            if let Err(e) = hm.save_png(&path) {
                eprintln!("Failed to write {path}: {e}");
            }
        }
        if let Err(e) = out.masks.save_slice_png(0, 0, "region_0.png") {
            eprintln!("Failed to write region_0.png: {e}");
        }
    }
}
