// Library crate root.
//
// This crate is used both as a binary (src/main.rs) and as a library.
// Keeping modules here prevents "dead_code" warnings for public APIs that are
// intentionally exported for downstream crates.

pub mod bucket_vec;
pub mod cost;
pub mod desc;
pub mod error;
pub mod frame;
pub mod graph;
pub mod inter_surface;
pub mod link;
pub mod observe;
pub mod orient;
pub mod pseudoflow;
pub mod push_relabel;
pub mod region;
pub mod seg;
pub mod smooth;
pub mod vol;

#[cfg(test)]
pub mod test_helpers;
