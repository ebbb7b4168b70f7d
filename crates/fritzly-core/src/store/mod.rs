// ── Device storage ──
//
// The registry holds the cached records; `reconcile` is the only code
// path that adds or removes entries.

mod reconcile;
mod registry;

pub use reconcile::{CycleReport, reconcile};
pub use registry::{Registry, RegistryEntry};
