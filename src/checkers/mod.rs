//! Invariant checkers (§4.F): pure functions consumed by the linker at the
//! points the spec pins them to. None of these hold state across calls —
//! state that must persist (`dr_vals`, the equivalence tracker) is threaded
//! in and out by the caller.

mod bad_optimization;
mod destroy_map;
mod view_map;

pub use bad_optimization::check_bad_optimizations;
pub use destroy_map::check_destroy_map;
pub use view_map::check_view_map;
