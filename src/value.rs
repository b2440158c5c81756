//! Value & Type contract (§4.A).
//!
//! The engine is agnostic to numeric representation: every variable carries
//! a handle implementing [`ValueType`], and all four guarantees the engine
//! relies on — validity, approximate equality, deep copy, and aliasing —
//! reduce to these primitives. This mirrors how `hydro_lang::ir` keeps its
//! IR generic over the expression representation rather than committing to
//! one concrete AST.

use std::any::Any;
use std::fmt;

/// A boxed, dynamically-typed runtime value. The engine never inspects the
/// concrete type directly; it always goes through the owning variable's
/// [`ValueType`].
pub type Value = Box<dyn Any>;

/// Type contract for a family of runtime values (consumed, §6).
///
/// Implementors own the numeric representation (dense arrays, scalars,
/// opaque handles, ...) and must keep `is_valid`/`equals_approx` reflexive
/// and symmetric. Transitivity of `equals_approx` is *not* required — the
/// engine never chains more than one comparison through it.
pub trait ValueType: fmt::Debug {
    /// A short, stable name used to detect cross-type equivalence-class
    /// violations (§3 invariant: "an equivalence class contains variables
    /// of a single type"). Two [`ValueType`] instances with the same name
    /// are treated as the same logical type.
    fn type_name(&self) -> &str;

    /// Structural/type validity of a candidate value.
    fn is_valid(&self, value: &dyn Any) -> bool;

    /// Element-wise approximate equality, tolerant of floating-point noise.
    fn equals_approx(&self, a: &dyn Any, b: &dyn Any) -> bool;

    /// Produces a value sharing no storage with `value`.
    fn deep_copy(&self, value: &dyn Any) -> Value;

    /// Conservative aliasing predicate: false negatives are forbidden for
    /// dense-array-like values (missing a real alias is a correctness bug;
    /// a spurious "maybe aliased" is merely a missed optimization).
    fn may_share_memory(&self, a: &dyn Any, b: &dyn Any) -> bool;

    /// Human-readable rendering of a value for diagnostics (§4.G). Not
    /// required to round-trip; a default of `"<opaque value>"` is fine for
    /// value types that don't care to implement it.
    fn debug_repr(&self, value: &dyn Any) -> String {
        let _ = value;
        "<opaque value>".to_string()
    }
}
