//! Domain layer - pure business logic with no external dependencies.
//!
//! This layer contains the core concepts and invariants of the admission gate:
//! - Error signature derivation (grouping)
//! - Per-signature window counters
//! - The admission policy (window, ceiling, cooldown)
//! - Status and statistics views
//!
//! All types in this layer are pure and easily testable.

pub mod counter;
pub mod policy;
pub mod signature;
pub mod status;
