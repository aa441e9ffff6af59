//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Signature store (per-limiter counter state)
//! - Rate limiter (admission decisions, stats, sweeps)
//! - Limiter registry (category routing)
//! - Sweeper (periodic cleanup)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod store;
pub mod sweeper;
