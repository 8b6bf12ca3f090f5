//! Metrics export.
//!
//! Revocation check outcomes are counted and pushed to a Prometheus Push
//! Gateway when enabled.
//!
//! # Submodules
//!
//! - `prom` - Prometheus metrics integration

pub mod prom;
