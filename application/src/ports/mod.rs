//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod backend_transport;
pub mod plan_generator;
pub mod progress;
pub mod run_logger;
