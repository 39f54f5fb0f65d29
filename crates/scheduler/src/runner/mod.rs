//! Scheduler runner -- owns the worker pool and the shared pipeline state.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, construction, producer/consumer API, shutdown
//! - `execution`: the per-worker claim / render / publish loop

mod core;
mod execution;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
