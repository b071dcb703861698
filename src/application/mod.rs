//! Application layer containing the payout orchestration.
//!
//! `PayoutService` drives the payout state machine and settlement;
//! `worker` runs the deferred auto-processing jobs it schedules on tokio tasks.

pub mod service;
pub mod worker;
