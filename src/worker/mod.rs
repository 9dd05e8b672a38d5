//! Workers that execute jobs.
//!
//! Each worker loops through two states:
//! - **Idle**: its private job slot is advertised in the registry
//! - **Executing**: it runs exactly one job, sends the result back on the
//!   job's own channel, then becomes idle again
//!
//! A stop signal observed while idle ends the loop for good. See
//! [`Worker`] for the lifecycle and [`crate::scheduler::registry`] for the
//! slot handoff.

pub mod executor;

pub use executor::Worker;
