//! Sample task bodies served by the HTTP layer.
//!
//! - [`HeavyTask`]: sleeps for a requested or random duration and fails on
//!   round numbers
//! - [`BigTask`]: POSTs a product to a remote endpoint and relays the JSON reply

pub mod big;
pub mod heavy;

pub use big::BigTask;
pub use heavy::HeavyTask;
