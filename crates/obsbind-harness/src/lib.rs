#![forbid(unsafe_code)]

//! Deterministic fixtures for exercising bindings without a host runtime.
//!
//! - [`ProbeProducer`]: a push producer that counts subscribe and teardown
//!   calls, and can be told to ignore teardown ("leaky") to reproduce
//!   producers that keep calling after cancellation.
//! - [`TickQueue`]: a manual clock; [`TickQueue::delayed`] builds producers
//!   that emit after a number of ticks.
//! - [`TestRecord`] / [`TestQuery`]: in-memory reactive record and query.
//! - [`EventLog`]: an observer that writes every notification down.

pub mod fixtures;
pub mod log;
pub mod probe;
pub mod tick;

pub use fixtures::{TestQuery, TestRecord};
pub use log::{Event, EventLog};
pub use probe::ProbeProducer;
pub use tick::{Delayed, TickQueue};
