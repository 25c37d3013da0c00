//! Load testing engine: replays one HTTP request template across a fixed
//! pool of virtual users and aggregates the outcomes.
//!
//! The core is [`session::Session`], which feeds a bounded job queue into
//! one [`worker::worker_loop`] task per user and drains their outcomes into
//! a [`collector::AggregateReport`]. Configuration, statistics, the terminal
//! summary, and the JSON report are layered around it.

pub mod collector;
pub mod config;
pub mod error;
pub mod expectation;
pub mod metrics;
pub mod pacer;
pub mod progress;
pub mod report;
pub mod request;
pub mod session;
pub mod summary;
pub mod timer;
pub mod transport;
pub mod worker;
