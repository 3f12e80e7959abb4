//! Capture → dispatch → aggregate.

pub mod aggregator;
pub mod dispatcher;
pub mod orchestrator;
pub mod report;
pub mod runner;
