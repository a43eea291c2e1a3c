//! Analysis: the public operations on top of the pipeline stages, plus their
//! HTTP handlers.

pub mod handlers;
pub mod pipeline;
pub mod report;
