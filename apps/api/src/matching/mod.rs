//! Matching: which extracted keywords the CV already covers.

pub mod matcher;
pub mod similarity;
