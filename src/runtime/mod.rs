//! Process-level runtime helpers.

pub mod supervisor;
