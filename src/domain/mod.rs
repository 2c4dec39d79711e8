//! Domain model and analyses for Assert Probe.

pub mod assertion;
pub mod ast;
pub mod classifier;
pub mod instrument;
pub mod randomness;
pub mod rules;
pub mod visit;
