//! Core library for the phosim regression harness: deterministic star
//! catalog generation, science-sensor sampling, simulator invocation,
//! artifact collection, and reference-tree comparison.

pub mod catalog;
pub mod collector;
pub mod comparator;
pub mod domain;
pub mod driver;
pub mod exec;
pub mod sensors;
pub mod starfield;
