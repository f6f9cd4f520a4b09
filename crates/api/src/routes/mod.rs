//! Route Handlers

pub mod samples;
pub mod trigger;
