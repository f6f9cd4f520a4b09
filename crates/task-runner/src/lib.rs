//! Task Execution
//!
//! Provides a bounded worker pool for CPU-light I/O-bound jobs and a
//! dedicated single-worker serial lane that serializes all store
//! mutations without explicit locking in callers.

mod runner;

pub use runner::{SerialLane, TaskError, TaskHandle, TaskRunner};
