//! Location Resolution
//!
//! Produces a usable location for fetch jobs. Acquiring a fresh GPS fix
//! is unbounded in latency, so resolution is split: a fresh-enough last
//! known fix is returned immediately, while a stale or absent fix only
//! requests an update and returns a pending marker. The eventual update
//! refreshes the home location in the store; it never blocks the
//! original caller. Without positioning permission the resolver falls
//! back to the cached home location, then to a hardcoded default.

mod resolver;
mod source;

pub use resolver::{LocationResolver, Resolution};
pub use source::{DeniedPositioning, GeoFix, PositionError, PositionSource};
