//! Network reachability checks.

pub mod probe;

pub use probe::{socket_target, Probe, TcpProbe};
