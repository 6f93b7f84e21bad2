//! Per-group backup: running devices through probe, session and writer.

pub mod runner;
pub mod writer;

pub use runner::{FailedDevice, GroupRunner, RunResult};
pub use writer::{Artifact, BackupWriter, DownDeviceRecord};
