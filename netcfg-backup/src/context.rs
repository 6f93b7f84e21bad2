//! Run-scoped values captured once at start-up.
//!
//! Every file produced by one invocation carries the same stamp, so artifacts,
//! down-device logs and the archive can be correlated by name.

use crate::groups::DeviceGroup;
use crate::inventory::DeviceRecord;
use crate::session::sanitize_identity;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Stamp used in artifact, log and archive names: day-month-year and hour-minute.
pub const STAMP_FORMAT: &str = "%d-%m-%Y__%H-%M";

/// Date used to name the backup tree.
pub const TREE_DATE_FORMAT: &str = "%d-%m-%Y";

#[derive(Debug, Clone)]
pub struct RunContext {
    stamp: String,
    output_root: PathBuf,
    tree_root: PathBuf,
}

impl RunContext {
    /// Capture the current local time as the run timestamp.
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self::at(output_root, Local::now())
    }

    pub fn at(output_root: impl Into<PathBuf>, started_at: DateTime<Local>) -> Self {
        let output_root = output_root.into();
        let tree_root = output_root.join(format!(
            "backup_{}",
            started_at.format(TREE_DATE_FORMAT)
        ));

        Self {
            stamp: started_at.format(STAMP_FORMAT).to_string(),
            output_root,
            tree_root,
        }
    }

    pub fn stamp(&self) -> &str {
        &self.stamp
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Root of the backup tree holding every group directory.
    pub fn tree_root(&self) -> &Path {
        &self.tree_root
    }

    pub fn group_dir(&self, group: DeviceGroup) -> PathBuf {
        self.tree_root.join(group.dir_name())
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_root.join(format!("backup_{}.zip", self.stamp))
    }

    /// `<identity>__<stamp>.txt`
    pub fn artifact_name(&self, identity: &str) -> String {
        format!("{}__{}.txt", identity, self.stamp)
    }

    /// `downDevices_<label>_<address>_<stamp>.txt`
    pub fn down_log_name(&self, device: &DeviceRecord) -> String {
        format!(
            "downDevices_{}_{}_{}.txt",
            sanitize_identity(&device.label),
            sanitize_identity(&device.address),
            self.stamp
        )
    }
}
