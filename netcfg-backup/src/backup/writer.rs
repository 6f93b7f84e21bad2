//! Writes backup artifacts and down-device records into a group directory.

use crate::context::RunContext;
use crate::inventory::DeviceRecord;
use crate::utils::{BackupError, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// A configuration file written for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub address: String,
    pub identity: String,
    pub path: PathBuf,
}

/// A device that failed its reachability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownDeviceRecord {
    pub address: String,
    pub label: String,
    pub log_path: PathBuf,
}

pub struct BackupWriter<'a> {
    ctx: &'a RunContext,
    dir: PathBuf,
}

impl<'a> BackupWriter<'a> {
    pub fn new(ctx: &'a RunContext, dir: impl Into<PathBuf>) -> Self {
        Self {
            ctx,
            dir: dir.into(),
        }
    }

    /// Write `config` verbatim to `<identity>__<stamp>.txt`. Never overwrites.
    pub fn write_artifact(&self, device: &DeviceRecord, identity: &str, config: &str) -> Result<Artifact> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(self.ctx.artifact_name(identity));

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BackupError::ArtifactExists(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(config.as_bytes())?;
        file.sync_all()?;

        Ok(Artifact {
            address: device.address.clone(),
            identity: identity.to_string(),
            path,
        })
    }

    /// Append `<address>_<label>` to the device's down-device log.
    pub fn record_down(&self, device: &DeviceRecord) -> Result<DownDeviceRecord> {
        fs::create_dir_all(&self.dir)?;
        let log_path = self.dir.join(self.ctx.down_log_name(device));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        writeln!(file, "{}_{}", device.address, device.label)?;
        file.flush()?;

        Ok(DownDeviceRecord {
            address: device.address.clone(),
            label: device.label.clone(),
            log_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::DeviceGroup;
    use tempfile::TempDir;

    fn device(address: &str, label: &str) -> DeviceRecord {
        DeviceRecord {
            address: address.into(),
            username: "admin".into(),
            password: "pw".into(),
            enable_secret: "en".into(),
            label: label.into(),
        }
    }

    #[test]
    fn test_write_artifact() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        let writer = BackupWriter::new(&ctx, ctx.group_dir(DeviceGroup::Dc1Routers));

        let artifact = writer.write_artifact(&device("10.0.0.1", "a"), "R1", "hostname R1\n")?;

        assert_eq!(
            artifact.path.file_name().unwrap().to_str().unwrap(),
            format!("R1__{}.txt", ctx.stamp())
        );
        assert_eq!(fs::read_to_string(&artifact.path)?, "hostname R1\n");
        Ok(())
    }

    #[test]
    fn test_directory_creation_is_idempotent() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        let writer = BackupWriter::new(&ctx, ctx.group_dir(DeviceGroup::Dc2Nexus));

        writer.write_artifact(&device("10.0.0.1", "a"), "N1", "one")?;
        writer.write_artifact(&device("10.0.0.2", "b"), "N2", "two")?;

        assert_eq!(fs::read_dir(ctx.group_dir(DeviceGroup::Dc2Nexus))?.count(), 2);
        Ok(())
    }

    #[test]
    fn test_artifact_is_never_overwritten() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        let writer = BackupWriter::new(&ctx, ctx.group_dir(DeviceGroup::Dc1Nexus));

        let first = writer.write_artifact(&device("10.0.0.1", "a"), "dup", "first")?;
        let second = writer.write_artifact(&device("10.0.0.2", "b"), "dup", "second");

        assert!(matches!(second, Err(BackupError::ArtifactExists(_))));
        assert_eq!(fs::read_to_string(first.path)?, "first");
        Ok(())
    }

    #[test]
    fn test_record_down_appends() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        let writer = BackupWriter::new(&ctx, ctx.group_dir(DeviceGroup::Dc2Routers));
        let dev = device("10.9.9.9", "branch");

        let record = writer.record_down(&dev)?;
        writer.record_down(&dev)?;

        assert_eq!(
            record.log_path.file_name().unwrap().to_str().unwrap(),
            format!("downDevices_branch_10.9.9.9_{}.txt", ctx.stamp())
        );
        assert_eq!(
            fs::read_to_string(&record.log_path)?,
            "10.9.9.9_branch\n10.9.9.9_branch\n"
        );
        Ok(())
    }
}
