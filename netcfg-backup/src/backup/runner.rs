//! Group backup runner.
//!
//! Walks one inventory in order and gives every row exactly one outcome:
//! an artifact, a down-device record, or a failure entry.

use super::writer::{Artifact, BackupWriter, DownDeviceRecord};
use crate::context::RunContext;
use crate::groups::{DeviceGroup, GroupConfig};
use crate::inventory::DeviceRecord;
use crate::net::Probe;
use crate::session::{fetch_running_config, FetchedConfig, SessionClient};
use crate::utils::{BackupError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// A reachable device whose backup could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDevice {
    pub address: String,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub group: DeviceGroup,
    pub directory: PathBuf,
    pub written: Vec<Artifact>,
    pub down: Vec<DownDeviceRecord>,
    pub failed: Vec<FailedDevice>,
}

impl RunResult {
    fn new(group: &GroupConfig) -> Self {
        Self {
            group: group.group,
            directory: group.destination_dir.clone(),
            written: Vec::new(),
            down: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Number of inventory rows that produced an outcome.
    pub fn outcomes(&self) -> usize {
        self.written.len() + self.down.len() + self.failed.len()
    }
}

pub struct GroupRunner<'a, P> {
    ctx: &'a RunContext,
    probe: &'a P,
    client: Arc<dyn SessionClient>,
    session_timeout: Duration,
    fail_fast: bool,
}

impl<'a, P: Probe> GroupRunner<'a, P> {
    pub fn new(
        ctx: &'a RunContext,
        probe: &'a P,
        client: Arc<dyn SessionClient>,
        session_timeout: Duration,
    ) -> Self {
        Self {
            ctx,
            probe,
            client,
            session_timeout,
            fail_fast: false,
        }
    }

    /// Return the first device error instead of recording it and moving on.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub async fn run(&self, group: &GroupConfig, inventory: &[DeviceRecord]) -> Result<RunResult> {
        let writer = BackupWriter::new(self.ctx, &group.destination_dir);
        let mut result = RunResult::new(group);

        info!(group = %group.group, devices = inventory.len(), "Starting group backup");

        for device in inventory {
            if !self.probe.is_reachable(&device.address).await {
                warn!(address = %device.address, label = %device.label, "SSH port is closed, skipping backup");
                match writer.record_down(device) {
                    Ok(record) => result.down.push(record),
                    Err(e) => self.record_failure(&mut result, device, e)?,
                }
                continue;
            }

            match self.backup_device(group, &writer, device).await {
                Ok(artifact) => {
                    info!(address = %device.address, file = %artifact.path.display(), "Configuration saved");
                    result.written.push(artifact);
                }
                Err(e) => self.record_failure(&mut result, device, e)?,
            }
        }

        info!(
            group = %group.group,
            written = result.written.len(),
            down = result.down.len(),
            failed = result.failed.len(),
            "Group backup finished"
        );
        Ok(result)
    }

    fn record_failure(
        &self,
        result: &mut RunResult,
        device: &DeviceRecord,
        error: BackupError,
    ) -> Result<()> {
        if self.fail_fast {
            return Err(error);
        }

        warn!(address = %device.address, label = %device.label, "Backup failed: {}", error);
        result.failed.push(FailedDevice {
            address: device.address.clone(),
            label: device.label.clone(),
            reason: error.to_string(),
        });
        Ok(())
    }

    async fn backup_device(
        &self,
        group: &GroupConfig,
        writer: &BackupWriter<'_>,
        device: &DeviceRecord,
    ) -> Result<Artifact> {
        let fetched = self.fetch(group, device).await?;
        writer.write_artifact(device, &fetched.identity, &fetched.config)
    }

    /// Run the blocking session on the blocking pool, bounded by the session timeout.
    async fn fetch(&self, group: &GroupConfig, device: &DeviceRecord) -> Result<FetchedConfig> {
        let client = self.client.clone();
        let dialect = group.dialect;
        let policy = group.identity_policy;
        let device = device.clone();

        let task = tokio::task::spawn_blocking(move || {
            fetch_running_config(client.as_ref(), dialect, policy, &device)
        });

        match tokio::time::timeout(self.session_timeout, task).await {
            Ok(Ok(fetched)) => Ok(fetched?),
            Ok(Err(e)) => Err(BackupError::Task(e.to_string())),
            Err(_) => Err(BackupError::Timeout(self.session_timeout)),
        }
    }
}
