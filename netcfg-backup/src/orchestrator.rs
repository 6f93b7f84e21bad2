//! Runs the selected device groups one after another.

use crate::backup::{GroupRunner, RunResult};
use crate::context::RunContext;
use crate::groups::{DeviceGroup, GroupConfig};
use crate::inventory::{load_inventory, DeviceRecord};
use crate::net::Probe;
use crate::utils::{BackupError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// One of the five menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Single(DeviceGroup),
    All,
}

impl MenuChoice {
    /// Menu entries in display order, numbered from 1.
    pub const ENTRIES: [MenuChoice; 5] = [
        MenuChoice::Single(DeviceGroup::Dc1Routers),
        MenuChoice::Single(DeviceGroup::Dc1Nexus),
        MenuChoice::Single(DeviceGroup::Dc2Routers),
        MenuChoice::Single(DeviceGroup::Dc2Nexus),
        MenuChoice::All,
    ];

    /// Groups to run, in execution order.
    pub fn groups(self) -> Vec<DeviceGroup> {
        match self {
            MenuChoice::Single(group) => vec![group],
            MenuChoice::All => DeviceGroup::ALL.to_vec(),
        }
    }
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuChoice::Single(group) => write!(f, "Backup {}.", group),
            MenuChoice::All => f.write_str("Backup ALL devices."),
        }
    }
}

impl FromStr for MenuChoice {
    type Err = String;

    /// Accepts a menu number (`1`-`5`), a group slug, or `all`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|i| Self::ENTRIES.get(i).copied())
                .ok_or_else(|| format!("menu option must be 1-{}", Self::ENTRIES.len()));
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(MenuChoice::All);
        }
        DeviceGroup::ALL
            .into_iter()
            .find(|g| g.slug().eq_ignore_ascii_case(s))
            .map(MenuChoice::Single)
            .ok_or_else(|| format!("unknown group '{}'", s))
    }
}

/// Decisions taken before the workflow starts, so the run itself never prompts.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub archive_enabled: bool,
    pub passphrase: String,
    pub open_result_after: bool,
}

impl RunOptions {
    pub fn validate(&self) -> Result<()> {
        if self.archive_enabled && self.passphrase.is_empty() {
            return Err(BackupError::Config(format!(
                "archiving requested but no passphrase configured (set [archive] passphrase or {})",
                crate::config::PASSPHRASE_ENV
            )));
        }
        Ok(())
    }
}

/// Outcome of every group run in this invocation.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub results: Vec<RunResult>,
    /// Group directories that exist on disk after the run.
    pub touched_dirs: Vec<PathBuf>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.results.iter().map(|r| r.written.len()).sum()
    }

    pub fn down(&self) -> usize {
        self.results.iter().map(|r| r.down.len()).sum()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().map(|r| r.failed.len()).sum()
    }
}

pub struct Orchestrator<'a, P> {
    ctx: &'a RunContext,
    inventory_dir: PathBuf,
    runner: GroupRunner<'a, P>,
}

impl<'a, P: Probe> Orchestrator<'a, P> {
    pub fn new(ctx: &'a RunContext, inventory_dir: &Path, runner: GroupRunner<'a, P>) -> Self {
        Self {
            ctx,
            inventory_dir: inventory_dir.to_path_buf(),
            runner,
        }
    }

    /// Load every inventory the choice needs. Fails before any device is contacted.
    pub fn preflight(&self, choice: MenuChoice) -> Result<Vec<(GroupConfig, Vec<DeviceRecord>)>> {
        choice
            .groups()
            .into_iter()
            .map(|group| {
                let config = GroupConfig::new(group, &self.inventory_dir, self.ctx);
                let devices = load_inventory(&config.inventory_path)?;
                Ok((config, devices))
            })
            .collect()
    }

    pub async fn run(&self, choice: MenuChoice) -> Result<RunSummary> {
        let plan = self.preflight(choice)?;
        let mut summary = RunSummary::default();

        for (config, devices) in plan {
            info!(group = %config.group, inventory = %config.inventory_path.display(), "Backing up {}", config.group);
            let result = self.runner.run(&config, &devices).await?;

            if result.directory.is_dir() {
                summary.touched_dirs.push(result.directory.clone());
            }
            summary.results.push(result);
        }

        Ok(summary)
    }
}
