//! The four fixed device groups and the dialect each one speaks.

use crate::context::RunContext;
use std::fmt;
use std::path::{Path, PathBuf};

/// Command whose first output token is the device hostname on IOS.
pub const UPTIME_COMMAND: &str = "show version | include uptime";

/// Command returning the running configuration.
pub const SHOW_RUN_COMMAND: &str = "show running-config";

/// Privilege elevation command; the device answers with a secret prompt.
pub const ENABLE_COMMAND: &str = "enable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceGroup {
    Dc1Routers,
    Dc1Nexus,
    Dc2Routers,
    Dc2Nexus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Ios,
    NxOs,
}

/// How a device's filename identity is discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityPolicy {
    /// First whitespace token of the uptime line.
    UptimeToken,
    /// Current prompt with the privilege marker removed.
    PromptStrip,
}

impl DeviceGroup {
    /// Every group, in the order the "all groups" choice runs them.
    pub const ALL: [DeviceGroup; 4] = [
        DeviceGroup::Dc1Routers,
        DeviceGroup::Dc1Nexus,
        DeviceGroup::Dc2Routers,
        DeviceGroup::Dc2Nexus,
    ];

    /// Directory name under the backup tree, also the inventory file stem.
    pub fn dir_name(self) -> &'static str {
        match self {
            DeviceGroup::Dc1Routers => "DC1_routers",
            DeviceGroup::Dc1Nexus => "DC1_nexus",
            DeviceGroup::Dc2Routers => "DC2_routers",
            DeviceGroup::Dc2Nexus => "DC2_nexus",
        }
    }

    pub fn dialect(self) -> Dialect {
        match self {
            DeviceGroup::Dc1Routers | DeviceGroup::Dc2Routers => Dialect::Ios,
            DeviceGroup::Dc1Nexus | DeviceGroup::Dc2Nexus => Dialect::NxOs,
        }
    }

    /// Human readable name used in menus and summaries.
    pub fn display_name(self) -> &'static str {
        match self {
            DeviceGroup::Dc1Routers => "DC1 routers",
            DeviceGroup::Dc1Nexus => "DC1 nexus",
            DeviceGroup::Dc2Routers => "DC2 routers",
            DeviceGroup::Dc2Nexus => "DC2 nexus",
        }
    }

    /// Slug accepted on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            DeviceGroup::Dc1Routers => "dc1-routers",
            DeviceGroup::Dc1Nexus => "dc1-nexus",
            DeviceGroup::Dc2Routers => "dc2-routers",
            DeviceGroup::Dc2Nexus => "dc2-nexus",
        }
    }

    pub fn inventory_file(self, inventory_dir: &Path) -> PathBuf {
        inventory_dir.join(format!("{}.csv", self.dir_name()))
    }
}

impl fmt::Display for DeviceGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl Dialect {
    pub fn identity_policy(self) -> IdentityPolicy {
        match self {
            Dialect::Ios => IdentityPolicy::UptimeToken,
            Dialect::NxOs => IdentityPolicy::PromptStrip,
        }
    }

    /// Terminal setup sent once after login: paging off, and on NX-OS a
    /// wide terminal so long configuration lines are not wrapped.
    pub fn setup_commands(self) -> &'static [&'static str] {
        match self {
            Dialect::Ios => &["terminal length 0"],
            Dialect::NxOs => &["terminal length 0", "terminal width 511"],
        }
    }
}

/// Everything a group runner needs to know about one group.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    pub group: DeviceGroup,
    pub inventory_path: PathBuf,
    pub destination_dir: PathBuf,
    pub dialect: Dialect,
    pub identity_policy: IdentityPolicy,
}

impl GroupConfig {
    pub fn new(group: DeviceGroup, inventory_dir: &Path, ctx: &RunContext) -> Self {
        let dialect = group.dialect();
        Self {
            group,
            inventory_path: group.inventory_file(inventory_dir),
            destination_dir: ctx.group_dir(group),
            dialect,
            identity_policy: dialect.identity_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialects_per_group() {
        assert_eq!(DeviceGroup::Dc1Routers.dialect(), Dialect::Ios);
        assert_eq!(DeviceGroup::Dc2Routers.dialect(), Dialect::Ios);
        assert_eq!(DeviceGroup::Dc1Nexus.dialect(), Dialect::NxOs);
        assert_eq!(DeviceGroup::Dc2Nexus.dialect(), Dialect::NxOs);
    }

    #[test]
    fn test_identity_policy_follows_dialect() {
        assert_eq!(Dialect::Ios.identity_policy(), IdentityPolicy::UptimeToken);
        assert_eq!(Dialect::NxOs.identity_policy(), IdentityPolicy::PromptStrip);
    }

    #[test]
    fn test_setup_commands_disable_paging() {
        assert_eq!(Dialect::Ios.setup_commands(), ["terminal length 0"]);
        assert_eq!(Dialect::NxOs.setup_commands()[0], "terminal length 0");
        assert!(Dialect::NxOs.setup_commands().contains(&"terminal width 511"));
    }

    #[test]
    fn test_inventory_file() {
        let path = DeviceGroup::Dc2Nexus.inventory_file(Path::new("CSV"));
        assert_eq!(path, PathBuf::from("CSV").join("DC2_nexus.csv"));
    }

    #[test]
    fn test_group_config() {
        let ctx = RunContext::new("/tmp/out");
        let config = GroupConfig::new(DeviceGroup::Dc1Nexus, Path::new("CSV"), &ctx);

        assert_eq!(config.dialect, Dialect::NxOs);
        assert_eq!(config.identity_policy, IdentityPolicy::PromptStrip);
        assert!(config.destination_dir.starts_with(ctx.tree_root()));
        assert!(config.destination_dir.ends_with("DC1_nexus"));
    }
}
