//! Device inventories read from per-group CSV files.
//!
//! Columns are positional: `address, username, password, enable_secret, label`.
//! The first row is always treated as a header.

use crate::utils::{BackupError, Result};
use std::fmt;
use std::io::Read;
use std::path::Path;

const COLUMNS: usize = 5;

/// One inventory row. `address` is the operational key; `label` is only a
/// display name and need not match the device hostname.
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub address: String,
    pub username: String,
    pub password: String,
    pub enable_secret: String,
    pub label: String,
}

// Credentials stay out of logs.
impl fmt::Debug for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceRecord")
            .field("address", &self.address)
            .field("username", &self.username)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Read an inventory file. Records come back last row first.
pub fn load_inventory(path: &Path) -> Result<Vec<DeviceRecord>> {
    let file = std::fs::File::open(path).map_err(|e| {
        BackupError::Config(format!("cannot open inventory {}: {}", path.display(), e))
    })?;
    read_inventory(file)
}

pub fn read_inventory<R: Read>(reader: R) -> Result<Vec<DeviceRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut devices = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        let line = row.position().map(|p| p.line()).unwrap_or_default();

        if row.iter().all(str::is_empty) {
            continue;
        }
        if row.len() < COLUMNS {
            return Err(BackupError::Inventory {
                line,
                reason: format!("expected {} columns, found {}", COLUMNS, row.len()),
            });
        }

        let address = row[0].to_string();
        if address.is_empty() {
            return Err(BackupError::Inventory {
                line,
                reason: "empty address".to_string(),
            });
        }

        devices.push(DeviceRecord {
            address,
            username: row[1].to_string(),
            password: row[2].to_string(),
            enable_secret: row[3].to_string(),
            label: row[4].to_string(),
        });
    }

    devices.reverse();
    Ok(devices)
}
