//! Interactive prompts and operator-facing output.

use crate::orchestrator::{MenuChoice, RunSummary};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::warn;

/// Show the group menu until a valid option is entered.
pub fn prompt_menu<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<MenuChoice> {
    loop {
        writeln!(output)?;
        for (i, entry) in MenuChoice::ENTRIES.iter().enumerate() {
            writeln!(output, "{}. {}", i + 1, entry)?;
        }
        writeln!(output)?;

        let answer = ask(input, output, "Please pick an option: ")?;
        let is_number = answer.len() == 1 && answer.chars().all(|c| c.is_ascii_digit());
        match answer.parse::<MenuChoice>() {
            Ok(choice) if is_number => return Ok(choice),
            _ => writeln!(output, "Invalid option. Please choose one of the backup options.")?,
        }
    }
}

/// Ask a yes/no question; anything but `y`/`yes` means no.
pub fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool> {
    let answer = ask(input, output, &format!("{} [y/N]: ", question))?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> io::Result<String> {
    write!(output, "{}", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed while waiting for an answer",
        ));
    }
    Ok(line.trim().to_string())
}

pub fn print_summary<W: Write>(summary: &RunSummary, output: &mut W) -> io::Result<()> {
    writeln!(output)?;
    for result in &summary.results {
        writeln!(
            output,
            "{}: {} saved, {} down, {} failed",
            result.group,
            result.written.len(),
            result.down.len(),
            result.failed.len()
        )?;
        for artifact in &result.written {
            if let Some(name) = artifact.path.file_name() {
                writeln!(output, "-----> {}", name.to_string_lossy())?;
            }
        }
        for down in &result.down {
            writeln!(output, "{} SSH port is closed. Backup skipped.", down.address)?;
        }
        for failed in &result.failed {
            writeln!(output, "{} backup failed: {}", failed.address, failed.reason)?;
        }
    }
    Ok(())
}

/// Tell the operator where the results are, or open them when asked.
pub fn report_locations<W: Write>(locations: &[PathBuf], open: bool, output: &mut W) -> io::Result<()> {
    let existing: Vec<&PathBuf> = locations.iter().filter(|p| p.exists()).collect();
    if existing.is_empty() {
        writeln!(output, "INFO: No backup files were created.")?;
        return Ok(());
    }

    if open {
        existing.into_iter().for_each(|location| open_location(location));
        return Ok(());
    }

    writeln!(output, "INFO: Files are created under below directory:")?;
    for location in existing {
        writeln!(output, "{}", location.display())?;
    }
    Ok(())
}

/// Open `path` in the platform file browser. Failures are only logged.
pub fn open_location(path: &Path) {
    let program = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };

    if let Err(e) = Command::new(program).arg(path).spawn() {
        warn!(path = %path.display(), "Could not open location with {}: {}", program, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::{Artifact, DownDeviceRecord, RunResult};
    use crate::groups::DeviceGroup;

    #[test]
    fn test_menu_reprompts_until_valid() {
        let mut input = "9\nfoo\n\n3\n".as_bytes();
        let mut output = Vec::new();

        let choice = prompt_menu(&mut input, &mut output).unwrap();

        assert_eq!(choice, MenuChoice::Single(DeviceGroup::Dc2Routers));
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("Invalid option").count(), 3);
        assert!(text.contains("5. Backup ALL devices."));
    }

    #[test]
    fn test_menu_eof_is_error() {
        let mut input = "7\n".as_bytes();
        let mut output = Vec::new();

        let err = prompt_menu(&mut input, &mut output).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_confirm_defaults_to_no() {
        let mut output = Vec::new();
        assert!(!confirm(&mut "\n".as_bytes(), &mut output, "Archive?").unwrap());
        assert!(!confirm(&mut "n\n".as_bytes(), &mut output, "Archive?").unwrap());
        assert!(confirm(&mut "Y\n".as_bytes(), &mut output, "Archive?").unwrap());
        assert!(confirm(&mut "yes\n".as_bytes(), &mut output, "Archive?").unwrap());
        assert!(String::from_utf8(output).unwrap().contains("Archive? [y/N]: "));
    }

    #[test]
    fn test_print_summary() {
        let summary = RunSummary {
            results: vec![RunResult {
                group: DeviceGroup::Dc1Routers,
                directory: PathBuf::from("backup/DC1_routers"),
                written: vec![Artifact {
                    address: "10.0.0.1".into(),
                    identity: "R1".into(),
                    path: PathBuf::from("backup/DC1_routers/R1__01-01-2024__10-00.txt"),
                }],
                down: vec![DownDeviceRecord {
                    address: "10.0.0.2".into(),
                    label: "R2".into(),
                    log_path: PathBuf::from("backup/DC1_routers/downDevices_R2.txt"),
                }],
                failed: Vec::new(),
            }],
            touched_dirs: vec![PathBuf::from("backup/DC1_routers")],
        };

        let mut output = Vec::new();
        print_summary(&summary, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("DC1 routers: 1 saved, 1 down, 0 failed"));
        assert!(text.contains("-----> R1__01-01-2024__10-00.txt"));
        assert!(text.contains("10.0.0.2 SSH port is closed."));
    }

    #[test]
    fn test_report_locations_lists_touched_dirs() -> io::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let routers = temp_dir.path().join("DC1_routers");
        let nexus = temp_dir.path().join("DC2_nexus");
        std::fs::create_dir_all(&routers)?;

        let mut output = Vec::new();
        report_locations(&[routers.clone(), nexus.clone()], false, &mut output)?;
        let text = String::from_utf8(output).unwrap();

        assert!(text.contains("Files are created under below directory:"));
        assert!(text.contains(&routers.display().to_string()));
        assert!(!text.contains(&nexus.display().to_string()));
        Ok(())
    }

    #[test]
    fn test_report_locations_without_output() -> io::Result<()> {
        let mut output = Vec::new();
        report_locations(&[], true, &mut output)?;
        assert!(String::from_utf8(output).unwrap().contains("No backup files were created."));
        Ok(())
    }
}
