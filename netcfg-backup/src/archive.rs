//! Encrypted archive of the backup tree.
//!
//! The tree is packed into an AES-256 encrypted zip whose entries mirror the
//! tree layout. The tree is removed only after the archive has been written,
//! re-read and moved into its final name.

use crate::context::RunContext;
use crate::fs::walker::walk_directory;
use crate::utils::{BackupError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipArchive, ZipWriter};

/// Archive the run's backup tree if requested.
///
/// Returns the archive path when one was created; `None` when archiving was
/// declined or there was nothing to archive. On error the tree is left intact.
pub fn finalize(ctx: &RunContext, enabled: bool, passphrase: &str) -> Result<Option<PathBuf>> {
    if !enabled {
        info!("Backup folder compression and encryption skipped");
        return Ok(None);
    }

    let tree = ctx.tree_root();
    if !tree.is_dir() {
        warn!(tree = %tree.display(), "Nothing to archive, backup tree was not created");
        return Ok(None);
    }

    let archive_path = ctx.archive_path();
    let entries = create_archive(tree, &archive_path, passphrase)?;
    info!(archive = %archive_path.display(), entries, "Encrypted archive created");

    remove_tree(tree, &archive_path)?;
    Ok(Some(archive_path))
}

/// Delete the plaintext tree once its archive exists.
fn remove_tree(tree: &Path, archive: &Path) -> Result<()> {
    fs::remove_dir_all(tree).map_err(|source| {
        error!(tree = %tree.display(), "Archive created but backup tree could not be removed: {}", source);
        BackupError::Cleanup {
            archive: archive.to_path_buf(),
            source,
        }
    })
}

/// Write every file under `source` into an encrypted zip at `dest`.
///
/// Returns the number of entries written.
pub fn create_archive(source: &Path, dest: &Path, passphrase: &str) -> Result<usize> {
    if passphrase.is_empty() {
        return Err(BackupError::Config("archive passphrase is empty".into()));
    }

    let partial = partial_path(dest);
    let result = write_archive(source, &partial, passphrase).and_then(|count| {
        verify_entry_count(&partial, count)?;
        fs::rename(&partial, dest)?;
        Ok(count)
    });

    if result.is_err() {
        let _ = fs::remove_file(&partial);
    }
    result
}

/// Unpack `archive` into `dest`, returning the number of files extracted.
pub fn extract_archive(archive: &Path, dest: &Path, passphrase: &str) -> Result<usize> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index_decrypt(index, passphrase.as_bytes())?;
        let relative = entry.enclosed_name().map(|p| p.to_path_buf()).ok_or_else(|| {
            BackupError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsafe entry name {:?}", entry.name()),
            ))
        })?;

        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
    }

    Ok(zip.len())
}

fn write_archive(source: &Path, partial: &Path, passphrase: &str) -> Result<usize> {
    let files = walk_directory(source)?;
    let mut zip = ZipWriter::new(BufWriter::new(File::create(partial)?));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .with_aes_encryption(AesMode::Aes256, passphrase);

    for file in &files {
        zip.start_file(file.archive_name(), options)?;
        let mut input = File::open(&file.path)?;
        io::copy(&mut input, &mut zip)?;
    }

    let mut out = zip.finish()?;
    out.flush()?;
    out.get_ref().sync_all()?;
    Ok(files.len())
}

fn verify_entry_count(path: &Path, expected: usize) -> Result<()> {
    let zip = ZipArchive::new(File::open(path)?)?;
    if zip.len() != expected {
        return Err(BackupError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("archive holds {} entries, expected {}", zip.len(), expected),
        )));
    }
    Ok(())
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::DeviceGroup;
    use tempfile::TempDir;

    fn populate(ctx: &RunContext) -> io::Result<()> {
        let routers = ctx.group_dir(DeviceGroup::Dc1Routers);
        let nexus = ctx.group_dir(DeviceGroup::Dc2Nexus);
        fs::create_dir_all(&routers)?;
        fs::create_dir_all(&nexus)?;
        fs::write(routers.join("R1__stamp.txt"), "hostname R1\n!\nend\n")?;
        fs::write(nexus.join("N1__stamp.txt"), "hostname N1\n")?;
        fs::write(nexus.join("downDevices_x_10.0.0.9_stamp.txt"), "10.0.0.9_x\n")?;
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        populate(&ctx)?;

        let archive = ctx.archive_path();
        let count = create_archive(ctx.tree_root(), &archive, "correct horse")?;
        assert_eq!(count, 3);

        let names: Vec<String> = ZipArchive::new(File::open(&archive)?)?
            .file_names()
            .map(str::to_string)
            .collect();
        assert!(names.contains(&"DC1_routers/R1__stamp.txt".to_string()));
        assert!(names.iter().all(|n| !n.starts_with("backup_")));

        let restored = temp_dir.path().join("restored");
        assert_eq!(extract_archive(&archive, &restored, "correct horse")?, 3);
        assert_eq!(
            fs::read_to_string(restored.join("DC1_routers/R1__stamp.txt"))?,
            "hostname R1\n!\nend\n"
        );
        assert_eq!(
            fs::read_to_string(restored.join("DC2_nexus/downDevices_x_10.0.0.9_stamp.txt"))?,
            "10.0.0.9_x\n"
        );
        Ok(())
    }

    #[test]
    fn test_wrong_passphrase_fails() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        populate(&ctx)?;

        let archive = ctx.archive_path();
        create_archive(ctx.tree_root(), &archive, "correct horse")?;

        let restored = temp_dir.path().join("restored");
        assert!(extract_archive(&archive, &restored, "battery staple").is_err());
        Ok(())
    }

    #[test]
    fn test_finalize_removes_tree_on_success() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        populate(&ctx)?;

        let archive = finalize(&ctx, true, "pw")?;

        assert_eq!(archive, Some(ctx.archive_path()));
        assert!(ctx.archive_path().is_file());
        assert!(!ctx.tree_root().exists());
        Ok(())
    }

    #[test]
    fn test_finalize_declined_keeps_tree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        populate(&ctx)?;

        assert_eq!(finalize(&ctx, false, "pw")?, None);

        assert!(ctx.tree_root().join("DC1_routers/R1__stamp.txt").is_file());
        assert!(!ctx.archive_path().exists());
        Ok(())
    }

    #[test]
    fn test_failed_archive_keeps_tree() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path().join("out"));
        populate(&ctx)?;

        // The archive's final name is occupied by a directory, so the rename fails.
        fs::create_dir_all(ctx.archive_path().join("blocker"))?;

        let result = finalize(&ctx, true, "pw");

        assert!(result.is_err());
        assert!(ctx.tree_root().join("DC1_routers/R1__stamp.txt").is_file());
        assert!(!partial_path(&ctx.archive_path()).exists());
        Ok(())
    }

    #[test]
    fn test_tree_removal_failure_names_archive() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        let archive = ctx.archive_path();

        match remove_tree(ctx.tree_root(), &archive) {
            Err(BackupError::Cleanup { archive: reported, .. }) => assert_eq!(reported, archive),
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_empty_passphrase_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());
        populate(&ctx)?;

        assert!(matches!(finalize(&ctx, true, ""), Err(BackupError::Config(_))));
        assert!(ctx.tree_root().is_dir());
        Ok(())
    }

    #[test]
    fn test_nothing_to_archive() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let ctx = RunContext::new(temp_dir.path());

        assert_eq!(finalize(&ctx, true, "pw")?, None);
        assert!(!ctx.archive_path().exists());
        Ok(())
    }
}
