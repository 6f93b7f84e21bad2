//! netcfg-backup - Main entry point
//!
//! Backs up running configurations of the DC1/DC2 router and Nexus groups.

use anyhow::Result;
use clap::Parser;
use netcfg_backup::backup::GroupRunner;
use netcfg_backup::net::TcpProbe;
use netcfg_backup::orchestrator::{MenuChoice, Orchestrator, RunOptions, RunSummary};
use netcfg_backup::session::{SessionClient, SshClient};
use netcfg_backup::{archive, console, utils, BackupError, Config, RunContext};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Group to back up: 1-5, dc1-routers, dc1-nexus, dc2-routers, dc2-nexus or all
    #[arg(short, long)]
    group: Option<MenuChoice>,

    /// Compress and encrypt the backup tree without asking
    #[arg(long, conflicts_with = "no_archive")]
    archive: bool,

    /// Keep the plain backup tree without asking
    #[arg(long)]
    no_archive: bool,

    /// Open the result location afterwards without asking
    #[arg(long, conflicts_with = "no_open")]
    open: bool,

    /// Do not offer to open the result location
    #[arg(long)]
    no_open: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

fn flag(yes: bool, no: bool) -> Option<bool> {
    match (yes, no) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

fn resolve<R: BufRead, W: Write>(
    given: Option<bool>,
    input: &mut R,
    output: &mut W,
    question: &str,
) -> io::Result<bool> {
    match given {
        Some(answer) => Ok(answer),
        None => console::confirm(input, output, question),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    tracing::info!("Starting netcfg-backup v{}", env!("CARGO_PKG_VERSION"));

    let ctx = RunContext::new(&config.output.root);

    let mut input = io::stdin().lock();
    let mut output = io::stdout();

    let choice = match args.group {
        Some(choice) => choice,
        None => console::prompt_menu(&mut input, &mut output)?,
    };
    let options = RunOptions {
        archive_enabled: resolve(
            flag(args.archive, args.no_archive),
            &mut input,
            &mut output,
            "Do you want to compress and encrypt the backup folder?",
        )?,
        open_result_after: resolve(
            flag(args.open, args.no_open),
            &mut input,
            &mut output,
            "Do you want to open the result location when done?",
        )?,
        passphrase: config.archive.passphrase.clone(),
    };
    options.validate()?;

    let probe = TcpProbe::new(config.probe.port, config.probe.attempts, config.probe_timeout());
    let client: Arc<dyn SessionClient> = Arc::new(SshClient::new(
        config.probe.port,
        config.probe_timeout(),
        config.command_timeout(),
    ));
    let runner = GroupRunner::new(&ctx, &probe, client, config.session_timeout())
        .fail_fast(config.session.fail_fast);
    let orchestrator = Orchestrator::new(&ctx, &config.output.inventory_dir, runner);

    tracing::info!(run = %ctx.stamp(), tree = %ctx.tree_root().display(), "{}", choice);
    let summary = orchestrator.run(choice).await?;
    console::print_summary(&summary, &mut output)?;

    let location = match archive::finalize(&ctx, options.archive_enabled, &options.passphrase) {
        Ok(Some(path)) => {
            writeln!(output, "Password-protected ZIP file '{}' created successfully.", path.display())?;
            path.parent().map(PathBuf::from).unwrap_or_else(|| ctx.output_root().to_path_buf())
        }
        Ok(None) => {
            console::report_locations(&summary.touched_dirs, options.open_result_after, &mut output)?;
            return finish(&summary);
        }
        Err(BackupError::Cleanup { archive, source }) => {
            tracing::error!(archive = %archive.display(), "Backup tree not removed: {}", source);
            writeln!(
                output,
                "Password-protected ZIP file '{}' created, but the plain backup folder could not be removed ({}). Delete '{}' manually.",
                archive.display(),
                source,
                ctx.tree_root().display()
            )?;
            archive.parent().map(PathBuf::from).unwrap_or_else(|| ctx.output_root().to_path_buf())
        }
        Err(e) => {
            tracing::error!("Archive failed, backup folder kept: {}", e);
            writeln!(output, "Archive failed ({}). Backup folder kept.", e)?;
            ctx.tree_root().to_path_buf()
        }
    };
    console::report_locations(&[location], options.open_result_after, &mut output)?;
    finish(&summary)
}

fn finish(summary: &RunSummary) -> Result<()> {
    tracing::info!(
        written = summary.written(),
        down = summary.down(),
        failed = summary.failed(),
        "Backup run complete"
    );
    Ok(())
}
