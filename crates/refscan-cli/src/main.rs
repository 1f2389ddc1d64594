mod progress;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use refscan_core::{ConfigManager, RefScanError, ScanSettings, TraversalOrder};
use refscan_graph::{write_report, CancelToken, ScanOrchestrator, ScanOutcome};
use refscan_project::ProjectSnapshot;
use tracing::{debug, info, warn};
use tracing_subscriber::{filter::EnvFilter, layer::SubscriberExt, Registry};

use crate::progress::{BarProgress, LogDiagnostics};

#[derive(Parser, Debug)]
#[command(
    name = "refscan",
    version,
    author,
    about = "Find missing prefabs, components and references in a project",
    long_about = "RefScan walks the scenes and assets of a project snapshot and reports \
                  broken template links, unresolvable components and dangling object references."
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(
        long,
        global = true,
        env = "REFSCAN_PROJECT",
        default_value = "refscan-project.json",
        help = "Project snapshot to scan"
    )]
    project: PathBuf,

    #[arg(long, global = true, help = "Traversal order for scene scans: bfs | dfs")]
    order: Option<TraversalOrder>,

    #[arg(long, global = true, help = "Headless run: no progress bar, no per-record diagnostics")]
    batch: bool,

    #[arg(long, global = true, help = "Write every record, one per line, to this file")]
    outfile: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    #[command(about = "Broken template links in every prefab, then every asset root")]
    All,

    #[command(about = "One scene, the active scene when no path is given")]
    Scene {
        #[arg(help = "Scene path")]
        path: Option<String>,
    },

    #[command(about = "One prefab, every check")]
    Prefab {
        #[arg(help = "Prefab asset path")]
        path: String,
    },

    #[command(about = "Enabled build scenes")]
    BuildScenes,

    #[command(about = "Root object of every project asset")]
    Assets,

    #[command(about = "All build scenes, then every project asset")]
    Everywhere,

    #[command(about = "Broken template links inside every prefab")]
    Prefabs,
}

/// Accepts the single-dash `-outfile` form used by editor batch invocations.
fn normalize_legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-outfile") => OsString::from("--outfile"),
            Some(s) if s.starts_with("-outfile=") => OsString::from(format!("-{}", s)),
            _ => arg,
        })
        .collect()
}

fn init_tracing(verbose: bool, level: &str) {
    let default_level = if verbose { "debug" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = Registry::default().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false),
    );
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn run_scan(
    project: ProjectSnapshot,
    settings: ScanSettings,
    command: Commands,
    cancel: CancelToken,
) -> std::result::Result<ScanOutcome, RefScanError> {
    let progress = BarProgress::new(settings.batch_mode);
    let diagnostics = LogDiagnostics::new(&progress);
    let mut scanner = ScanOrchestrator::new(&project, settings)
        .with_progress(progress.clone())
        .with_diagnostics(diagnostics)
        .with_cancel_token(cancel);

    debug!("Running {:?}", command);
    let outcome = match command {
        Commands::All => scanner.scan_all(),
        Commands::Scene { path: Some(path) } => scanner.scan_scene(&path),
        Commands::Scene { path: None } => scanner.scan_active_scene(),
        Commands::Prefab { path } => scanner.scan_template(&path),
        Commands::BuildScenes => scanner.scan_build_scenes(),
        Commands::Assets => scanner.scan_assets(),
        Commands::Everywhere => scanner.scan_everywhere(),
        Commands::Prefabs => scanner.scan_missing_templates(),
    };
    progress.finish();

    if project.live_instances() != 0 {
        warn!("{} template instances were not released", project.live_instances());
    }
    outcome
}

fn print_summary(outcome: &ScanOutcome) {
    let summary = outcome.summary();
    if outcome.cancelled {
        println!("{}", summary.yellow());
    } else if outcome.errors.is_empty() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }

    for root in &outcome.skipped_roots {
        println!("  {} {}", "skipped:".yellow(), root);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_legacy_args(std::env::args_os()));

    let mut config_mgr = match &cli.config {
        Some(path) => ConfigManager::from_file(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;

    let config = config_mgr.config_mut();
    if let Some(order) = cli.order {
        config.scan.traversal = order;
    }
    if cli.batch {
        config.scan.batch_mode = true;
    }
    if cli.outfile.is_some() {
        config.output.outfile = cli.outfile.clone();
    }
    let config = config_mgr.config().clone();

    init_tracing(cli.verbose, &config.logging.level);

    let project = ProjectSnapshot::from_file(&cli.project).with_context(|| {
        format!("Failed to load project snapshot {}", cli.project.display())
    })?;

    let command = cli.command.unwrap_or(Commands::All);
    info!("Starting {:?} scan of {}", command, cli.project.display());

    let cancel = CancelToken::new();
    let scan_cancel = cancel.clone();
    let settings = config.scan.clone();
    let mut scan =
        tokio::task::spawn_blocking(move || run_scan(project, settings, command, scan_cancel));

    let outcome = tokio::select! {
        joined = &mut scan => joined.context("Scan task failed")??,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping scan");
            cancel.cancel();
            scan.await.context("Scan task failed")??
        }
    };

    print_summary(&outcome);

    if let Some(path) = &config.output.outfile {
        write_report(path, outcome.errors.messages())
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("{} {}", "Report written to".cyan(), path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_legacy_args(args.iter().map(OsString::from))).unwrap()
    }

    #[test]
    fn legacy_outfile_flag_is_accepted() {
        let cli = parse(&["refscan", "-outfile", "out.txt", "everywhere"]);
        assert_eq!(cli.outfile, Some(PathBuf::from("out.txt")));
        assert_eq!(cli.command, Some(Commands::Everywhere));

        let cli = parse(&["refscan", "-outfile=report.txt"]);
        assert_eq!(cli.outfile, Some(PathBuf::from("report.txt")));
        assert_eq!(cli.command, None);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["refscan", "scene", "Assets/Main.unity", "--order", "dfs", "--batch"]);
        assert_eq!(
            cli.command,
            Some(Commands::Scene {
                path: Some("Assets/Main.unity".to_string())
            })
        );
        assert_eq!(cli.order, Some(TraversalOrder::DepthFirst));
        assert!(cli.batch);
    }

    #[test]
    fn other_arguments_pass_through() {
        let args = normalize_legacy_args(["refscan", "--outfile", "x", "-v"].map(OsString::from));
        assert_eq!(args, ["refscan", "--outfile", "x", "-v"].map(OsString::from).to_vec());
    }

    #[test]
    fn unknown_order_is_rejected() {
        let result = Cli::try_parse_from(["refscan", "--order", "sideways", "assets"]);
        assert!(result.is_err());
    }
}
