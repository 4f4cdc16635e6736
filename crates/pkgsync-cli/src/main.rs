//! pkgsync - package sync for remote content repository instances
//!
//! Usage:
//!   pkgsync deploy site.zip            # Upload and install everywhere
//!   pkgsync -i '*-publish' status      # Runtime state of publish instances
//!   pkgsync uninstall --file site.zip  # Remove a package, with confirmation

mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pkgsync_core::config::{ConfigStore, SyncConfig};
use pkgsync_core::error::SyncError;
use pkgsync_core::fanout::InstanceOutcome;
use pkgsync_core::instance::{Instance, InstanceState};
use pkgsync_core::package::{PackageIdentity, PackageSource, WildcardPattern};
use pkgsync_core::response::PackageListing;
use pkgsync_core::session::SyncSession;
use pkgsync_core::sync::InstanceSync;
use pkgsync_core::transport::Transport;

use crate::progress::ConsoleProgress;

#[derive(Parser)]
#[command(name = "pkgsync")]
#[command(about = "Package sync for remote content repository instances", long_about = None)]
struct Cli {
    /// Path to pkgsync.toml (default: ./pkgsync.toml, then the user config dir)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Only act on instances whose name matches this wildcard
    #[arg(long, short, global = true, default_value = "*")]
    instance: String,

    /// Debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'o', long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a package archive
    Upload {
        /// Package archive (zip)
        file: PathBuf,
    },

    /// Install an uploaded package
    Install(PackageArgs),

    /// Replicate an installed package to publish instances
    Activate(PackageArgs),

    /// Rebuild a package definition on the instance
    Build(PackageArgs),

    /// Upload then install
    Deploy {
        /// Package archive (zip)
        file: PathBuf,
    },

    /// Upload, install, then activate
    Distribute {
        /// Package archive (zip)
        file: PathBuf,
    },

    /// Delete an uploaded package
    #[command(alias = "rm")]
    Delete {
        #[command(flatten)]
        package: PackageArgs,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Uninstall an installed package
    Uninstall {
        #[command(flatten)]
        package: PackageArgs,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List packages uploaded to each instance
    List,

    /// Show module and service state of each instance
    Status,

    /// Restart the instance runtime
    Reload {
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable lines
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show failures (non-zero exit if any)
    Quiet,
}

/// Which remote package a command acts on.
///
/// Without flags the identity from `[package]` in pkgsync.toml is used.
#[derive(Args, Clone, Default)]
struct PackageArgs {
    /// Local archive whose descriptor names the remote package
    #[arg(long, short = 'f', conflicts_with = "path")]
    file: Option<PathBuf>,

    /// Remote package path, e.g. /etc/packages/my/site.zip
    #[arg(long, short = 'p')]
    path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
enum PackageTarget {
    RemotePath(String),
    Source(PackageSource),
}

impl PackageTarget {
    fn from_args(args: PackageArgs, config: &SyncConfig) -> Result<Self> {
        if let Some(path) = args.path {
            return Ok(PackageTarget::RemotePath(path));
        }
        if let Some(file) = args.file {
            return Ok(PackageTarget::Source(PackageSource::Archive(file)));
        }
        if let Some(identity) = config.package.identity() {
            return Ok(PackageTarget::Source(PackageSource::Identity(identity)));
        }
        if !config.package.remote_path.trim().is_empty() {
            return Ok(PackageTarget::Source(PackageSource::Identity(
                PackageIdentity::from_path(&config.package.remote_path),
            )));
        }
        anyhow::bail!(
            "No package given: pass --file or --path, or set [package] group, name and version in pkgsync.toml"
        )
    }

    fn remote_path<T: Transport>(&self, sync: &mut InstanceSync<T>) -> Result<String, SyncError> {
        match self {
            PackageTarget::RemotePath(path) => Ok(path.clone()),
            PackageTarget::Source(source) => sync.determine_remote_package_path(source),
        }
    }
}

/// Result of a command together with the remote path it acted on.
#[derive(Serialize)]
struct Located<R> {
    path: String,
    #[serde(flatten)]
    result: R,
}

#[derive(Serialize)]
struct StatusRow {
    stable: bool,
    modules_known: bool,
    modules_total: usize,
    modules_stable_percent: Option<f64>,
    unstable_modules: Vec<String>,
    services_known: bool,
    unsatisfied_services: Vec<String>,
    captured_at: String,
}

impl From<InstanceState> for StatusRow {
    fn from(state: InstanceState) -> Self {
        let modules = state.modules.snapshot();
        let services = state.services.snapshot();

        Self {
            stable: state.is_stable(),
            modules_known: modules.is_some(),
            modules_total: modules.map(|m| m.total()).unwrap_or(0),
            modules_stable_percent: modules.map(|m| m.stable_percent()),
            unstable_modules: modules
                .map(|m| {
                    m.unstable()
                        .map(|module| format!("{} ({})", module.symbolic_name, module.state))
                        .collect()
                })
                .unwrap_or_default(),
            services_known: services.is_some(),
            unsatisfied_services: services
                .map(|s| s.unsatisfied().map(|service| service.name.clone()).collect())
                .unwrap_or_default(),
            captured_at: state.captured_at.to_rfc3339(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable
    let default_filter = if cli.verbose {
        "pkgsync=debug,pkgsync_core=debug,info"
    } else {
        "pkgsync=info,pkgsync_core=info,warn"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    run_cli(cli)
}

fn run_cli(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let instances = select_instances(&config, &cli.instance)?;
    let session =
        SyncSession::from_config(&config).with_progress(Arc::new(ConsoleProgress::new()));
    let format = cli.format;

    match cli.command {
        Commands::Upload { file } => {
            let outcomes = session.for_each_instance(instances, move |sync| sync.upload(&file))?;
            print_outcomes(&outcomes, format, |r| format!("uploaded to {}", r.path))
        }
        Commands::Install(args) => {
            let target = PackageTarget::from_args(args, &config)?;
            let outcomes = session.for_each_instance(instances, move |sync| {
                let path = target.remote_path(sync)?;
                let result = sync.install(&path)?;
                Ok(Located { path, result })
            })?;
            print_outcomes(&outcomes, format, |r| format!("installed {}", r.path))
        }
        Commands::Activate(args) => {
            let target = PackageTarget::from_args(args, &config)?;
            let outcomes = session.for_each_instance(instances, move |sync| {
                let path = target.remote_path(sync)?;
                let result = sync.activate(&path)?;
                Ok(Located { path, result })
            })?;
            print_outcomes(&outcomes, format, |r| {
                format!("activated {}: {}", r.path, r.result.message)
            })
        }
        Commands::Build(args) => {
            let target = PackageTarget::from_args(args, &config)?;
            let outcomes = session.for_each_instance(instances, move |sync| {
                let path = target.remote_path(sync)?;
                let result = sync.build(&path)?;
                Ok(Located { path, result })
            })?;
            print_outcomes(&outcomes, format, |r| {
                format!("built {}: {}", r.path, r.result.message)
            })
        }
        Commands::Deploy { file } => {
            let outcomes = session.for_each_instance(instances, move |sync| sync.deploy(&file))?;
            print_outcomes(&outcomes, format, |d| format!("deployed {}", d.path))
        }
        Commands::Distribute { file } => {
            let outcomes =
                session.for_each_instance(instances, move |sync| sync.distribute(&file))?;
            print_outcomes(&outcomes, format, |d| format!("distributed {}", d.path))
        }
        Commands::Delete { package, yes } => {
            let target = PackageTarget::from_args(package, &config)?;
            if !confirm("Delete the package from these instances?", &instances, yes)? {
                println!("Delete cancelled.");
                return Ok(());
            }
            let outcomes = session.for_each_instance(instances, move |sync| {
                let path = target.remote_path(sync)?;
                let result = sync.delete(&path)?;
                Ok(Located { path, result })
            })?;
            print_outcomes(&outcomes, format, |r| format!("deleted {}", r.path))
        }
        Commands::Uninstall { package, yes } => {
            let target = PackageTarget::from_args(package, &config)?;
            if !confirm("Uninstall the package from these instances?", &instances, yes)? {
                println!("Uninstall cancelled.");
                return Ok(());
            }
            let outcomes = session.for_each_instance(instances, move |sync| {
                let path = target.remote_path(sync)?;
                let result = sync.uninstall(&path)?;
                Ok(Located { path, result })
            })?;
            print_outcomes(&outcomes, format, |r| format!("uninstalled {}", r.path))
        }
        Commands::List => {
            let outcomes =
                session.for_each_instance(instances, |sync| sync.list_packages(true).cloned())?;
            print_outcomes(&outcomes, format, describe_listing)
        }
        Commands::Status => {
            let outcomes = session.for_each_instance(instances, |sync| {
                Ok(StatusRow::from(sync.determine_instance_state()))
            })?;
            print_outcomes(&outcomes, format, describe_status)
        }
        Commands::Reload { yes } => {
            if !confirm("Restart these instances?", &instances, yes)? {
                println!("Reload cancelled.");
                return Ok(());
            }
            let outcomes = session.for_each_instance(instances, |sync| sync.reload())?;
            print_outcomes(&outcomes, format, |_| "restart requested".to_string())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let store = match path {
        Some(path) => ConfigStore::from_path(path),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            ConfigStore::discover(&cwd)?
        }
    };

    debug!("Loading configuration from {}", store.config_path().display());
    let config = store.load()?;
    if config.instance.is_empty() {
        anyhow::bail!(
            "No instances configured in {}. Add an [instance.<name>] table with a url.",
            store.config_path().display()
        );
    }
    Ok(config)
}

fn select_instances(config: &SyncConfig, pattern: &str) -> Result<Vec<Instance>> {
    let pattern = WildcardPattern::new(pattern);
    let selected: Vec<Instance> = config
        .instances()
        .into_iter()
        .filter(|instance| pattern.matches(instance.name()))
        .collect();

    if selected.is_empty() {
        anyhow::bail!("No configured instance matches '{}'", pattern.as_str());
    }
    debug!("Selected {} instance(s) matching '{}'", selected.len(), pattern.as_str());
    Ok(selected)
}

fn confirm(prompt: &str, instances: &[Instance], yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }

    println!("{}", style("  Instances").bold());
    for instance in instances {
        println!("  {}", style(instance).green());
    }
    println!();

    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(confirmed)
}

/// Print one line per instance; fails when any instance failed.
fn print_outcomes<R: Serialize>(
    outcomes: &[InstanceOutcome<R>],
    format: OutputFormat,
    describe: impl Fn(&R) -> String,
) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for outcome in outcomes {
                match &outcome.result {
                    Ok(value) => println!(
                        "{} {} {}",
                        style("✓").green(),
                        style(&outcome.instance).bold(),
                        describe(value)
                    ),
                    Err(e) => println!(
                        "{} {} {}",
                        style("✗").red(),
                        style(&outcome.instance).bold(),
                        e
                    ),
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<_> = outcomes
                .iter()
                .map(|outcome| match &outcome.result {
                    Ok(value) => serde_json::json!({
                        "instance": outcome.instance,
                        "success": true,
                        "result": value,
                    }),
                    Err(e) => serde_json::json!({
                        "instance": outcome.instance,
                        "success": false,
                        "error": e.to_string(),
                        "errors": e.reported_errors(),
                    }),
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Quiet => {
            for outcome in outcomes {
                if let Err(e) = &outcome.result {
                    eprintln!("{}: {}", outcome.instance, e);
                }
            }
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    if failed > 0 {
        anyhow::bail!("{} of {} instance(s) failed", failed, outcomes.len());
    }
    Ok(())
}

fn describe_listing(listing: &PackageListing) -> String {
    let mut lines = vec![format!("{} package(s)", listing.packages().len())];
    for package in listing.packages() {
        let marker = if package.is_installed() { "installed" } else { "uploaded" };
        lines.push(format!(
            "    {:<40} {:<10} {}",
            package.identity().to_string(),
            marker,
            package.path
        ));
    }
    lines.join("\n")
}

fn describe_status(row: &StatusRow) -> String {
    if !row.modules_known && !row.services_known {
        return "state unknown".to_string();
    }

    let mut parts = Vec::new();
    match row.modules_stable_percent {
        Some(percent) => parts.push(format!(
            "{} modules, {:.1}% stable",
            row.modules_total, percent
        )),
        None => parts.push("modules unknown".to_string()),
    }
    if row.services_known {
        parts.push(format!("{} unsatisfied service(s)", row.unsatisfied_services.len()));
    } else {
        parts.push("services unknown".to_string());
    }

    let verdict = if row.stable {
        style("stable").green().to_string()
    } else {
        style("unstable").yellow().to_string()
    };
    format!("{} ({})", verdict, parts.join(", "))
}
