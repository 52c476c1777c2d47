use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rigkit_catalog::{CatalogConfig, CollectionFilter, ComponentName, FeatureSetId};
use rigkit_scanner::{CatalogReport, ComponentDetail, ComponentEntry, ScanOptions, Scanner};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rigkit-scanner", about = "Lists the rig components Rigkit can find")]
struct Cli {
    /// Catalog configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Built-in rigs directory
    #[arg(long, global = true, value_name = "DIR")]
    builtin: Option<PathBuf>,

    /// Directory holding installed feature sets
    #[arg(long, global = true, value_name = "DIR")]
    feature_sets: Option<PathBuf>,

    /// Load one external feature set from DIR (its rigs folder), replacing the installed ones
    #[arg(long, global = true, value_name = "ID=DIR", value_parser = parse_feature_set)]
    feature_set: Option<(FeatureSetId, PathBuf)>,

    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List selectable rig types
    List {
        /// Restrict to a collection; `None` lists rigs outside any collection
        #[arg(long)]
        collection: Option<String>,
        /// Include implementation modules
        #[arg(long)]
        all: bool,
    },
    /// List rig collections
    Collections,
    /// Show one component
    Show { name: ComponentName },
    /// Show the parameters each rig type registers
    Params,
}

fn parse_feature_set(value: &str) -> Result<(FeatureSetId, PathBuf), String> {
    let (id, dir) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ID=DIR, got {value}"))?;
    let id = FeatureSetId::external(id).map_err(|err| err.to_string())?;
    Ok((id, PathBuf::from(dir)))
}

fn parse_filter(value: &str) -> CollectionFilter {
    match value {
        "All" => CollectionFilter::All,
        "None" => CollectionFilter::None,
        other => CollectionFilter::Named(other.to_string()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => CatalogConfig::default_path()?,
    };
    let config = CatalogConfig::open(&config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;

    let options = ScanOptions {
        builtin_root: cli.builtin,
        feature_sets_dir: cli.feature_sets,
        feature_set: cli.feature_set,
    };
    let result = Scanner::new(config).scan(&options)?;
    let registry = &result.registry;

    match cli.command {
        Command::List { collection, all } => {
            let report =
                CatalogReport::new(registry, &result.summaries).with_failed_sets(&result.failed);
            let filter = collection
                .as_deref()
                .map(parse_filter)
                .unwrap_or_default();
            let entries: Vec<&ComponentEntry> = report
                .components
                .iter()
                .filter(|entry| all || entry.selectable)
                .filter(|entry| filter.matches(&entry.name))
                .collect();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for entry in entries {
                    let marker = if entry.implementation { " [impl]" } else { "" };
                    println!("{} ({}){marker}", entry.name, entry.feature_set);
                }
                for skipped in &report.skipped {
                    eprintln!("skipped {}: {}", skipped.path.display(), skipped.reason);
                }
            }
            for failed in &report.failed_sets {
                eprintln!("feature set {} not loaded: {}", failed.feature_set, failed.reason);
            }
        }
        Command::Collections => {
            let items = registry.collection_filter_items();
            if cli.json {
                let labels: Vec<_> = items.iter().map(|item| item.label()).collect();
                println!("{}", serde_json::to_string_pretty(&labels)?);
            } else {
                for item in items {
                    println!("{item}");
                }
            }
        }
        Command::Show { name } => {
            let detail = ComponentDetail::from(registry.get(&name)?);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                let entry = &detail.entry;
                println!("{}", entry.name);
                println!("  feature set: {}", entry.feature_set);
                println!("  source: {}", entry.source.display());
                if let Some(generator) = &entry.entry {
                    println!("  entry point: {generator}");
                }
                if let Some(description) = &entry.description {
                    println!("  {description}");
                }
                for parameter in &detail.parameters {
                    println!("  - {} ({:?})", parameter.name, parameter.kind);
                }
            }
        }
        Command::Params => {
            let schema = registry.parameter_schema();
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&schema)?);
            } else {
                for (name, parameters) in schema {
                    let names: Vec<_> = parameters.iter().map(|p| p.name.as_str()).collect();
                    println!("{name}: {}", names.join(", "));
                }
            }
        }
    }
    Ok(())
}
