//! Command-line interface for symgraph.
//!
//! Commands:
//! - build: the whole graph as JSON
//! - stats: counts and import cycles
//! - module: one module with its outgoing edges

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::SymgraphConfig;
use crate::graph::{build_graph_with_config, SymbolGraph};

#[derive(Parser, Debug)]
#[command(name = "symgraph")]
#[command(about = "Symbol and call graphs for Python source trees", long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Worker threads (overrides the config file, 0 = one per core)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Build the graph and emit it as JSON
    Build {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Indent the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Show graph statistics
    Stats {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show one module and the edges it originates
    Module {
        /// Dotted logical name, e.g. `pkg.sub.mod`
        name: String,
    },
}

/// Install the stderr log subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Config from `<root>/.symgraph/config.toml` with CLI overrides applied.
pub fn effective_config(cli: &Cli, root: &Path) -> SymgraphConfig {
    let mut config = SymgraphConfig::load(&SymgraphConfig::path_for(root));
    if let Some(workers) = cli.workers {
        config.workers = workers;
    }
    config
}

pub fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or_else(|_| cli.root.clone());
    let config = effective_config(&cli, &root);
    let graph = build_graph_with_config(&root, &config)
        .with_context(|| format!("failed to build graph for {}", root.display()))?;

    match cli.command {
        Commands::Build { output, pretty } => {
            emit(&graph.to_json(pretty)?, output.as_deref())?;
            info!(
                modules = graph.modules().len(),
                edges = graph.edges().len(),
                "graph written"
            );
        }
        Commands::Stats { json } => {
            let stats = graph.stats();
            if json {
                emit(&serde_json::to_string_pretty(&stats)?, None)?;
            } else {
                println!("{}", stats);
                print_cycles(&graph);
            }
        }
        Commands::Module { name } => {
            let report = graph
                .module_report(&name)
                .ok_or_else(|| anyhow!("no module named '{}'", name))?;
            emit(&serde_json::to_string_pretty(&report)?, None)?;
        }
    }
    Ok(())
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", text)?;
        }
    }
    Ok(())
}

fn print_cycles(graph: &SymbolGraph) {
    for cycle in graph.import_cycles() {
        let names: Vec<&str> = cycle
            .iter()
            .filter_map(|id| graph.module(*id))
            .map(|m| m.path.as_str())
            .collect();
        println!("  cycle: {}", names.join(" -> "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::{OsStr, OsString};
    use tempfile::TempDir;

    fn args(parts: &[&OsStr]) -> Vec<OsString> {
        parts.iter().map(|p| p.to_os_string()).collect()
    }

    #[test]
    fn test_parse_build_with_output() {
        let cli = Cli::try_parse_from(["symgraph", "build", "--output", "g.json", "-r", "src"]).unwrap();
        assert_eq!(cli.root, PathBuf::from("src"));
        assert_eq!(
            cli.command,
            Commands::Build {
                output: Some(PathBuf::from("g.json")),
                pretty: false
            }
        );
    }

    #[test]
    fn test_parse_module_and_globals() {
        let cli = Cli::try_parse_from(["symgraph", "-v", "--workers", "4", "module", "pkg.sub"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.workers, Some(4));
        assert_eq!(cli.command, Commands::Module { name: "pkg.sub".into() });
    }

    #[test]
    fn test_missing_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["symgraph"]).is_err());
    }

    #[test]
    fn test_workers_flag_overrides_config() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".symgraph")).unwrap();
        fs::write(dir.path().join(".symgraph/config.toml"), "workers = 8\n").unwrap();

        let cli = Cli::try_parse_from(["symgraph", "stats"]).unwrap();
        assert_eq!(effective_config(&cli, dir.path()).workers, 8);

        let cli = Cli::try_parse_from(["symgraph", "--workers", "2", "stats"]).unwrap();
        assert_eq!(effective_config(&cli, dir.path()).workers, 2);
    }

    #[test]
    fn test_build_writes_json_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def f():\n    pass\n").unwrap();
        let output = dir.path().join("graph.json");

        let cli = Cli::try_parse_from(args(&[
            OsStr::new("symgraph"),
            OsStr::new("--root"),
            dir.path().as_os_str(),
            OsStr::new("build"),
            OsStr::new("--output"),
            output.as_os_str(),
        ]))
        .unwrap();
        run(cli).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(json["stats"]["modules"], 1);
        assert_eq!(json["modules"][0]["path"], "a.py");
    }

    #[test]
    fn test_unknown_module_is_an_error() {
        let dir = TempDir::new().unwrap();
        let cli = Cli::try_parse_from(args(&[
            OsStr::new("symgraph"),
            OsStr::new("--root"),
            dir.path().as_os_str(),
            OsStr::new("module"),
            OsStr::new("nope"),
        ]))
        .unwrap();
        assert!(run(cli).is_err());
    }
}
