//! symgraph CLI: symbol and call graphs for Python source trees.
//!
//! Usage:
//!   symgraph build [--output graph.json]   # Whole graph as JSON
//!   symgraph stats [--json]                # Graph statistics
//!   symgraph module <logical-name>         # One module and its edges

use clap::Parser;
use symgraph::cli::{init_tracing, run, Cli};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
