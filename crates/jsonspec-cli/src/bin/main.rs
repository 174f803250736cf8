//! jsonspec CLI
//!
//! # Usage
//!
//! ```bash
//! jsonspec validate --schema schema.json document.json
//! jsonspec check --schema schema.json
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` directives are honored; `-v` raises the
//! default level from warn to info, debug and trace.

use clap::Parser;
use jsonspec_cli::cli::log_level;
use jsonspec_cli::{run_cli, JsonspecCli};

fn main() {
    let cli = JsonspecCli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level(cli.verbose, cli.quiet).into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = run_cli(cli);
    std::process::exit(exit_code.into());
}
