//! `vhdlstuff`: the LSP host binary. Parses the CLI, wires logging, picks a
//! transport (stdio, optionally journaled, or a journal replayed back),
//! and runs a `VhdlStuffServer` over it.

#![forbid(unsafe_code)]

mod cli;
mod collaborators;
mod language;
mod logging;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use lsp_core::server::Server;
use lsp_core::transport::replay::ReplayTransport;
use lsp_core::transport::stdio::process_stdio;
use lsp_core::transport::Transport;

use crate::cli::Cli;
use crate::language::VhdlStuffServer;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let exit_code = err.exit_code();
            err.print().ok();
            std::process::exit(if exit_code == 0 { 0 } else { 1 });
        }
    };

    if cli.version {
        println!("vhdlstuff {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let _logging_guard = logging::init(cli.stderr, cli.logfile.as_deref(), cli.replay.is_some());

    let exit_code = match &cli.replay {
        Some(journal_path) => run_replay(journal_path),
        None => run_live(&cli),
    };
    std::process::exit(exit_code);
}

/// Reads requests from stdin and writes responses to stdout, optionally
/// mirroring every frame to a journal file for later replay.
fn run_live(cli: &Cli) -> i32 {
    let transport: Arc<dyn Transport> = Arc::new(process_stdio());
    if let Some(journal) = &cli.journal {
        if transport.tee(journal) {
            info!("writing journal to {}", journal.display());
        } else {
            error!("unable to write journal to {}", journal.display());
        }
    }
    run_server(transport)
}

/// Replays a previously recorded journal instead of talking to a live
/// client, then reports how well the recorded responses matched.
fn run_replay(journal_path: &Path) -> i32 {
    let transport = match ReplayTransport::open(journal_path) {
        Ok(transport) => Arc::new(transport),
        Err(err) => {
            error!("failed to open replay journal {}: {err}", journal_path.display());
            return 1;
        }
    };
    let dyn_transport: Arc<dyn Transport> = transport.clone();
    let exit_code = run_server(dyn_transport);
    let stats = transport.stats();
    info!(
        matches = stats.matches,
        ooo_matches = stats.ooo_matches,
        timeouts = stats.timeouts,
        ignores = stats.ignores,
        "replay finished"
    );
    exit_code
}

fn run_server(transport: Arc<dyn Transport>) -> i32 {
    let server = Server::new(transport, Arc::new(VhdlStuffServer::new()));
    match server.run() {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            error!("server error: {err}");
            1
        }
    }
}
