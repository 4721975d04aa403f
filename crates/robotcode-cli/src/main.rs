//! RobotCode CLI
//!
//! Launches the Robot Framework language server over stdio or TCP.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use robotcode_lsp::RobotCodeLanguageServer;
use tower_lsp::{LspService, Server};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "robotcode")]
#[command(about = "Language server for Robot Framework test and resource files")]
#[command(version = robotcode_core::VERSION)]
struct Cli {
    /// Transport used to talk to the editor.
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// TCP port to listen on when `--transport tcp` is selected.
    #[arg(long, default_value_t = 6969)]
    port: u16,

    /// Workspace root the server resolves relative imports against.
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Verbosity (can be used multiple times).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Stdio,
    Tcp,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    robotcode_core::init_tracing();

    let workspace = cli
        .workspace
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    info!("starting robotcode-lsp, workspace root: {}", workspace.display());

    match cli.transport {
        Transport::Stdio => run_stdio(workspace).await,
        Transport::Tcp => run_tcp(workspace, cli.port).await,
    }
}

async fn run_stdio(workspace: PathBuf) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(|client| RobotCodeLanguageServer::new(client, workspace));
    Server::new(stdin, stdout, socket).serve(service).await;
}

async fn run_tcp(workspace: PathBuf, port: u16) {
    let addr = format!("127.0.0.1:{port}");
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            return;
        }
    };
    info!("listening on {addr}");

    let (stream, _) = match listener.accept().await {
        Ok(pair) => pair,
        Err(err) => {
            error!("failed to accept connection: {err}");
            return;
        }
    };
    let (read, write) = tokio::io::split(stream);

    let (service, socket) = LspService::new(|client| RobotCodeLanguageServer::new(client, workspace));
    Server::new(read, write, socket).serve(service).await;
}
