use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rpcgen_cli::{GenerateRequest, generate};

/// Generate a JSON-RPC 2.0 server dispatcher and typed client from one
/// annotated Rust source file.
#[derive(Debug, Parser)]
#[command(name = "rpcgen", version)]
struct Cli {
    /// Annotated source file. Falls back to $RPCGEN_SOURCE when omitted.
    source: Option<PathBuf>,

    /// Where to write the server dispatcher (default: <stem>_rpc.rs next
    /// to the source).
    #[arg(long)]
    server_out: Option<PathBuf>,

    /// Where to write the client (default: client/<stem>_client.rs under
    /// the source directory).
    #[arg(long)]
    client_out: Option<PathBuf>,

    /// Increase log verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    println!("rpcgen {}", env!("CARGO_PKG_VERSION"));

    let source = match cli.source.or_else(source_from_env) {
        Some(source) => source,
        None => bail!("no source file given (pass a path or set RPCGEN_SOURCE)"),
    };
    println!("Entrypoint: {}", source.display());

    let mut request = GenerateRequest::with_default_outputs(source);
    if let Some(server_out) = cli.server_out {
        request.server_out = server_out;
    }
    if let Some(client_out) = cli.client_out {
        request.client_out = client_out;
    }

    let summary = generate(&request)?;

    for (service, methods) in &summary.services {
        println!("Service {service}: {methods} method(s)");
    }
    println!("Generated server: {}", summary.server_out.display());
    println!("Generated client: {}", summary.client_out.display());
    println!("Duration: {}ms", summary.elapsed.as_millis());
    Ok(())
}

fn source_from_env() -> Option<PathBuf> {
    std::env::var_os("RPCGEN_SOURCE")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "rpcgen=info",
        1 => "rpcgen=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
