//! The generation pipeline behind the `rpcgen` binary.
//!
//! Everything fallible happens before anything touches the filesystem:
//! extraction and both generators run fully in memory, and only then are
//! stale outputs removed and the new files written. A failing run therefore
//! never leaves partial output behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;

use rpcgen_codegen::{GeneratorConfig, generate_client, generate_server};
use rpcgen_parser::extract_file;

/// One generation request, paths resolved.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub source: PathBuf,
    pub server_out: PathBuf,
    pub client_out: PathBuf,
}

impl GenerateRequest {
    /// Derive output locations from the source path: the dispatcher lands
    /// next to the source, the client in a `client/` subdirectory.
    pub fn with_default_outputs(source: PathBuf) -> Self {
        let server_out = sibling(&source, "_rpc.rs");
        let client_out = match source.parent() {
            Some(parent) => parent.join("client").join(file_name(&source, "_client.rs")),
            None => PathBuf::from("client").join(file_name(&source, "_client.rs")),
        };
        Self {
            source,
            server_out,
            client_out,
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "generated".to_string())
}

fn file_name(path: &Path, suffix: &str) -> String {
    format!("{}{suffix}", stem(path))
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    path.with_file_name(file_name(path, suffix))
}

/// What a successful run did, for the closing summary.
#[derive(Debug)]
pub struct GenerateSummary {
    pub services: Vec<(String, usize)>,
    pub server_out: PathBuf,
    pub client_out: PathBuf,
    pub elapsed: Duration,
}

/// Run one generation end to end.
pub fn generate(request: &GenerateRequest) -> anyhow::Result<GenerateSummary> {
    let started = Instant::now();

    let info = extract_file(&request.source)
        .with_context(|| format!("extracting {}", request.source.display()))?;
    tracing::info!(
        services = info.services.len(),
        methods = info.method_count(),
        "extracted {}",
        request.source.display()
    );

    // Both artifacts are rendered before any write happens.
    let config = GeneratorConfig::new();
    let server_source = generate_server(&config, &info);
    let client_source = generate_client(&config, &info);

    write_fresh(&request.server_out, &server_source)
        .with_context(|| format!("writing {}", request.server_out.display()))?;
    write_fresh(&request.client_out, &client_source)
        .with_context(|| format!("writing {}", request.client_out.display()))?;

    Ok(GenerateSummary {
        services: info
            .services
            .iter()
            .map(|s| (s.name.clone(), s.methods.len()))
            .collect(),
        server_out: request.server_out.clone(),
        client_out: request.client_out.clone(),
        elapsed: started.elapsed(),
    })
}

/// Remove a stale output, make room for the new one, write it.
fn write_fresh(path: &Path, contents: &str) -> anyhow::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
        tracing::debug!("removed stale {}", path.display());
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent)?;
        tracing::debug!("created {}", parent.display());
    }
    fs::write(path, contents)?;
    Ok(())
}
