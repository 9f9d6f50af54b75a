//! CLI entry point for spnego-fetch.
//!
//! Takes the hostname of the Kerberos-protected web server, reads the
//! resource list, and runs the concurrent fetch. Anything other than exactly
//! one hostname argument prints a usage line and exits cleanly; all other
//! fatal conditions propagate with a diagnostic and a non-zero exit.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use spnego_fetch::{Config, GssProvider, SpnegoFetcher};

#[derive(Parser)]
#[command(
    name = "spnego-fetch",
    version,
    about = "Fetch resources from a Kerberos-protected web server using SPNEGO"
)]
struct Cli {
    /// Hostname of the web server protected by Kerberos
    hostname: Vec<String>,

    /// Port the server listens on
    #[arg(long, default_value_t = 81)]
    port: u16,

    /// Number of concurrent workers
    #[arg(long)]
    workers: Option<usize>,

    /// Newline-delimited file listing the resources to fetch
    #[arg(long)]
    file_list: Option<PathBuf>,

    /// Directory fetched resources are written into
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path to the Kerberos realm configuration file
    #[arg(long)]
    realm_config: Option<PathBuf>,

    /// Path to the login-module configuration file
    #[arg(long)]
    login_config: Option<PathBuf>,

    /// Login-configuration entry to authenticate as
    #[arg(long)]
    entry: Option<String>,
}

#[cfg(feature = "gssapi")]
fn gss_provider() -> spnego_fetch::Result<Arc<dyn GssProvider>> {
    Ok(Arc::new(spnego_fetch::SystemGssProvider::new()))
}

#[cfg(not(feature = "gssapi"))]
fn gss_provider() -> spnego_fetch::Result<Arc<dyn GssProvider>> {
    Err(spnego_fetch::Error::Other(
        "this build has no GSS-API backend; rebuild with --features gssapi".to_string(),
    ))
}

/// The run needs exactly one hostname; zero or surplus arguments route to the
/// usage line
fn single_hostname(args: Vec<String>) -> Option<String> {
    <[String; 1]>::try_from(args).ok().map(|[hostname]| hostname)
}

#[tokio::main]
async fn main() -> spnego_fetch::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let Some(hostname) = single_hostname(cli.hostname) else {
        println!(
            "Usage: spnego-fetch takes one argument [hostname] of the web server protected by kerberos."
        );
        return Ok(());
    };

    let mut config = Config::for_host(hostname);
    config.target.port = cli.port;
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }
    if let Some(file_list) = cli.file_list {
        config.fetch.file_list = file_list;
    }
    if let Some(output_dir) = cli.output_dir {
        config.fetch.output_dir = output_dir;
    }
    if let Some(realm_config) = cli.realm_config {
        config.login.realm_config = realm_config;
    }
    if let Some(login_config) = cli.login_config {
        config.login.login_config = login_config;
    }
    if let Some(entry) = cli.entry {
        config.login.entry_name = entry;
    }

    let provider = gss_provider()?;
    let fetcher = SpnegoFetcher::new(config, provider).await?;

    let result = fetcher.run_from_file().await;
    fetcher.close();

    let report = result?;
    tracing::info!(
        fetched = report.fetched,
        skipped_blank = report.skipped_blank,
        "done"
    );
    Ok(())
}
