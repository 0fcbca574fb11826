//! Command line DID resolver
//!
//! Resolves a DID or dereferences a DID URL and prints the result envelope.

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use did_ledger_resolver::{ContentType, ResolutionOptions, Resolver, ResolverConfig};

#[derive(Parser)]
#[command(name = "did-ledger-resolver")]
#[command(about = "Resolve ledger DIDs and dereference DID URLs", long_about = None)]
#[command(version)]
struct Cli {
    /// DID or DID URL
    identifier: String,

    /// Requested representation, as an Accept header value
    #[arg(short, long, env = "RESOLVER_ACCEPT", default_value = "application/did+ld+json")]
    accept: String,

    /// Log level
    #[arg(long, env = "RESOLVER_LOG_LEVEL", default_value = "did_ledger_resolver=info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "RESOLVER_LOG_JSON")]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    // stdout carries the envelope, logs go to stderr
    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let resolver = match ResolverConfig::from_env().and_then(Resolver::from_config) {
        Ok(resolver) => resolver,
        Err(err) => {
            error!(error = %err, "failed to start resolver");
            return ExitCode::FAILURE;
        }
    };

    let options = ResolutionOptions::new(ContentType::from_accept(&cli.accept));
    let response = resolver.respond(&cli.identifier, options).await;
    println!("{}", response.body);

    if response.status == 200 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
