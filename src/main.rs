//! # Service Registrar
//!
//! Entry point for the registration handler.
//!
//! ## Usage
//!
//! ```bash
//! # Handle an infrastructure-change event (file or stdin), print the response
//! service-registrar handle --event event.json
//! cat event.json | service-registrar handle
//!
//! # Wait for an admin API to become healthy
//! service-registrar probe --admin-url https://restate.example.com:9070
//!
//! # Show the worst-case run duration for the current configuration
//! service-registrar budget --services 3 --max-pruned 10
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use service_registrar::config::RegistrarConfig;
use service_registrar::controller::backoff::{ExponentialBackoff, TokioSleeper};
use service_registrar::controller::reconciler::admin::AdminClient;
use service_registrar::controller::reconciler::health::wait_until_healthy;
use service_registrar::controller::reconciler::Reconciler;
use service_registrar::controller::retry::RetryPolicy;
use service_registrar::event::{ResourceEvent, ResponseStatus};
use service_registrar::observability::init_logging;
use service_registrar::secrets::{resolve_auth_header, AwsSecretResolver};
use service_registrar::transport::{ReqwestTransport, TrustMode};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

/// Service Registrar
#[derive(Parser)]
#[command(name = "service-registrar")]
#[command(about = "Registers Lambda service handlers with a durable-execution runtime")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one infrastructure-change event
    Handle {
        /// Event JSON file; reads stdin when omitted
        #[arg(short, long, value_name = "FILE")]
        event: Option<PathBuf>,
    },
    /// Poll the admin API health endpoint until it answers 2xx
    Probe {
        /// Admin API base URL
        #[arg(long, value_name = "URL")]
        admin_url: String,

        /// Secret holding the bearer token
        #[arg(long, value_name = "SECRET_REF")]
        auth_secret: Option<String>,

        /// Accept self-signed certificates
        #[arg(long)]
        insecure: bool,
    },
    /// Print the worst-case duration of a registration run
    Budget {
        /// Services exposed by the deployment
        #[arg(long, default_value_t = 1)]
        services: usize,

        /// Deletions allowed per pruning run; omit when pruning is disabled
        #[arg(long)]
        max_pruned: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Configure rustls crypto provider FIRST, before any TLS client is built
    // We use ring as the crypto provider
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let cli = Cli::parse();
    let config = RegistrarConfig::from_env();
    init_logging(&config)?;

    info!(
        "Starting Service Registrar (build {} at {})",
        env!("BUILD_GIT_HASH"),
        env!("BUILD_DATETIME")
    );

    match cli.command {
        Commands::Handle { event } => handle(config, event).await,
        Commands::Probe {
            admin_url,
            auth_secret,
            insecure,
        } => probe(&config, &admin_url, auth_secret.as_deref(), insecure).await,
        Commands::Budget {
            services,
            max_pruned,
        } => {
            budget(&config, services, max_pruned);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn handle(config: RegistrarConfig, event_path: Option<PathBuf>) -> Result<ExitCode> {
    let raw = match &event_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin())
            .context("Failed to read event from stdin")?,
    };
    let event: ResourceEvent = serde_json::from_str(&raw).context("Failed to parse event")?;

    if !event.request_type.is_removal() {
        let max_pruned = event.pruning_budget();
        if config.exceeds_platform_timeout(1, max_pruned) {
            warn!(
                "Worst-case run duration {}s exceeds the platform timeout of {}s; lower the attempt budgets",
                config.worst_case_duration(1, max_pruned).as_secs(),
                config.platform_timeout_secs
            );
        }
    }

    let transport = ReqwestTransport::new().context("Failed to build HTTP transport")?;
    let secrets = AwsSecretResolver::new(config.secrets_manager_endpoint.as_deref()).await;
    let reconciler = Reconciler::new(
        Arc::new(transport),
        Arc::new(secrets),
        Arc::new(TokioSleeper),
        config,
    );

    let response = reconciler.handle_event(&event).await;
    println!(
        "{}",
        serde_json::to_string(&response).context("Failed to serialize response")?
    );

    Ok(match response.status {
        ResponseStatus::Success => ExitCode::SUCCESS,
        ResponseStatus::Failed => ExitCode::FAILURE,
    })
}

async fn probe(
    config: &RegistrarConfig,
    admin_url: &str,
    auth_secret: Option<&str>,
    insecure: bool,
) -> Result<ExitCode> {
    let transport = ReqwestTransport::new().context("Failed to build HTTP transport")?;
    let secrets = AwsSecretResolver::new(config.secrets_manager_endpoint.as_deref()).await;
    let auth = resolve_auth_header(&secrets, auth_secret).await?;
    let trust = if insecure {
        TrustMode::Insecure
    } else {
        TrustMode::Strict
    };
    let base_url = admin_url.trim_end_matches('/');
    let admin = AdminClient::new(&transport, base_url, auth, trust);
    let policy = RetryPolicy::new(config.health_check_max_attempts, ExponentialBackoff::default());

    match wait_until_healthy(&admin, &policy, &TokioSleeper).await {
        Ok(()) => {
            println!("healthy");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn budget(config: &RegistrarConfig, services: usize, max_pruned: Option<u32>) {
    let worst_case = config.worst_case_duration(services, max_pruned);
    println!(
        "worst-case run duration: {}s (platform timeout {}s, health attempts {}, registration attempts {})",
        worst_case.as_secs(),
        config.platform_timeout_secs,
        config.health_check_max_attempts,
        config.registration_max_attempts
    );
    if config.exceeds_platform_timeout(services, max_pruned) {
        println!("WARNING: the run can outlive the platform timeout");
    }
}
