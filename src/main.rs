//! HyperFleet event adapter binary: loads one `AdapterTaskConfig`, wires a
//! transport, and replays a newline-delimited JSON CloudEvents file through the
//! engine. The actual broker subscription (pulling events off a live pub/sub
//! topic) is an external collaborator this binary does not implement,
//! event ingestion here is file-based so the binary stays runnable end to end
//! without one.

mod server;
mod settings;

use std::fs;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use hyperfleet_adapter_core::AdapterTaskConfig;
use hyperfleet_adapter_engine::{EventHandler, Metrics, StepEngine};
use hyperfleet_adapter_transport::{KubernetesTransport, ManifestWorkConfig, ManifestWorkTransport, Transport, TlsMaterial};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use settings::Settings;

#[derive(Parser)]
#[command(name = "hyperfleet-adapter", about = "Event-to-reconciliation adapter for HyperFleet clusters")]
struct Cli {
    /// Path to the AdapterTaskConfig YAML document
    #[arg(long)]
    config: PathBuf,

    /// Path to a newline-delimited JSON file of CloudEvents-shaped events to replay
    #[arg(long)]
    events: PathBuf,

    /// Which transport backend to apply resources through
    #[arg(long, default_value = "direct")]
    transport: TransportKind,

    /// Kubernetes API server base URL (direct transport)
    #[arg(long)]
    k8s_base_url: Option<String>,

    /// Bearer token for the Kubernetes API server (direct transport)
    #[arg(long)]
    k8s_bearer_token: Option<String>,

    /// Maestro gRPC endpoint (manifestwork transport)
    #[arg(long)]
    manifestwork_grpc_endpoint: Option<String>,

    /// Maestro REST base URL (manifestwork transport)
    #[arg(long)]
    manifestwork_http_base_url: Option<String>,

    /// CloudEvents source identifier this adapter delivers work as (manifestwork transport)
    #[arg(long, default_value = "hyperfleet-adapter")]
    manifestwork_source_id: String,

    /// Skip TLS verification entirely (manifestwork transport; testing only)
    #[arg(long, default_value_t = false)]
    insecure: bool,

    /// Bind address for the /health and /metrics HTTP surface
    #[arg(long)]
    metrics_bind: Option<String>,

    /// Log level (overrides HYPERFLEET_LOG_LEVEL / the default "info")
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum TransportKind {
    Direct,
    Manifestwork,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(cli.metrics_bind.clone(), cli.log_level.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("hyperfleet_adapter={}", settings.log_level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_text = fs::read_to_string(&cli.config)?;
    let config_value: serde_json::Value = serde_yaml::from_str(&config_text)?;
    let config = AdapterTaskConfig::from_value(config_value)?;
    tracing::info!(name = %config.metadata.name, version = %config.adapter.version, "loaded adapter task config");

    let transport: Arc<dyn Transport> = build_transport(&cli)?;
    let engine = StepEngine::new(config, transport);
    let metrics = Arc::new(Metrics::new());
    let handler = EventHandler::new(engine, metrics.clone());

    let bind_addr = settings.metrics_bind_addr.clone();
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, "failed to bind metrics server");
                return;
            }
        };
        tracing::info!(addr = %bind_addr, "metrics server listening");
        if let Err(e) = axum::serve(listener, server::router(metrics)).await {
            tracing::error!(error = %e, "metrics server exited");
        }
    });

    replay_events(&handler, &cli.events).await
}

fn build_transport(cli: &Cli) -> anyhow::Result<Arc<dyn Transport>> {
    match cli.transport {
        TransportKind::Direct => {
            let base_url = cli.k8s_base_url.clone().ok_or_else(|| anyhow::anyhow!("--k8s-base-url is required for the direct transport"))?;
            Ok(Arc::new(KubernetesTransport::new(base_url, cli.k8s_bearer_token.clone())))
        }
        TransportKind::Manifestwork => {
            let grpc_endpoint = cli
                .manifestwork_grpc_endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--manifestwork-grpc-endpoint is required for the manifestwork transport"))?;
            let http_base_url = cli
                .manifestwork_http_base_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--manifestwork-http-base-url is required for the manifestwork transport"))?;
            let tls = TlsMaterial {
                ca_cert_pem: env_bytes("HYPERFLEET_MANIFESTWORK_CA"),
                client_cert_pem: env_bytes("HYPERFLEET_MANIFESTWORK_CERT"),
                client_key_pem: env_bytes("HYPERFLEET_MANIFESTWORK_KEY"),
                bearer_token: std::env::var("HYPERFLEET_MANIFESTWORK_TOKEN").ok(),
                insecure: cli.insecure,
            };
            let transport = ManifestWorkTransport::new(ManifestWorkConfig {
                grpc_endpoint,
                http_base_url,
                source_id: cli.manifestwork_source_id.clone(),
                tls,
            })?;
            Ok(Arc::new(transport))
        }
    }
}

fn env_bytes(var: &str) -> Option<Vec<u8>> {
    std::env::var(var).ok().map(|path| fs::read(path)).transpose().ok().flatten()
}

async fn replay_events(handler: &EventHandler, path: &PathBuf) -> anyhow::Result<()> {
    let file = fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: serde_json::Value = serde_json::from_str(&line)?;
        match handler.handle(event, now_unix()).await {
            Ok(ctx) => tracing::debug!(status = %ctx.final_status(), "event replayed"),
            Err(e) => tracing::error!(error = %e, "event envelope failed to parse, skipping"),
        }
    }
    Ok(())
}

fn now_unix() -> u64 {
    std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
