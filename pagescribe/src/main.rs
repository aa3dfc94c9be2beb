use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagescribe::api::{create_router, AppState};
use pagescribe::config::{Config, LogFormat, LoggingConfig, StorageBackendKind};
use pagescribe::ocr::OcrProvider;
use pagescribe::pdf::EmbeddedFont;
use pagescribe::storage::{
    ArtifactStore, DisabledArtifactStore, MemoryArtifactStore, S3ArtifactStore,
};
use pagescribe::summarize::SummaryProvider;

const MEMORY_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "pagescribe")]
#[command(about = "Book-page OCR service with summaries and PDF export")]
struct Args {
    /// Bind address (overrides PAGESCRIBE_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PAGESCRIBE_PORT)
    #[arg(long)]
    port: Option<u16>,
}

fn init_tracing(format: &LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pagescribe=info,tower_http=debug".into());

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    init_tracing(&LoggingConfig::from_env().format);

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Initializing OCR backend: {:?}...", config.ocr.backend);
    let ocr = OcrProvider::new(&config.ocr);
    if !ocr.is_available() {
        tracing::warn!("OCR unavailable - every image will fail with OcrError");
    }

    tracing::info!("Initializing summarizer: {}...", config.summary.model);
    let summarizer = SummaryProvider::new(&config.summary);
    if !summarizer.is_available() {
        tracing::warn!("Summarizer unavailable - summaries will be reported as warnings");
    }

    let mut memory_store: Option<Arc<MemoryArtifactStore>> = None;
    let store: Arc<dyn ArtifactStore> = match config.storage.backend {
        StorageBackendKind::S3 => {
            let s3 = S3ArtifactStore::new(&config.storage).await;
            if config.storage.configure_bucket {
                tracing::info!(bucket = %s3.bucket(), "Configuring bucket lifecycle and CORS...");
                if let Err(e) = s3
                    .configure_bucket(&config.server.cors_allowed_origins)
                    .await
                {
                    tracing::warn!("Bucket configuration failed: {} - continuing", e);
                }
            }
            Arc::new(s3)
        }
        StorageBackendKind::Memory => {
            tracing::info!("Using in-memory artifact storage");
            let memory = Arc::new(MemoryArtifactStore::new(
                &config.storage,
                &config.server.public_base_url,
            ));
            memory_store = Some(Arc::clone(&memory));
            memory
        }
        StorageBackendKind::Disabled => {
            tracing::warn!("Storage disabled - PDF generation and stored uploads will fail");
            Arc::new(DisabledArtifactStore)
        }
    };

    let cancel_token = CancellationToken::new();

    if let Some(memory) = memory_store.clone() {
        let token = cancel_token.child_token();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        tracing::info!("Artifact purge task shutting down...");
                        break;
                    }
                    _ = tokio::time::sleep(MEMORY_PURGE_INTERVAL) => {
                        let removed = memory.purge_expired(chrono::Utc::now()).await;
                        if removed > 0 {
                            tracing::debug!(removed, "Expired artifacts purged");
                        }
                    }
                }
            }
        });
    }

    let pdf_font = match config.pdf.font_path.as_deref() {
        Some(path) => match EmbeddedFont::load(path) {
            Ok(font) => {
                tracing::info!(font = %font.name(), "Embedding PDF font from {}", path);
                Some(font)
            }
            Err(e) => {
                tracing::warn!("PDF font unusable: {} - falling back to Helvetica", e);
                None
            }
        },
        None => None,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);

    let mut state = AppState::new(
        config,
        Arc::new(ocr),
        Arc::new(summarizer),
        store,
        memory_store,
    );
    if let Some(font) = pdf_font {
        state = state.with_pdf_font(font);
    }
    let app = create_router(state);

    tracing::info!("pagescribe starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/health", addr);
    tracing::info!("  API docs:     http://{}/api/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/openapi.json", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_token))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
    cancel_token.cancel();
}
