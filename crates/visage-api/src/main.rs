//! visage-api - HTTP API server for the visage face gallery

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visage_core::defaults;
use visage_core::{FaceDetector, SyncBackendKind, VisageConfig};
use visage_gallery::Gallery;
use visage_inference::{HttpFaceDetector, LazyDetector};
use visage_storage::{DurableSync, FilesystemBlobStore};

use visage_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "visage=debug,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "visage_api=debug,visage_gallery=debug,visage_storage=info,visage_inference=info,tower_http=debug"
            .into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    // Optionally create a file appender with daily rotation
    let _file_guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("visage-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(non_blocking);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            } else {
                layer = layer.with_ansi(false); // no ANSI in files
            }
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console-only output
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let config = VisageConfig::from_env()?;
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);

    info!(
        data_dir = %config.data_dir.display(),
        threshold = config.threshold,
        sync_backend = %config.sync.backend,
        detector_url = %config.detector.base_url,
        "Configuration loaded"
    );

    // Detector: built on first use, exactly once
    let detector_config = config.detector.clone();
    let detector = Arc::new(LazyDetector::new("face-detector (pending)", move || {
        let detector: Arc<dyn FaceDetector> =
            Arc::new(HttpFaceDetector::from_config(&detector_config));
        Ok(detector)
    }));

    if let (SyncBackendKind::Filesystem, Some(path)) = (&config.sync.backend, &config.sync.path) {
        if let Err(e) = FilesystemBlobStore::new(path).validate().await {
            warn!(path = %path.display(), error = %e, "Sync directory failed validation; pushes will fail");
        }
    }
    let sync = DurableSync::from_config(&config.sync)?;
    let gallery = Arc::new(Gallery::from_config(&config, sync, detector.clone()));
    gallery.bootstrap().await?;

    // Warm the detector in the background so the first request does not pay for it
    {
        let detector = detector.clone();
        tokio::spawn(async move {
            if let Err(e) = detector.get().await {
                warn!(error = %e, "Detector warm-up failed; will retry on first request");
            }
        });
    }

    let app = router(AppState::new(gallery), defaults::MAX_BODY_SIZE_BYTES);

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
