//! HTTP server setup and graceful shutdown
//!
//! Builds the router and middleware stack, binds the listener and serves
//! until the shutdown future completes. In-flight requests then get
//! `shutdown_timeout` to finish before the server is dropped.

use axum::{extract::Request, Router};
use std::{future::IntoFuture, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, sync::oneshot};
use tower::util::MapRequest;
use tracing::{error, info, instrument, warn};

use crate::{
    config::SystemConfig,
    http::{
        handlers::{routes, AppState},
        middleware::{self, normalize_request_path, RateLimiter},
    },
    types::{Error, Result},
};

/// Router wrapped with path cleaning, ready to be served
pub type App = MapRequest<Router, fn(Request) -> Request>;

/// Start the HTTP server with the given configuration
#[instrument(skip_all)]
pub async fn start_server(
    config: SystemConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let rate_limiter = RateLimiter::from_config(&config.rate_limit)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to initialize rate limiter");
            e
        })?;

    let addr = config.server.listen_address();
    let grace = config.server.shutdown_timeout();

    info!(
        listen_addr = %addr,
        request_timeout = config.server.request_timeout,
        shutdown_timeout = config.server.shutdown_timeout,
        rate_limiting = rate_limiter.is_some(),
        debug_endpoints = config.debug.enabled,
        "Starting HTTP server"
    );

    let state = Arc::new(AppState::new(config, rate_limiter));
    let app = build_app(state);

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        error!(
            error = %e,
            addr = %addr,
            "Failed to bind to address"
        );
        Error::Io(e)
    })?;

    match listener.local_addr() {
        Ok(local_addr) => info!(local_addr = %local_addr, "HTTP server listening"),
        Err(_) => info!(addr = %addr, "HTTP server listening"),
    }

    run_until_shutdown(listener, app, grace, shutdown_signal).await
}

/// Serve `app` until `shutdown_signal` completes, then wait at most `grace`
/// for in-flight requests
pub async fn run_until_shutdown(
    listener: TcpListener,
    app: App,
    grace: Duration,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let (draining_tx, draining_rx) = oneshot::channel::<()>();

    let server = axum::serve(
        listener,
        axum::ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal.await;
        info!("Shutdown signal received, starting graceful shutdown");
        let _ = draining_tx.send(());
    });
    let mut server = std::pin::pin!(server.into_future());

    tokio::select! {
        biased;
        result = &mut server => {
            return match result {
                Ok(()) => {
                    info!("HTTP server shutdown complete");
                    Ok(())
                }
                Err(e) => {
                    error!(error = %e, "HTTP server error");
                    Err(Error::Io(e))
                }
            };
        }
        _ = draining_rx => {}
    }

    match tokio::time::timeout(grace, &mut server).await {
        Ok(Ok(())) => {
            info!("HTTP server shutdown complete");
            Ok(())
        }
        Ok(Err(e)) => {
            error!(error = %e, "HTTP server error during shutdown");
            Err(Error::Io(e))
        }
        Err(_) => {
            // Connection tasks still running end with the runtime
            warn!(
                grace_ms = grace.as_millis() as u64,
                "Graceful shutdown timed out, abandoning in-flight requests"
            );
            Ok(())
        }
    }
}

/// Create the Axum router with all endpoints and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    let router = routes(&state.config);
    middleware::apply(router, &state.config, state.rate_limiter.clone()).with_state(state)
}

/// Router plus path cleaning in front of routing
pub fn build_app(state: Arc<AppState>) -> App {
    into_app(create_router(state))
}

fn into_app(router: Router) -> App {
    MapRequest::new(router, normalize_request_path as fn(Request) -> Request)
}
