//! Dashboard HTTP surface.
//!
//! This module provides:
//! - Rate limiting for HTTP requests
//! - The dashboard page and the three JSON data endpoints
//! - Prometheus metrics and liveness endpoints
//!
//! Handlers are read-only over the shared monitor state; they never block
//! the sampling engine beyond a brief read lock.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;
use hyper::server::conn::http1;
use hyper_util::rt::TokioIo;
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use tokio::net::TcpListener;

use crate::errors::error_logging;
use crate::export;
use crate::monitor_config::MonitorConfig;
use crate::observability;
use crate::store::MonitorState;

/// The embedded single-page dashboard served at `/`.
static DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// Default request budget per client IP per window. Sized so a dashboard
/// polling every sample period stays far under the limit.
const RATE_LIMIT_MAX_REQUESTS: u32 = 600;
const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Simple rate limiter for HTTP requests
#[derive(Debug)]
pub struct RateLimiter {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
    max_requests: u32,
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            requests: Mutex::new(HashMap::new()),
            max_requests,
            window_secs,
        }
    }

    /// Check if request is allowed for the given IP
    pub fn is_allowed(&self, ip: &str) -> bool {
        let now = Instant::now();
        let window = Duration::from_secs(self.window_secs);

        let mut requests = self
            .requests
            .lock()
            .expect("Failed to acquire mutex for rate limiting");
        let client_requests = requests.entry(ip.to_string()).or_default();

        // Remove old requests outside the window
        client_requests.retain(|&time| now.duration_since(time) < window);

        // Check if under limit
        if client_requests.len() >= self.max_requests as usize {
            return false;
        }

        // Add current request
        client_requests.push(now);
        true
    }
}

fn json_response(value: serde_json::Value) -> hyper::Response<String> {
    let mut response = hyper::Response::new(value.to_string());
    response.headers_mut().insert(
        "content-type",
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn html_response(body: &'static str) -> hyper::Response<String> {
    let mut response = hyper::Response::new(body.to_string());
    response.headers_mut().insert(
        "content-type",
        hyper::header::HeaderValue::from_static("text/html; charset=utf-8"),
    );
    response
}

/// Start the dashboard HTTP server.
///
/// Binds the configured port, then serves connections from a spawned
/// accept loop; returns once the listener is bound.
pub async fn start_dashboard_server(
    state: Arc<RwLock<MonitorState>>,
    metrics_handle: PrometheusHandle,
    config: &MonitorConfig,
) -> Result<()> {
    let addr = if config.bind_all_interfaces {
        SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), config.http_port)
    } else {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), config.http_port)
    };

    tracing::info!(
        "Starting dashboard server on {} (bind_all: {})",
        addr,
        config.bind_all_interfaces
    );

    let rate_limiter = Arc::new(RateLimiter::new(
        RATE_LIMIT_MAX_REQUESTS,
        RATE_LIMIT_WINDOW_SECS,
    ));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Dashboard server listening on {}", addr);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer_addr)) => {
                    let state = state.clone();
                    let metrics_handle = metrics_handle.clone();
                    let rate_limiter = rate_limiter.clone();

                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = hyper::service::service_fn(
                            move |req: hyper::Request<hyper::body::Incoming>| {
                                let state = state.clone();
                                let metrics_handle = metrics_handle.clone();
                                let peer_ip = peer_addr.ip().to_string();
                                let rate_limiter = rate_limiter.clone();
                                async move {
                                    // Rate limiting check
                                    if !rate_limiter.is_allowed(&peer_ip) {
                                        let mut response =
                                            hyper::Response::new("Rate limit exceeded".to_string());
                                        *response.status_mut() =
                                            hyper::StatusCode::TOO_MANY_REQUESTS;
                                        return Ok::<_, std::convert::Infallible>(response);
                                    }

                                    let started = Instant::now();
                                    let method = req.method().to_string();
                                    let response = match (req.method(), req.uri().path()) {
                                        (&hyper::Method::GET, "/") => {
                                            html_response(DASHBOARD_HTML)
                                        }
                                        (&hyper::Method::GET, "/data") => {
                                            json_response(export::full_history(&state.read()))
                                        }
                                        (&hyper::Method::GET, "/dataCurrent") => {
                                            json_response(export::latest(&state.read()))
                                        }
                                        (&hyper::Method::GET, "/dataInfo") => {
                                            json_response(export::task_info(&state.read()))
                                        }
                                        (&hyper::Method::GET, "/metrics") => {
                                            let metrics = metrics_handle.render();
                                            let mut response = hyper::Response::new(metrics);
                                            response.headers_mut().insert(
                                                "content-type",
                                                hyper::header::HeaderValue::from_static(
                                                    "text/plain; version=0.0.4; charset=utf-8",
                                                ),
                                            );
                                            response
                                        }
                                        (&hyper::Method::GET, "/health/live") => {
                                            hyper::Response::new("OK".to_string())
                                        }
                                        _ => {
                                            let mut response =
                                                hyper::Response::new("Not Found".to_string());
                                            *response.status_mut() = hyper::StatusCode::NOT_FOUND;
                                            response
                                        }
                                    };

                                    observability::record_request_metrics(
                                        &method,
                                        response.status().as_u16(),
                                        started.elapsed(),
                                    );
                                    Ok(response)
                                }
                            },
                        );

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await
                        {
                            error_logging::log_network_error(
                                &err,
                                "serve_http_connection",
                                Some(&format!("{}:{}", peer_addr.ip(), peer_addr.port())),
                                None,
                            );
                        }
                    });
                }
                Err(e) => {
                    error_logging::log_network_error(
                        &e,
                        "accept_tcp_connection",
                        Some(&addr.to_string()),
                        None,
                    );
                }
            }
        }
    });

    Ok(())
}
