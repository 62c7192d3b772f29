/*!
 * Dispatcher Tracing
 * Structured tracing for dispatched operations using the tracing crate
 *
 * Features:
 * - One span per executed operation, tagged with its submission sequence
 * - Slow-operation warnings
 * - JSON-formatted logs for structured parsing
 */

use crate::core::limits::{ENV_TRACE_JSON, SLOW_OPERATION_THRESHOLD};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - RENDER_DISPATCH_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        info!(json = use_json, "Structured tracing initialized");
    }
}

/// Span covering one operation's execution on the worker
pub struct OperationSpan {
    span: tracing::Span,
    start: Instant,
    name: &'static str,
    seq: u64,
}

impl OperationSpan {
    pub fn new(name: &'static str, seq: u64, blocking: bool) -> Self {
        let span = span!(
            Level::DEBUG,
            "render_op",
            op = name,
            seq = seq,
            blocking = blocking,
            duration_us = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            name,
            seq,
        }
    }

    /// Enter the span context for the duration of the operation
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for OperationSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_us", duration.as_micros() as u64);
        let _entered = self.span.enter();

        if duration > SLOW_OPERATION_THRESHOLD {
            warn!(
                op = self.name,
                seq = self.seq,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow operation detected"
            );
        } else {
            debug!(
                op = self.name,
                seq = self.seq,
                duration_us = duration.as_micros() as u64,
                "operation completed"
            );
        }
    }
}
