//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider` — active provider name (e.g. "foundation", "local-…")
//! - `tier` — capability tier from the classification
//! - `status` — outcome: "ok" or "error"

/// Total `resolve()` cycles that committed a provider (or failed).
///
/// Labels: `provider`, `tier`, `status` ("ok" | "error").
pub const RESOLUTIONS_TOTAL: &str = "muninn_resolutions_total";

/// Total generation requests dispatched to the active provider.
///
/// Labels: `provider`, `status` ("ok" | "error").
pub const GENERATE_REQUESTS_TOTAL: &str = "muninn_generate_requests_total";

/// Generation request duration in seconds.
///
/// Labels: `provider`.
pub const GENERATE_DURATION_SECONDS: &str = "muninn_generate_duration_seconds";

/// Total model artifact downloads.
///
/// Labels: `model`, `status` ("ok" | "error" | "cancelled").
pub const DOWNLOADS_TOTAL: &str = "muninn_downloads_total";

/// Total bytes received for model artifacts (including cancelled transfers).
///
/// Labels: `model`.
pub const DOWNLOAD_BYTES_TOTAL: &str = "muninn_download_bytes_total";
