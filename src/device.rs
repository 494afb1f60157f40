//! Device capability classification types and the classifier seam.
//!
//! The classification heuristic itself lives outside this crate: callers
//! supply a [`DeviceClassifier`] implementation (hardware probe, remote
//! config, …). The crate ships [`FixedClassifier`] for config-driven
//! deployments and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Capability bucket determining which inference backends are eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    /// Device can run the OS-native, platform-bundled generative model.
    Foundation,

    /// Device can run a separately downloaded open-weight model.
    Standard,

    /// Device cannot run local inference at all.
    Unsupported,
}

impl CapabilityTier {
    /// Tier name for logging and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Foundation => "foundation",
            Self::Standard => "standard",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Result of classifying a device's inference capability.
///
/// Immutable once produced; the manager replaces it wholesale on each
/// resolution cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceClassification {
    /// Capability bucket for backend selection.
    pub tier: CapabilityTier,

    /// Physical RAM in gigabytes.
    pub ram_gb: u32,

    /// CPU architecture string (e.g. "arm64").
    pub architecture: String,

    /// Marketing/model identifier of the device.
    pub device_model: String,

    /// Whether the platform reports the native foundation model as
    /// eligible on this device. Advisory only; the manager still probes
    /// the foundation provider before committing to it.
    pub native_foundation_eligible: bool,
}

impl DeviceClassification {
    /// Classification for a foundation-tier device.
    pub fn foundation(device_model: impl Into<String>, architecture: impl Into<String>, ram_gb: u32) -> Self {
        Self {
            tier: CapabilityTier::Foundation,
            ram_gb,
            architecture: architecture.into(),
            device_model: device_model.into(),
            native_foundation_eligible: true,
        }
    }

    /// Classification for a standard-tier device.
    pub fn standard(device_model: impl Into<String>, architecture: impl Into<String>, ram_gb: u32) -> Self {
        Self {
            tier: CapabilityTier::Standard,
            ram_gb,
            architecture: architecture.into(),
            device_model: device_model.into(),
            native_foundation_eligible: false,
        }
    }

    /// Classification for an unsupported device.
    pub fn unsupported(device_model: impl Into<String>) -> Self {
        Self {
            tier: CapabilityTier::Unsupported,
            ram_gb: 0,
            architecture: String::new(),
            device_model: device_model.into(),
            native_foundation_eligible: false,
        }
    }
}

/// Seam for the device-capability heuristic.
///
/// `classify` may fail (hardware probe unavailable, remote config
/// unreachable). Failure leaves the manager unresolved so a later
/// `resolve()` can retry.
#[async_trait]
pub trait DeviceClassifier: Send + Sync {
    /// Classify the current device's inference capability.
    async fn classify(&self) -> Result<DeviceClassification>;
}

/// Classifier that always returns a preset classification.
///
/// Useful when the tier is decided out-of-band (server-driven config,
/// test fixtures).
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    classification: DeviceClassification,
}

impl FixedClassifier {
    /// Create a classifier returning the given classification.
    pub fn new(classification: DeviceClassification) -> Self {
        Self { classification }
    }
}

#[async_trait]
impl DeviceClassifier for FixedClassifier {
    async fn classify(&self) -> Result<DeviceClassification> {
        Ok(self.classification.clone())
    }
}
