//! Model descriptors and the catalog seam.
//!
//! The catalog maps a device classification to the concrete model artifact
//! the downloadable backend should use. Selection is synchronous and pure;
//! a catalog always returns a descriptor (absence of a better match falls
//! back to its default entry).

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::device::{CapabilityTier, DeviceClassification};

/// Metadata identifying which model artifact a device should use.
///
/// Produced by a [`ModelCatalog`]; consumed read-only by the local-model
/// provider. The artifact transport is plain HTTP from `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Tier this descriptor targets.
    pub tier: CapabilityTier,

    /// Human-readable model name (e.g. "gemma-2b-it-q4").
    pub name: String,

    /// File name of the artifact under the model directory.
    pub file_name: String,

    /// Download URL of the artifact.
    pub url: String,

    /// Expected artifact size in bytes. `0` means unknown; when non-zero
    /// the transfer verifies the received byte count against it.
    #[serde(default)]
    pub artifact_size_bytes: u64,

    /// Quantization label, if any (e.g. "q4_k_m").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<String>,

    /// Context window in tokens, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u32>,
}

/// Seam for tier-to-model selection.
///
/// Pure lookup with no failure path: a catalog that has no specific match
/// for a classification still returns its default descriptor.
pub trait ModelCatalog: Send + Sync {
    /// Select the model descriptor for the given classification.
    fn select_for_device(&self, classification: &DeviceClassification) -> ModelDescriptor;
}

/// Catalog backed by a static descriptor table.
///
/// Holds one descriptor per tier plus a required default. Deserialises
/// from JSON for server-driven catalogs:
///
/// ```json
/// {
///   "default": { "tier": "standard", "name": "…", "file_name": "…", "url": "…" },
///   "entries": [ { "tier": "foundation", "name": "…", "file_name": "…", "url": "…" } ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetCatalog {
    /// Fallback descriptor when no entry matches the tier.
    pub default: ModelDescriptor,

    /// Tier-specific overrides, first match wins.
    #[serde(default)]
    pub entries: Vec<ModelDescriptor>,
}

impl PresetCatalog {
    /// Create a catalog with only a default descriptor.
    pub fn new(default: ModelDescriptor) -> Self {
        Self {
            default,
            entries: Vec::new(),
        }
    }

    /// Add a tier-specific entry.
    pub fn with_entry(mut self, entry: ModelDescriptor) -> Self {
        self.entries.push(entry);
        self
    }

    /// Parse a catalog from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl ModelCatalog for PresetCatalog {
    fn select_for_device(&self, classification: &DeviceClassification) -> ModelDescriptor {
        self.entries
            .iter()
            .find(|d| d.tier == classification.tier)
            .unwrap_or(&self.default)
            .clone()
    }
}
