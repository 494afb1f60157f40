//! Inference provider variants and their capability traits.
//!
//! Three mutually exclusive variants sit behind [`TextProvider`]:
//! [`FoundationProvider`] (OS-native model), [`LocalModelProvider`]
//! (downloaded open weights, additionally implementing
//! [`ModelLifecycle`]), and [`UnsupportedProvider`] (no-op). The manager
//! installs exactly one of them per resolution cycle.

mod download;
pub mod foundation;
pub mod local;
pub mod traits;
pub mod unsupported;

pub use foundation::{FOUNDATION_PROVIDER, FoundationBackend, FoundationProvider};
pub use local::{InferenceEngine, LocalModelProvider};
pub use traits::{DownloadResult, DownloadState, ModelLifecycle, TextProvider};
pub use unsupported::{UNSUPPORTED_PROVIDER, UnsupportedProvider};
