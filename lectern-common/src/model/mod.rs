// src/model/mod.rs
// Declares the modules within the model directory.
pub mod artifact;
pub mod source;
pub mod version;

// Re-export
pub use artifact::{
    CachedPatch, InstallReport, InstalledPlugin, LocalArtifact, PluginUpdateCandidate,
    ReconcileOutcome, ReleaseAsset, ReleaseInfo, RemoteArtifact, UpdateCandidate,
};
pub use source::{Source, SourceKind, SourceList};
