//! Metadata export: manifest, split lock, overlap registry, errors, config

pub mod config;
pub mod json;

pub use config::{write_config, EffectiveConfig};
pub use json::{
    load_manifest, write_errors, write_json_atomic, write_manifest, write_overlap_registry, ErrorEntry,
    ErrorStage, ManifestEntry, OverlapRegistry,
};
