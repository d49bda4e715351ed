//! Instrument-to-stem mapping and output profiles

pub mod medleydb;
pub mod moisesdb;
pub mod profiles;

pub use medleydb::{resolve_medleydb_label, MedleyOverrides};
pub use moisesdb::{route_stem, route_sub_stem, StemRoute};
pub use profiles::{ProfileKind, StemProfile, CATCH_ALL, VDBO, VDBO_GP};
