//! Configuration loaded from pkgsync.toml
//!
//! Lookup order: an explicit path, `./pkgsync.toml`, then
//! `<config dir>/pkgsync/pkgsync.toml`. A missing file means defaults.

pub mod parser;
pub mod schema;
pub mod store;

pub use parser::{parse_sync_toml, parse_sync_toml_str};
pub use schema::{
    ConnectionConfig, InstallConfig, InstanceConfigEntry, PackageConfig, SyncConfig, UploadConfig,
};
pub use store::{CONFIG_FILE_NAME, ConfigStore};
