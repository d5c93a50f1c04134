//! Port traits at the collaborator seams.

pub mod config_port;
pub mod data_port;
pub mod export_port;
pub mod metadata_port;
pub mod store_port;
