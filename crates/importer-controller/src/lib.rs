//! Import controller for PersistentVolumeClaims
//!
//! Watches claims annotated with an import endpoint and, for each one:
//! - Resolves the endpoint and the optional credential Secret
//! - Creates an importer pod that copies the data into the claim
//! - Records progress in the claim's status annotation, retrying on
//!   conflicting writes
//!
//! The copy itself runs in the importer image; watching the importer pod,
//! retrying failed imports and cleaning up finished pods are left to the
//! surrounding controller loop.

pub mod claim;
pub mod client;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod pod;
pub mod status;

pub use claim::{claim_from_store, ClaimKey};
pub use client::{KubeClient, KubeClientImpl};
pub use config::{Cli, ImporterConfig};
pub use controller::{error_policy, log_reconcile_result, reconcile, Context};
pub use credentials::resolve_credential_name;
pub use endpoint::resolve_endpoint;
pub use error::ImportError;
pub use pod::create_importer_pod;
pub use status::{ensure_status, ImportPhase};
