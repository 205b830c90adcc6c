//! Common types for the claim importer: persisted keys, API error
//! classification, bounded polling and logging setup

#![deny(missing_docs)]

pub mod error;
pub mod poll;
pub mod telemetry;

pub use error::ApiError;

// =============================================================================
// Claim annotations
// =============================================================================
//
// These keys are read and written by other components (the importer image,
// users, tooling) and must not change.

/// Annotation holding the full URI of the object to import
pub const ANN_ENDPOINT: &str = "kubevirt.io/storage.import.endpoint";

/// Annotation naming the Secret with endpoint credentials
pub const ANN_SECRET: &str = "kubevirt.io/storage.import.secretName";

/// Annotation recording the last known import status of a claim
pub const ANN_STATUS: &str = "kubevirt.io/storage.import.status";

/// Annotation set on importer pods created by this controller
pub const ANN_CREATED_BY: &str = "kubevirt.io/storage.createdByController";

/// Label identifying the manager of importer pods
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Value of [`LABEL_MANAGED_BY`] for resources created by this controller
pub const LABEL_MANAGED_BY_IMPORTER: &str = "importer-controller";

// =============================================================================
// Importer pod contract
// =============================================================================

/// Prefix of importer pod names, also used as the container name
pub const IMPORTER_POD_NAME: &str = "importer";

/// Image repository of the importer; the tag is configurable
pub const IMPORTER_IMAGE_REPOSITORY: &str = "docker.io/jcoperh/importer";

/// Mount path of the claim inside the importer container
pub const IMPORTER_DATA_DIR: &str = "/data";

/// Environment variable carrying the endpoint URI
pub const IMPORTER_ENDPOINT: &str = "IMPORTER_ENDPOINT";

/// Environment variable carrying the access key id
pub const IMPORTER_ACCESS_KEY_ID: &str = "IMPORTER_ACCESS_KEY_ID";

/// Environment variable carrying the secret key
pub const IMPORTER_SECRET_KEY: &str = "IMPORTER_SECRET_KEY";

/// Key of the access key id inside the credential Secret
pub const KEY_ACCESS: &str = "accessKeyId";

/// Key of the secret key inside the credential Secret
pub const KEY_SECRET: &str = "secretKey";
