//! Import request resolution

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::ResourceExt;

use importer_common::ANN_ENDPOINT;

use crate::claim::annotation;
use crate::error::ImportError;

/// Whether the claim carries an import request at all
pub fn is_import_claim(claim: &PersistentVolumeClaim) -> bool {
    annotation(claim, ANN_ENDPOINT).is_some()
}

/// Return the full URI of the object to copy into the claim.
///
/// Fails with [`ImportError::MissingEndpoint`] when the annotation is absent
/// or empty.
pub fn resolve_endpoint(claim: &PersistentVolumeClaim) -> Result<String, ImportError> {
    match annotation(claim, ANN_ENDPOINT) {
        Some(ep) if !ep.is_empty() => Ok(ep.to_string()),
        _ => Err(ImportError::MissingEndpoint {
            namespace: claim.namespace().unwrap_or_default(),
            name: claim.name_any(),
            annotation: ANN_ENDPOINT,
        }),
    }
}
