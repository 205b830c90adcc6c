//! Endpoint credential resolution
//!
//! A claim may name a Secret holding the access key pair for its endpoint.
//! The Secret is allowed to be created after the claim: a missing Secret is
//! not an error, the importer pod is created referencing it and the kubelet
//! starts the pod once the Secret exists.

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::ResourceExt;
use tracing::info;

use importer_common::ANN_SECRET;

use crate::claim::annotation;
use crate::client::KubeClient;
use crate::error::ImportError;

/// Return the name of the Secret to attach to the importer pod.
///
/// `None` means the endpoint is used without credentials. Only a failed
/// lookup other than "not found" is an error.
pub async fn resolve_credential_name(
    client: &dyn KubeClient,
    claim: &PersistentVolumeClaim,
) -> Result<Option<String>, ImportError> {
    let namespace = claim.namespace().unwrap_or_default();
    let name = claim.name_any();

    let secret = match annotation(claim, ANN_SECRET).map(str::trim) {
        Some(secret) if !secret.is_empty() => secret.to_string(),
        Some(_) => {
            info!(
                claim = %name,
                %namespace,
                annotation = ANN_SECRET,
                "secret name is blank, importing without credentials"
            );
            return Ok(None);
        }
        None => {
            info!(
                claim = %name,
                %namespace,
                annotation = ANN_SECRET,
                "no secret annotation, importing without credentials"
            );
            return Ok(None);
        }
    };

    info!(claim = %name, %namespace, %secret, "retrieving endpoint secret");
    match client.get_secret(&namespace, &secret).await {
        Ok(_) => Ok(Some(secret)),
        Err(e) if e.is_not_found() => {
            info!(
                claim = %name,
                %namespace,
                %secret,
                "secret is missing, importer pod will run once it is created"
            );
            Ok(Some(secret))
        }
        Err(source) => Err(ImportError::CredentialLookup {
            namespace,
            name,
            secret,
            source,
        }),
    }
}
