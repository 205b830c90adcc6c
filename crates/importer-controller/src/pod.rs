//! Importer pod construction
//!
//! Builds the short-lived pod that copies the endpoint's data into a claim.
//! The pod runs a single `importer` container with the claim mounted at
//! `/data`, and receives the endpoint (and optionally the credentials)
//! through its environment.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, EnvVar, EnvVarSource, PersistentVolumeClaim, PersistentVolumeClaimVolumeSource,
    Pod, PodSpec, SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::ResourceExt;
use tracing::info;

use importer_common::{
    ANN_CREATED_BY, IMPORTER_ACCESS_KEY_ID, IMPORTER_DATA_DIR, IMPORTER_ENDPOINT,
    IMPORTER_POD_NAME, IMPORTER_SECRET_KEY, KEY_ACCESS, KEY_SECRET, LABEL_MANAGED_BY,
    LABEL_MANAGED_BY_IMPORTER,
};

use crate::client::KubeClient;
use crate::error::ImportError;

/// Name of the pod volume backed by the claim
const DATA_VOLUME_NAME: &str = "data-path";

/// Derive the importer pod name for a claim.
pub fn importer_pod_name(claim_name: &str) -> String {
    format!("{}-{}", IMPORTER_POD_NAME, claim_name)
}

/// Environment of the importer container.
///
/// The endpoint is always passed by value. Credentials are only referenced
/// when a Secret name is given, and are read from the Secret by the kubelet
/// rather than copied into the pod.
pub fn importer_env(endpoint: &str, secret: Option<&str>) -> Vec<EnvVar> {
    let mut env = vec![EnvVar {
        name: IMPORTER_ENDPOINT.to_string(),
        value: Some(endpoint.to_string()),
        ..Default::default()
    }];

    if let Some(secret) = secret {
        env.push(secret_env(IMPORTER_ACCESS_KEY_ID, secret, KEY_ACCESS));
        env.push(secret_env(IMPORTER_SECRET_KEY, secret, KEY_SECRET));
    }
    env
}

fn secret_env(var: &str, secret: &str, key: &str) -> EnvVar {
    EnvVar {
        name: var.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: secret.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build the importer pod for a claim.
///
/// The pod:
/// - Is named `importer-<claim>` in the claim's namespace
/// - Carries the created-by annotation and the managed-by label
/// - Mounts the claim read-write at `/data`
/// - Never restarts; a failed import is left for the caller to observe
pub fn build_importer_pod(
    endpoint: &str,
    secret: Option<&str>,
    claim: &PersistentVolumeClaim,
    image: &str,
) -> Pod {
    let claim_name = claim.name_any();

    let container = Container {
        name: IMPORTER_POD_NAME.to_string(),
        image: Some(image.to_string()),
        image_pull_policy: Some("Always".to_string()),
        env: Some(importer_env(endpoint, secret)),
        volume_mounts: Some(vec![VolumeMount {
            name: DATA_VOLUME_NAME.to_string(),
            mount_path: IMPORTER_DATA_DIR.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let volume = Volume {
        name: DATA_VOLUME_NAME.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: claim_name.clone(),
            read_only: Some(false),
        }),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(importer_pod_name(&claim_name)),
            namespace: claim.namespace(),
            annotations: Some(BTreeMap::from([(
                ANN_CREATED_BY.to_string(),
                "yes".to_string(),
            )])),
            labels: Some(BTreeMap::from([(
                LABEL_MANAGED_BY.to_string(),
                LABEL_MANAGED_BY_IMPORTER.to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![container],
            volumes: Some(vec![volume]),
            restart_policy: Some("Never".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Build and submit the importer pod for a claim.
///
/// Fails with [`ImportError::WorkerCreation`] when the API rejects the pod,
/// including when a pod of the same name already exists.
pub async fn create_importer_pod(
    client: &dyn KubeClient,
    endpoint: &str,
    secret: Option<&str>,
    claim: &PersistentVolumeClaim,
    image: &str,
) -> Result<Pod, ImportError> {
    let namespace = claim.namespace().unwrap_or_default();
    let pod = build_importer_pod(endpoint, secret, claim, image);
    let pod_name = pod.name_any();

    let created = client
        .create_pod(&namespace, &pod)
        .await
        .map_err(|source| ImportError::WorkerCreation {
            namespace: namespace.clone(),
            name: claim.name_any(),
            pod: pod_name.clone(),
            source,
        })?;

    info!(
        pod = %pod_name,
        %namespace,
        %image,
        credentials = secret.is_some(),
        "importer pod created"
    );
    Ok(created)
}
