//! Kubernetes API seam used by the import reconciler

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod, Secret};
use kube::api::{Api, PostParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use importer_common::ApiError;

/// Trait abstracting the Kubernetes calls made while importing a claim
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production. Every method is a single remote call with
/// no retry of its own.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KubeClient: Send + Sync {
    /// Get a Secret by namespace and name
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ApiError>;

    /// Get the current copy of a claim from the API server
    async fn get_claim(&self, namespace: &str, name: &str)
        -> Result<PersistentVolumeClaim, ApiError>;

    /// Replace a claim, conditional on its `resourceVersion`
    ///
    /// Fails with [`ApiError::Conflict`] when the stored object changed since
    /// `claim` was read.
    async fn update_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ApiError>;

    /// Create a pod in the given namespace
    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ApiError>;
}

/// Real Kubernetes client implementation
pub struct KubeClientImpl {
    client: Client,
}

impl KubeClientImpl {
    /// Create a new KubeClientImpl wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl KubeClient for KubeClientImpl {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ApiError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn get_claim(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<PersistentVolumeClaim, ApiError> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn update_claim(
        &self,
        claim: &PersistentVolumeClaim,
    ) -> Result<PersistentVolumeClaim, ApiError> {
        let namespace = claim.namespace().unwrap_or_default();
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), &namespace);
        // replace carries metadata.resourceVersion, so a stale copy is rejected with 409
        Ok(api
            .replace(&claim.name_any(), &PostParams::default(), claim)
            .await?)
    }

    async fn create_pod(&self, namespace: &str, pod: &Pod) -> Result<Pod, ApiError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), pod).await?)
    }
}
