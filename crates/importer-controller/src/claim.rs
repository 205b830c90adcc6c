//! Claim identity, annotation access and cache lookup

use std::fmt;
use std::sync::Arc;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;

use crate::error::ImportError;

/// Namespace-qualified claim name, as used for work queue keys
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClaimKey {
    /// Claim namespace
    pub namespace: String,
    /// Claim name
    pub name: String,
}

impl ClaimKey {
    /// Parse a `namespace/name` key
    pub fn parse(key: &str) -> Result<Self, ImportError> {
        match key.split_once('/') {
            Some((namespace, name))
                if !namespace.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ImportError::InvalidKey(key.to_string())),
        }
    }

    /// Key of a claim object; claims are always namespaced
    pub fn from_claim(claim: &PersistentVolumeClaim) -> Result<Self, ImportError> {
        let name = claim.name_any();
        let namespace = claim
            .namespace()
            .ok_or_else(|| ImportError::MissingNamespace(name.clone()))?;
        Ok(Self { namespace, name })
    }

    fn object_ref(&self) -> ObjectRef<PersistentVolumeClaim> {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl fmt::Display for ClaimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Value of an annotation on the claim, if set
pub fn annotation<'a>(claim: &'a PersistentVolumeClaim, key: &str) -> Option<&'a str> {
    claim
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(key))
        .map(String::as_str)
}

/// Set an annotation, creating the annotation map if needed
pub(crate) fn set_annotation(claim: &mut PersistentVolumeClaim, key: &str, value: &str) {
    claim
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(key.to_string(), value.to_string());
}

/// Look a claim up in the shared informer cache.
///
/// Returns `None` when the claim is no longer cached, which happens when it
/// was deleted after being queued. The returned object is shared with the
/// cache and must not be modified.
pub fn claim_from_store(
    store: &Store<PersistentVolumeClaim>,
    key: &ClaimKey,
) -> Option<Arc<PersistentVolumeClaim>> {
    store.get(&key.object_ref())
}
