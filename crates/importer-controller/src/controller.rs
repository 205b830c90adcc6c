//! Import reconciliation controller
//!
//! Drives one claim through the import pipeline per reconcile:
//! - look the claim up in the informer cache (deleted claims are skipped)
//! - resolve the endpoint and the optional credential Secret
//! - submit the importer pod
//! - record `In process` on the claim's status annotation
//!
//! Claims without an endpoint annotation are ignored. A claim whose endpoint
//! annotation is blank is marked `Failed` and left until the user edits it.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::Store;
use kube::{Client, ResourceExt};
use tracing::{debug, info, instrument, warn};

use crate::claim::{claim_from_store, ClaimKey};
use crate::client::{KubeClient, KubeClientImpl};
use crate::config::ImporterConfig;
use crate::credentials::resolve_credential_name;
use crate::endpoint::{is_import_claim, resolve_endpoint};
use crate::error::ImportError;
use crate::pod::create_importer_pod;
use crate::status::{current_phase, ensure_status, ImportPhase};

/// Requeue delay after a retryable failure
const ERROR_REQUEUE_SECS: u64 = 30;

/// Context for the import controller
pub struct Context {
    /// Kubernetes client for API operations (trait object for testability)
    pub kube: Arc<dyn KubeClient>,
    /// Informer cache of claims, shared with the watcher
    pub claims: Store<PersistentVolumeClaim>,
    /// Reconciler settings
    pub config: ImporterConfig,
}

impl Context {
    /// Create a context backed by a real Kubernetes client
    pub fn new(
        client: Client,
        claims: Store<PersistentVolumeClaim>,
        config: ImporterConfig,
    ) -> Self {
        Self {
            kube: Arc::new(KubeClientImpl::new(client)),
            claims,
            config,
        }
    }

    /// Create a context for testing with a mock client
    #[cfg(test)]
    pub fn for_testing(
        kube: Arc<dyn KubeClient>,
        claims: Store<PersistentVolumeClaim>,
        config: ImporterConfig,
    ) -> Self {
        Self {
            kube,
            claims,
            config,
        }
    }
}

/// Reconcile one claim through the import pipeline.
///
/// The claim is re-read from the informer cache by key; the object passed
/// in only identifies it.
#[instrument(skip(claim, ctx), fields(claim = %claim.name_any()))]
pub async fn reconcile(
    claim: Arc<PersistentVolumeClaim>,
    ctx: Arc<Context>,
) -> Result<Action, ImportError> {
    let key = ClaimKey::from_claim(&claim)?;

    let Some(claim) = claim_from_store(&ctx.claims, &key) else {
        debug!(claim = %key, "claim no longer in cache, skipping");
        return Ok(Action::await_change());
    };

    if !is_import_claim(&claim) {
        return Ok(Action::await_change());
    }

    if current_phase(&claim) == Some(ImportPhase::InProgress) {
        debug!(claim = %key, "importer already submitted");
        return Ok(Action::await_change());
    }

    info!(claim = %key, "reconciling import claim");
    let kube = ctx.kube.as_ref();

    let endpoint = match resolve_endpoint(&claim) {
        Ok(endpoint) => endpoint,
        Err(e @ ImportError::MissingEndpoint { .. }) => {
            warn!(claim = %key, error = %e, "claim cannot be imported");
            ensure_status(kube, &claim, ImportPhase::Failed, &ctx.config.status_poll).await?;
            // needs a user edit, the next change to the claim retriggers us
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e),
    };

    let secret = resolve_credential_name(kube, &claim).await?;

    let created = create_importer_pod(
        kube,
        &endpoint,
        secret.as_deref(),
        &claim,
        &ctx.config.image,
    )
    .await;
    match created {
        Ok(_) => {}
        Err(ImportError::WorkerCreation { pod, source, .. }) if source.is_conflict() => {
            // left over from an attempt whose status write failed
            info!(claim = %key, %pod, "importer pod already exists");
        }
        Err(e) => return Err(e),
    }

    ensure_status(kube, &claim, ImportPhase::InProgress, &ctx.config.status_poll).await?;
    Ok(Action::await_change())
}

/// Error policy for the import controller.
///
/// Retryable failures are requeued after 30 seconds; the rest wait for the
/// claim to change.
pub fn error_policy(
    claim: Arc<PersistentVolumeClaim>,
    error: &ImportError,
    _ctx: Arc<Context>,
) -> Action {
    let name = error.claim().unwrap_or_else(|| claim.name_any());
    warn!(
        claim = %name,
        retryable = error.is_retryable(),
        error = %error,
        "import reconcile failed"
    );

    if error.is_retryable() {
        Action::requeue(Duration::from_secs(ERROR_REQUEUE_SECS))
    } else {
        Action::await_change()
    }
}

/// Log one item of the controller's output stream.
///
/// Reconciler failures are skipped, [`error_policy`] has already logged them.
pub fn log_reconcile_result<T, E, Q>(
    result: Result<T, controller::Error<E, Q>>,
) -> std::future::Ready<()>
where
    T: std::fmt::Debug,
    E: std::error::Error + 'static,
    Q: std::error::Error + 'static,
{
    match result {
        Ok(reconciled) => debug!(?reconciled, "claim reconciliation completed"),
        Err(controller::Error::ReconcilerFailed(..)) => {}
        Err(e) => tracing::error!(error = %e, "claim controller error"),
    }
    std::future::ready(())
}
