//! Claim status annotation
//!
//! The claim handed to the reconciler comes from the shared informer cache
//! and is read by other consumers, so it is never modified in place. Writes
//! go through a copy and are conditional on the copy's `resourceVersion`.
//! A conflict means another writer got there first: the latest claim is
//! re-read and the annotation is applied again, until the poll budget is
//! spent.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use tracing::{debug, info};

use importer_common::poll::{PollConfig, Poller};
use importer_common::ANN_STATUS;

use crate::claim::{annotation, set_annotation, ClaimKey};
use crate::client::KubeClient;
use crate::error::{ImportError, StatusOp, StatusUpdateFailure};

/// Import progress recorded in the claim's status annotation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportPhase {
    /// The importer pod was submitted
    InProgress,
    /// The claim cannot be imported as declared
    Failed,
}

impl ImportPhase {
    /// Annotation value for this phase
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportPhase::InProgress => "In process",
            ImportPhase::Failed => "Failed",
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In process" => Ok(ImportPhase::InProgress),
            "Failed" => Ok(ImportPhase::Failed),
            other => Err(format!("unknown import status {:?}", other)),
        }
    }
}

/// Phase currently recorded on the claim, ignoring values written by others
pub fn current_phase(claim: &PersistentVolumeClaim) -> Option<ImportPhase> {
    annotation(claim, ANN_STATUS).and_then(|s| s.parse().ok())
}

fn has_phase(claim: &PersistentVolumeClaim, phase: ImportPhase) -> bool {
    annotation(claim, ANN_STATUS) == Some(phase.as_str())
}

/// Ensure the claim's status annotation holds `phase`.
///
/// Returns the claim as stored after the write, or a copy of `claim` when
/// the annotation already matched and nothing was written.
pub async fn ensure_status(
    client: &dyn KubeClient,
    claim: &PersistentVolumeClaim,
    phase: ImportPhase,
    poll: &PollConfig,
) -> Result<PersistentVolumeClaim, ImportError> {
    if has_phase(claim, phase) {
        return Ok(claim.clone());
    }

    let key = ClaimKey::from_claim(claim)?;
    let failed = |reason: StatusUpdateFailure| ImportError::StatusUpdate {
        namespace: key.namespace.clone(),
        name: key.name.clone(),
        reason,
    };

    let mut candidate = claim.clone();
    let mut poller = Poller::new(poll);
    loop {
        set_annotation(&mut candidate, ANN_STATUS, phase.as_str());

        match client.update_claim(&candidate).await {
            Ok(updated) => {
                info!(
                    claim = %key,
                    status = %phase,
                    attempts = poller.attempts(),
                    "claim status updated"
                );
                return Ok(updated);
            }
            Err(e) if e.is_conflict() => {
                debug!(claim = %key, error = %e, "claim is stale, re-reading");
                candidate = client
                    .get_claim(&key.namespace, &key.name)
                    .await
                    .map_err(|source| {
                        failed(StatusUpdateFailure::Api {
                            op: StatusOp::Getting,
                            source,
                        })
                    })?;
                if has_phase(&candidate, phase) {
                    debug!(
                        claim = %key,
                        status = %phase,
                        "status already set by another writer"
                    );
                    return Ok(candidate);
                }
            }
            Err(source) => {
                return Err(failed(StatusUpdateFailure::Api {
                    op: StatusOp::Updating,
                    source,
                }))
            }
        }

        poller
            .wait()
            .await
            .map_err(|timeout| failed(StatusUpdateFailure::Timeout(timeout.budget)))?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use importer_common::ApiError;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use crate::client::MockKubeClient;

    fn claim(resource_version: &str, status: Option<&str>) -> PersistentVolumeClaim {
        let mut annotations = BTreeMap::new();
        if let Some(s) = status {
            annotations.insert(ANN_STATUS.to_string(), s.to_string());
        }
        PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some("vol1".to_string()),
                namespace: Some("ns".to_string()),
                resource_version: Some(resource_version.to_string()),
                annotations: Some(annotations),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn conflict() -> ApiError {
        ApiError::Conflict("the object has been modified".to_string())
    }

    /// Echo the written claim back with a bumped resourceVersion
    fn stored(written: &PersistentVolumeClaim) -> PersistentVolumeClaim {
        let mut out = written.clone();
        let rv: u64 = written
            .metadata
            .resource_version
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        out.metadata.resource_version = Some((rv + 1).to_string());
        out
    }

    #[test]
    fn phase_round_trips_through_annotation_value() {
        for phase in [ImportPhase::InProgress, ImportPhase::Failed] {
            assert_eq!(phase.as_str().parse::<ImportPhase>(), Ok(phase));
        }
        assert!("Succeeded".parse::<ImportPhase>().is_err());
    }

    #[test]
    fn current_phase_ignores_foreign_values() {
        assert_eq!(
            current_phase(&claim("1", Some("In process"))),
            Some(ImportPhase::InProgress)
        );
        assert_eq!(current_phase(&claim("1", Some("whatever"))), None);
        assert_eq!(current_phase(&claim("1", None)), None);
    }

    #[tokio::test]
    async fn already_set_is_a_no_op() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim().never();
        mock.expect_get_claim().never();

        let original = claim("7", Some("In process"));
        let result = ensure_status(
            &mock,
            &original,
            ImportPhase::InProgress,
            &PollConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn writes_once_and_is_idempotent() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim().times(1).returning(|c| Ok(stored(c)));

        let original = claim("7", None);
        let poll = PollConfig::default();
        let first = ensure_status(&mock, &original, ImportPhase::InProgress, &poll)
            .await
            .unwrap();
        let second = ensure_status(&mock, &first, ImportPhase::InProgress, &poll)
            .await
            .unwrap();

        assert_eq!(annotation(&second, ANN_STATUS), Some("In process"));
        assert_eq!(second.metadata.resource_version.as_deref(), Some("8"));
        // the caller's copy is untouched
        assert_eq!(annotation(&original, ANN_STATUS), None);
    }

    #[tokio::test]
    async fn write_is_keyed_on_callers_resource_version() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim()
            .withf(|c| {
                c.metadata.resource_version.as_deref() == Some("7")
                    && annotation(c, ANN_STATUS) == Some("Failed")
            })
            .times(1)
            .returning(|c| Ok(stored(c)));

        let original = claim("7", Some("In process"));
        ensure_status(&mock, &original, ImportPhase::Failed, &PollConfig::default())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn single_conflict_refetches_and_retries() {
        let writes = Arc::new(AtomicU32::new(0));
        let w = writes.clone();

        let mut mock = MockKubeClient::new();
        mock.expect_update_claim().times(2).returning(move |c| {
            if w.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(conflict())
            } else {
                Ok(stored(c))
            }
        });
        mock.expect_get_claim()
            .withf(|ns, name| ns == "ns" && name == "vol1")
            .times(1)
            .returning(|_, _| Ok(claim("9", Some("foreign"))));

        let result = ensure_status(
            &mock,
            &claim("7", None),
            ImportPhase::InProgress,
            &PollConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(writes.load(Ordering::SeqCst), 2);
        // second write was based on the re-read copy
        assert_eq!(result.metadata.resource_version.as_deref(), Some("10"));
        assert_eq!(annotation(&result, ANN_STATUS), Some("In process"));
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_resolved_by_other_writer_stops_without_writing() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim()
            .times(1)
            .returning(|_| Err(conflict()));
        mock.expect_get_claim()
            .times(1)
            .returning(|_, _| Ok(claim("9", Some("In process"))));

        let result = ensure_status(
            &mock,
            &claim("7", None),
            ImportPhase::InProgress,
            &PollConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(result.metadata.resource_version.as_deref(), Some("9"));
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_conflicts_time_out() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim().returning(|_| Err(conflict()));
        mock.expect_get_claim().returning(|_, _| Ok(claim("9", None)));

        let err = ensure_status(
            &mock,
            &claim("7", None),
            ImportPhase::InProgress,
            &PollConfig::default(),
        )
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        match err {
            ImportError::StatusUpdate {
                namespace,
                name,
                reason: StatusUpdateFailure::Timeout(budget),
            } => {
                assert_eq!(namespace, "ns");
                assert_eq!(name, "vol1");
                assert_eq!(budget, Duration::from_secs(4));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_failure_aborts_immediately() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim().times(1).returning(|_| {
            Err(ApiError::Status {
                code: 422,
                message: "invalid".to_string(),
            })
        });
        mock.expect_get_claim().never();

        let err = ensure_status(
            &mock,
            &claim("7", None),
            ImportPhase::InProgress,
            &PollConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ImportError::StatusUpdate {
                reason: StatusUpdateFailure::Api {
                    op: StatusOp::Updating,
                    ..
                },
                ..
            }
        ));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn refetch_failure_reports_getting() {
        let mut mock = MockKubeClient::new();
        mock.expect_update_claim()
            .times(1)
            .returning(|_| Err(conflict()));
        mock.expect_get_claim()
            .times(1)
            .returning(|_, _| Err(ApiError::NotFound("claim deleted".to_string())));

        let err = ensure_status(
            &mock,
            &claim("7", None),
            ImportPhase::InProgress,
            &PollConfig::default(),
        )
        .await
        .unwrap_err();
        match err {
            ImportError::StatusUpdate {
                reason:
                    StatusUpdateFailure::Api {
                        op: StatusOp::Getting,
                        source,
                    },
                ..
            } => assert!(source.is_not_found()),
            other => panic!("expected getting failure, got {:?}", other),
        }
    }
}
