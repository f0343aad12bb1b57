//! Review Registry (C3) — submission, human decisioning, and
//! decision-propagation for artifacts awaiting review (spec.md §4.3).

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};
use crate::ids::{ArtifactId, ReviewId};
use crate::model::artifact::Stage;
use crate::model::review::{Review, ReviewDecision};

use super::db::SharedDb;
use super::schema::{self, keys};

const DECISION_CHANNEL_CAPACITY: usize = 256;

/// Typed façade over the shared `PipelineDb`'s `reviews` column family,
/// plus an in-memory broadcast channel so `awaitDecision`/`subscribe`
/// don't have to poll (spec.md §4.3 "subscribe to decision events").
#[derive(Clone)]
pub struct ReviewRegistry {
    db: SharedDb,
    decisions: broadcast::Sender<Review>,
}

impl ReviewRegistry {
    pub fn new(db: SharedDb) -> Self {
        let (decisions, _rx) = broadcast::channel(DECISION_CHANNEL_CAPACITY);
        Self { db, decisions }
    }

    /// Record a new pending review for `artifactId`'s output.
    pub fn submit(
        &self,
        artifact_id: ArtifactId,
        stage: Stage,
        payload_digest: String,
    ) -> EngineResult<Review> {
        let review = Review::new_pending(artifact_id, stage, payload_digest);
        self.db
            .put(schema::CF_REVIEWS, &keys::review(review.id), &review)?;
        debug!(review_id = %review.id, artifact_id = %artifact_id, "review submitted");
        Ok(review)
    }

    pub fn get(&self, id: ReviewId) -> EngineResult<Option<Review>> {
        Ok(self.db.get(schema::CF_REVIEWS, &keys::review(id))?)
    }

    /// Apply a human decision, rejecting any attempt to re-decide an
    /// already-decided review (the digest mismatch case from spec.md
    /// invariant 4 is surfaced as `ReviewConflict` by the caller before
    /// this is reached, since only the caller has the fresh artifact
    /// payload to hash).
    pub fn decide(
        &self,
        id: ReviewId,
        decision: ReviewDecision,
        feedback: Option<String>,
    ) -> EngineResult<Review> {
        let mut review = self
            .get(id)?
            .ok_or_else(|| EngineError::NotFound(format!("review {id}")))?;

        if review.decision != ReviewDecision::Pending {
            return Err(EngineError::ReviewConflict(id));
        }

        review.decision = decision;
        review.decided_at = Some(chrono::Utc::now());
        review.feedback = feedback;

        self.db
            .put(schema::CF_REVIEWS, &keys::review(id), &review)?;

        info!(review_id = %id, decision = %decision, "review decided");
        // No receivers is a routine case (nothing currently awaiting this
        // review); ignore the send error.
        let _ = self.decisions.send(review.clone());
        Ok(review)
    }

    pub fn list_pending(&self, stage: Option<Stage>) -> EngineResult<Vec<Review>> {
        let all: Vec<(String, Review)> = self
            .db
            .list_entries(schema::CF_REVIEWS, schema::keys::review_prefix())?;
        Ok(all
            .into_iter()
            .map(|(_, r)| r)
            .filter(|r| r.decision == ReviewDecision::Pending)
            .filter(|r| stage.map(|s| s == r.stage).unwrap_or(true))
            .collect())
    }

    /// Block until `reviewId` is decided or `timeout` elapses, polling the
    /// store on top of the broadcast channel to cover the restart case
    /// (spec.md §9's "no response after restart" edge case) where a
    /// decision landed before this process subscribed.
    pub async fn await_decision(&self, id: ReviewId, timeout: Duration) -> EngineResult<Review> {
        if let Some(review) = self.get(id)? {
            if review.decision != ReviewDecision::Pending {
                return Ok(review);
            }
        }

        let mut rx = self.decisions.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(EngineError::Timeout(timeout));
            }

            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(review)) if review.id == id => return Ok(review),
                Ok(Ok(_other)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => {
                    if let Some(review) = self.get(id)? {
                        if review.decision != ReviewDecision::Pending {
                            return Ok(review);
                        }
                    }
                    continue;
                }
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return Err(EngineError::Cancelled("review registry closed".to_string()))
                }
                Err(_elapsed) => return Err(EngineError::Timeout(timeout)),
            }
        }
    }

    /// Subscribe to the live stream of review decisions, for callers that
    /// want to react to any decision rather than block on one.
    pub fn subscribe(&self) -> broadcast::Receiver<Review> {
        self.decisions.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::db::PipelineDb;
    use tempfile::tempdir;

    fn registry() -> (ReviewRegistry, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = PipelineDb::open(dir.path()).unwrap().shared();
        (ReviewRegistry::new(db), dir)
    }

    #[test]
    fn submit_then_decide_updates_decision() {
        let (registry, _dir) = registry();
        let review = registry
            .submit(ArtifactId::new(), Stage::Req, "digest".to_string())
            .unwrap();

        let decided = registry
            .decide(review.id, ReviewDecision::Approved, Some("lgtm".to_string()))
            .unwrap();
        assert_eq!(decided.decision, ReviewDecision::Approved);
        assert_eq!(decided.feedback.as_deref(), Some("lgtm"));
    }

    #[test]
    fn re_deciding_is_a_conflict() {
        let (registry, _dir) = registry();
        let review = registry
            .submit(ArtifactId::new(), Stage::Req, "digest".to_string())
            .unwrap();
        registry.decide(review.id, ReviewDecision::Approved, None).unwrap();

        let err = registry
            .decide(review.id, ReviewDecision::Rejected, None)
            .unwrap_err();
        assert_eq!(err.code(), "ReviewConflict");
    }

    #[tokio::test]
    async fn await_decision_returns_once_decided() {
        let (registry, _dir) = registry();
        let review = registry
            .submit(ArtifactId::new(), Stage::Req, "digest".to_string())
            .unwrap();

        let registry2 = registry.clone();
        let id = review.id;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            registry2.decide(id, ReviewDecision::Approved, None).unwrap();
        });

        let decided = registry
            .await_decision(review.id, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(decided.decision, ReviewDecision::Approved);
    }

    #[tokio::test]
    async fn await_decision_times_out() {
        let (registry, _dir) = registry();
        let review = registry
            .submit(ArtifactId::new(), Stage::Req, "digest".to_string())
            .unwrap();

        let err = registry
            .await_decision(review.id, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "Timeout");
    }
}
