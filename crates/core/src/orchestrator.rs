use crate::catalog::Catalog;
use crate::domain::profile::UserProfile;
use crate::domain::recommendation::{EnrichedRecommendation, RecommendationResult};
use crate::oracle::error::OracleDiagnosticsError;
use crate::oracle::json::{parse_recommendations, OracleVerdict};
use crate::oracle::{OracleRequest, RecommendationOracle};
use anyhow::Context;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The only failure text ever shown to users.
pub const UNAVAILABLE_MESSAGE: &str =
    "Sorry, the AI assistant is currently unavailable. Please try again later.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestState {
    #[default]
    Idle,
    Pending,
    Fulfilled {
        results: Vec<EnrichedRecommendation>,
    },
    Failed {
        reason: String,
    },
}

impl RequestState {
    pub fn is_idle(&self) -> bool {
        matches!(self, RequestState::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, RequestState::Pending)
    }
}

/// Identifies one request; only the most recently issued token may settle the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct RequestToken(u64);

#[derive(Debug, Default)]
struct Lifecycle {
    latest: u64,
    state: RequestState,
    last_diagnostic: Option<String>,
}

/// Owns the recommendation request lifecycle for one session.
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    catalog: Arc<Catalog>,
    oracle: Option<Arc<dyn RecommendationOracle>>,
    lifecycle: Arc<Mutex<Lifecycle>>,
}

impl RecommendationOrchestrator {
    pub fn new(catalog: Arc<Catalog>, oracle: Arc<dyn RecommendationOracle>) -> Self {
        Self {
            catalog,
            oracle: Some(oracle),
            lifecycle: Arc::default(),
        }
    }

    /// An orchestrator whose requests all fail without touching the network.
    pub fn unconfigured(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            oracle: None,
            lifecycle: Arc::default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.oracle.is_some()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn state(&self) -> RequestState {
        self.lifecycle().state.clone()
    }

    /// Full error chain of the current request's failure, for operators only.
    pub fn last_diagnostic(&self) -> Option<String> {
        self.lifecycle().last_diagnostic.clone()
    }

    /// Moves to `Pending` before returning. The returned future performs the
    /// oracle call and yields the state visible once it settles, which is a
    /// newer request's state if this one was superseded meanwhile.
    pub fn request_recommendations(
        &self,
        profile: UserProfile,
    ) -> impl Future<Output = RequestState> + Send + 'static {
        let token = self.begin();

        let settled = if self.oracle.is_none() {
            let err = anyhow::anyhow!("recommendation oracle is not configured");
            Some(self.settle(token, Err(err)))
        } else {
            None
        };

        let this = self.clone();
        async move {
            if let Some(state) = settled {
                return state;
            }
            let outcome = this.fetch(profile).await;
            this.settle(token, outcome)
        }
    }

    fn begin(&self) -> RequestToken {
        let mut lifecycle = self.lifecycle();
        lifecycle.latest += 1;
        lifecycle.state = RequestState::Pending;
        lifecycle.last_diagnostic = None;
        tracing::info!(token = lifecycle.latest, "recommendation request started");
        RequestToken(lifecycle.latest)
    }

    async fn fetch(&self, profile: UserProfile) -> anyhow::Result<Vec<EnrichedRecommendation>> {
        let oracle = self
            .oracle
            .as_ref()
            .context("recommendation oracle is not configured")?;

        let request = OracleRequest::new(profile, &self.catalog);
        let raw = oracle.recommend(&request).await?;

        match parse_recommendations(&raw) {
            OracleVerdict::Valid(results) => Ok(merge_with_catalog(&self.catalog, results)),
            OracleVerdict::Malformed { reason } => Err(OracleDiagnosticsError {
                provider: oracle.provider_name(),
                stage: "schema",
                detail: reason,
                raw_output: Some(raw),
                raw_response_json: None,
            }
            .into()),
        }
    }

    fn settle(
        &self,
        token: RequestToken,
        outcome: anyhow::Result<Vec<EnrichedRecommendation>>,
    ) -> RequestState {
        let mut lifecycle = self.lifecycle();
        if token.0 != lifecycle.latest {
            tracing::debug!(
                token = token.0,
                latest = lifecycle.latest,
                succeeded = outcome.is_ok(),
                "discarding superseded recommendation result"
            );
            return lifecycle.state.clone();
        }

        lifecycle.state = match outcome {
            Ok(results) => {
                tracing::info!(token = token.0, results_len = results.len(), "recommendations ready");
                RequestState::Fulfilled { results }
            }
            Err(err) => {
                let diagnostic = format!("{err:#}");
                let stage = err
                    .downcast_ref::<OracleDiagnosticsError>()
                    .map(|d| d.stage)
                    .unwrap_or("request");
                tracing::error!(token = token.0, stage, error = %diagnostic, "recommendation request failed");
                lifecycle.last_diagnostic = Some(diagnostic);
                RequestState::Failed {
                    reason: UNAVAILABLE_MESSAGE.to_string(),
                }
            }
        };
        lifecycle.state.clone()
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Joins oracle results to catalog records, keeping oracle order. Results
/// naming unknown cards are dropped.
pub fn merge_with_catalog(
    catalog: &Catalog,
    results: Vec<RecommendationResult>,
) -> Vec<EnrichedRecommendation> {
    results
        .into_iter()
        .filter_map(|result| match catalog.get(&result.card_id) {
            Some(card) => Some(EnrichedRecommendation {
                card: card.clone(),
                match_score: result.match_score,
                rationale: result.rationale,
            }),
            None => {
                tracing::warn!(card_id = %result.card_id, "oracle referenced unknown card; dropping");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogManifest;
    use crate::filter::tests::card;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    type Reply = Result<String, String>;

    /// Answers each call with the reply scripted for the profile's income.
    #[derive(Default)]
    struct ScriptedOracle {
        replies: Mutex<HashMap<u64, oneshot::Receiver<Reply>>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn script(&self, income: u64) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.replies.lock().unwrap().insert(income, rx);
            tx
        }

        fn reply_now(&self, income: u64, reply: Reply) {
            let _ = self.script(income).send(reply);
        }
    }

    #[async_trait::async_trait]
    impl RecommendationOracle for ScriptedOracle {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        async fn recommend(&self, request: &OracleRequest) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let rx = self
                .replies
                .lock()
                .unwrap()
                .remove(&request.profile.monthly_income())
                .context("no reply scripted")?;
            rx.await.context("reply dropped")?.map_err(anyhow::Error::msg)
        }
    }

    fn catalog() -> Arc<Catalog> {
        let cards = ["a", "c", "d", "e"]
            .iter()
            .map(|id| card(id, &format!("Card {id}"), "Bank", 0, &[]))
            .collect();
        Arc::new(
            Catalog::from_manifest(CatalogManifest {
                version: "test".to_string(),
                updated_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                cards,
            })
            .unwrap(),
        )
    }

    fn profile(income: i64) -> UserProfile {
        UserProfile::try_new(income, ["Online"], ["Cashback"]).unwrap()
    }

    fn payload(items: &[(&str, i64)]) -> String {
        let recs: Vec<_> = items
            .iter()
            .map(|(id, score)| json!({"cardId": id, "score": score, "reasoning": format!("why {id}")}))
            .collect();
        json!({ "recommendations": recs }).to_string()
    }

    fn setup() -> (Arc<ScriptedOracle>, RecommendationOrchestrator) {
        let oracle = Arc::new(ScriptedOracle::default());
        let orchestrator = RecommendationOrchestrator::new(catalog(), oracle.clone());
        (oracle, orchestrator)
    }

    fn fulfilled_ids(state: &RequestState) -> Vec<String> {
        match state {
            RequestState::Fulfilled { results } => results.iter().map(|r| r.card.id.clone()).collect(),
            other => panic!("expected fulfilled state, got {other:?}"),
        }
    }

    #[test]
    fn merge_drops_unknown_ids() {
        let results = vec![
            RecommendationResult {
                card_id: "a".to_string(),
                match_score: 90,
                rationale: "x".to_string(),
            },
            RecommendationResult {
                card_id: "b".to_string(),
                match_score: 80,
                rationale: "y".to_string(),
            },
        ];
        let merged = merge_with_catalog(&catalog(), results);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].card.id, "a");
        assert_eq!(merged[0].match_score, 90);
        assert_eq!(merged[0].rationale, "x");
    }

    #[tokio::test]
    async fn pending_until_the_oracle_answers() {
        let (oracle, orchestrator) = setup();
        assert!(orchestrator.state().is_idle());

        let tx = oracle.script(1_000);
        let fut = orchestrator.request_recommendations(profile(1_000));
        assert!(orchestrator.state().is_pending());

        tx.send(Ok(payload(&[("c", 88), ("a", 75)]))).unwrap();
        let state = fut.await;
        assert_eq!(fulfilled_ids(&state), vec!["c", "a"]);
        assert_eq!(orchestrator.state(), state);
    }

    #[tokio::test]
    async fn empty_and_unmatched_results_are_fulfilled() {
        let (oracle, orchestrator) = setup();

        oracle.reply_now(1, Ok(payload(&[])));
        let state = orchestrator.request_recommendations(profile(1)).await;
        assert!(fulfilled_ids(&state).is_empty());

        oracle.reply_now(2, Ok(payload(&[("zz", 50), ("yy", 40)])));
        let state = orchestrator.request_recommendations(profile(2)).await;
        assert!(fulfilled_ids(&state).is_empty());
    }

    #[tokio::test]
    async fn consumes_at_most_three_results() {
        let (oracle, orchestrator) = setup();
        oracle.reply_now(
            1,
            Ok(payload(&[("a", 90), ("c", 80), ("d", 70), ("e", 60)])),
        );
        let state = orchestrator.request_recommendations(profile(1)).await;
        assert_eq!(fulfilled_ids(&state), vec!["a", "c", "d"]);
    }

    #[tokio::test]
    async fn unconfigured_fails_immediately() {
        let orchestrator = RecommendationOrchestrator::unconfigured(catalog());
        let fut = orchestrator.request_recommendations(profile(1));
        assert_eq!(
            orchestrator.state(),
            RequestState::Failed {
                reason: UNAVAILABLE_MESSAGE.to_string()
            }
        );
        assert_eq!(fut.await, orchestrator.state());
        assert!(orchestrator
            .last_diagnostic()
            .unwrap()
            .contains("not configured"));
    }

    #[tokio::test]
    async fn failures_share_one_message_but_keep_distinct_diagnostics() {
        let (oracle, orchestrator) = setup();

        oracle.reply_now(1, Err("connection refused".to_string()));
        let transport = orchestrator.request_recommendations(profile(1)).await;
        let transport_diag = orchestrator.last_diagnostic().unwrap();

        oracle.reply_now(2, Ok("<html>bad gateway</html>".to_string()));
        let malformed = orchestrator.request_recommendations(profile(2)).await;
        let malformed_diag = orchestrator.last_diagnostic().unwrap();

        let expected = RequestState::Failed {
            reason: UNAVAILABLE_MESSAGE.to_string(),
        };
        assert_eq!(transport, expected);
        assert_eq!(malformed, expected);
        assert!(transport_diag.contains("connection refused"));
        assert!(malformed_diag.contains("stage=schema"));
        assert_ne!(transport_diag, malformed_diag);
        assert!(!UNAVAILABLE_MESSAGE.contains("connection refused"));
    }

    #[tokio::test]
    async fn failure_is_not_retried() {
        let (oracle, orchestrator) = setup();
        oracle.reply_now(1, Err("timeout".to_string()));
        orchestrator.request_recommendations(profile(1)).await;
        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_result_does_not_overwrite_newer_request() {
        let (oracle, orchestrator) = setup();
        let tx1 = oracle.script(1);
        let tx2 = oracle.script(2);

        let r1 = tokio::spawn(orchestrator.request_recommendations(profile(1)));
        let r2 = tokio::spawn(orchestrator.request_recommendations(profile(2)));

        tx2.send(Ok(payload(&[("c", 70)]))).unwrap();
        let s2 = r2.await.unwrap();
        assert_eq!(fulfilled_ids(&s2), vec!["c"]);

        tx1.send(Ok(payload(&[("a", 99)]))).unwrap();
        let s1 = r1.await.unwrap();

        assert_eq!(fulfilled_ids(&s1), vec!["c"]);
        assert_eq!(fulfilled_ids(&orchestrator.state()), vec!["c"]);
    }

    #[tokio::test]
    async fn stale_failure_is_discarded_while_newer_request_pends() {
        let (oracle, orchestrator) = setup();
        let tx1 = oracle.script(1);
        let tx2 = oracle.script(2);

        let r1 = tokio::spawn(orchestrator.request_recommendations(profile(1)));
        let r2 = orchestrator.request_recommendations(profile(2));

        tx1.send(Err("boom".to_string())).unwrap();
        r1.await.unwrap();
        assert!(orchestrator.state().is_pending());
        assert!(orchestrator.last_diagnostic().is_none());

        tx2.send(Ok(payload(&[("d", 60)]))).unwrap();
        assert_eq!(fulfilled_ids(&r2.await), vec!["d"]);
    }

    #[tokio::test]
    async fn new_request_discards_previous_payload() {
        let (oracle, orchestrator) = setup();
        oracle.reply_now(1, Ok(payload(&[("a", 90)])));
        orchestrator.request_recommendations(profile(1)).await;

        let _tx = oracle.script(2);
        let _pending = orchestrator.request_recommendations(profile(2));
        assert_eq!(orchestrator.state(), RequestState::Pending);
    }
}
