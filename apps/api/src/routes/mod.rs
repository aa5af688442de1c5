pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::consultation::handlers as consultation;
use crate::dashboard::handlers as dashboard;
use crate::feedback::handlers as feedback;
use crate::policy::handlers as policy;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/taxonomy", get(consultation::handle_taxonomy))
        // Consultation API
        .route("/api/v1/consultations", post(consultation::handle_submit))
        .route(
            "/api/v1/consultations/assess",
            post(consultation::handle_assess),
        )
        // Feedback API
        .route("/api/v1/feedback", post(feedback::handle_feedback))
        // Policy administration
        .route("/api/v1/policy", get(policy::handle_get_policy))
        .route(
            "/api/v1/policy/phrasebook",
            patch(policy::handle_update_phrasebook),
        )
        .route(
            "/api/v1/policy/avoid-phrases",
            patch(policy::handle_replace_avoid_phrases),
        )
        // Dashboard
        .route("/api/v1/dashboard", get(dashboard::handle_dashboard))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::consultation::pipeline::ConsultationPipeline;
    use crate::consultation::topics::TopicClassifier;
    use crate::llm_client::testing::ScriptedClient;
    use crate::llm_client::{GenerationClient, GenerationError, GenerationRequest};
    use crate::safety::triage::TriageFallback;
    use crate::safety::SafetyLexicon;
    use crate::storage::MemoryStore;
    use crate::submission_guard::{InMemoryGuard, SubmissionGuard};

    const ANSWER: &str = "0) 先生へのひと言\n- 見守りの担当を決めましょう。";

    struct Harness {
        app: Router,
        llm: Arc<ScriptedClient>,
        guard: Arc<InMemoryGuard>,
    }

    /// A model call that never answers.
    struct StalledClient;

    #[async_trait]
    impl GenerationClient for StalledClient {
        async fn complete(&self, _: &GenerationRequest) -> Result<String, GenerationError> {
            std::future::pending().await
        }

        fn model(&self) -> &str {
            "stalled"
        }
    }

    fn harness() -> Harness {
        let llm = Arc::new(ScriptedClient::replying(&[ANSWER, ANSWER]));
        let (app, guard) = app_with(llm.clone());
        Harness { app, llm, guard }
    }

    fn app_with(llm: Arc<dyn GenerationClient>) -> (Router, Arc<InMemoryGuard>) {
        let store = Arc::new(MemoryStore::new());
        let guard = Arc::new(InMemoryGuard::new());
        let pipeline = ConsultationPipeline::new(
            llm,
            store.clone(),
            store.clone(),
            SafetyLexicon::default().compile().unwrap(),
            TopicClassifier::new().unwrap(),
            TriageFallback::Require,
        );
        let state = AppState {
            pipeline,
            interactions: store.clone(),
            policies: store,
            guard: guard.clone(),
        };
        (build_router(state), guard)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn submission(org_id: Uuid, narrative: &str) -> Value {
        json!({
            "org_id": org_id,
            "user_id": Uuid::new_v4(),
            "session_id": "session-a",
            "intake": {
                "grade": "elementary56",
                "scale": "whole_class",
                "scene": "in_class",
                "frequency": "ongoing",
                "urgency": "medium",
                "emotion": "worried",
                "narrative": narrative,
                "values": ["foster_autonomy", "listen_closely"]
            }
        })
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let (status, body) = send(&h.app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "albert-api");
    }

    #[tokio::test]
    async fn test_taxonomy() {
        let h = harness();
        let (status, body) = send(&h.app, Method::GET, "/api/v1/taxonomy", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["value_groups"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_then_feedback_then_dashboard() {
        let h = harness();
        let org = Uuid::new_v4();
        let teacher = Uuid::new_v4();
        let mut body = submission(org, "宿題の未提出が続いている");
        body["user_id"] = json!(teacher);

        let (status, outcome) = send(&h.app, Method::POST, "/api/v1/consultations", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["text"], ANSWER);
        assert_eq!(outcome["persisted"], true);
        assert_eq!(outcome["compliance"], "not_required");
        assert_eq!(h.llm.calls(), 1);

        let (status, _) = send(
            &h.app,
            Method::POST,
            "/api/v1/feedback",
            Some(json!({
                "interaction_id": outcome["interaction_id"],
                "org_id": org,
                "user_id": teacher,
                "rating": "good"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, summary) = send(
            &h.app,
            Method::GET,
            &format!("/api/v1/dashboard?org_id={org}&days=7"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["interactions"], 1);
        assert_eq!(summary["helpful_rate"], 100.0);
        assert_eq!(summary["top_topics"][0]["topic"], "課題・提出");
    }

    #[tokio::test]
    async fn test_submit_with_sensitive_narrative_requires_triage() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/v1/consultations",
            Some(submission(Uuid::new_v4(), "いじめの相談を受けた")),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "TRIAGE_REQUIRED");
        assert_eq!(body["error"]["missing"], json!(["q1", "q2", "q3"]));
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_too_many_values_is_bad_request() {
        let h = harness();
        let mut body = submission(Uuid::new_v4(), "授業中の私語");
        body["intake"]["values"] = json!([
            "foster_autonomy",
            "build_confidence",
            "let_them_choose",
            "stretch_tasks",
            "embrace_failure"
        ]);
        let (status, response) = send(&h.app, Method::POST, "/api/v1/consultations", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_second_submission_in_flight_conflicts() {
        let h = harness();
        assert!(h.guard.try_acquire("session-a").await.unwrap());

        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/v1/consultations",
            Some(submission(Uuid::new_v4(), "授業中の私語")),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "SUBMISSION_IN_FLIGHT");
        assert_eq!(h.llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_guard_released_after_rejected_submission() {
        let h = harness();
        let mut body = submission(Uuid::new_v4(), "授業中の私語");
        body["intake"]["grade"] = Value::Null;
        let (status, _) = send(&h.app, Method::POST, "/api/v1/consultations", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(h.guard.try_acquire("session-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_submission_frees_session() {
        let (app, guard) = app_with(Arc::new(StalledClient));
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/consultations")
            .header("content-type", "application/json")
            .body(Body::from(submission(Uuid::new_v4(), "授業中の私語").to_string()))
            .unwrap();

        // The client gives up while generation is still pending
        let cancelled = tokio::time::timeout(Duration::from_millis(200), app.oneshot(request)).await;
        assert!(cancelled.is_err());
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(guard.try_acquire("session-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_assess_lists_triage_questions() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/v1/consultations/assess",
            Some(json!({ "narrative": "陰口が広がっている", "triage": { "q1": "yes" } })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["needs_safety"], true);
        assert_eq!(body["auto_detected"], true);
        assert_eq!(body["triage_complete"], false);
        assert_eq!(body["missing"], json!(["q2", "q3"]));
        assert_eq!(body["questions"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_feedback_for_unknown_interaction_is_not_found() {
        let h = harness();
        let (status, body) = send(
            &h.app,
            Method::POST,
            "/api/v1/feedback",
            Some(json!({
                "interaction_id": Uuid::new_v4(),
                "org_id": Uuid::new_v4(),
                "user_id": Uuid::new_v4(),
                "rating": "bad",
                "reasons": ["too_abstract"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_policy_read_and_edit() {
        let h = harness();
        let org = Uuid::new_v4();

        let (status, policy) =
            send(&h.app, Method::GET, &format!("/api/v1/policy?org_id={org}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(policy["avoid_phrases"][0], "その場で謝らせる");

        let (status, policy) = send(
            &h.app,
            Method::PATCH,
            "/api/v1/policy/avoid-phrases",
            Some(json!({ "org_id": org, "avoid_phrases": ["恥をかかせる", " "] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(policy["avoid_phrases"], json!(["恥をかかせる"]));
    }

    #[tokio::test]
    async fn test_dashboard_rejects_unknown_window() {
        let h = harness();
        let (status, _) = send(
            &h.app,
            Method::GET,
            &format!("/api/v1/dashboard?org_id={}&days=30", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
