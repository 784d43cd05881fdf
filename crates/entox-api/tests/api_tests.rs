//! API Integration Tests

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use entox_api::{create_router, state::AppState};
use entox_core::AppConfig;
use entox_extractor::TreebankPipeline;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TREEBANK: &str = "# text = Valproic acid (VPA) induces seizures.
# abbreviations = VPA
1	Valproic	valproic	ADJ	_	_	2	amod	_	NER=B-COMPOUND
2	acid	acid	NOUN	_	_	6	nsubj	_	NER=I-COMPOUND
3	(	(	PUNCT	_	_	4	punct	_	SpaceAfter=No
4	VPA	vpa	PROPN	_	_	2	appos	_	NER=B-COMPOUND|SpaceAfter=No
5	)	)	PUNCT	_	_	4	punct	_	_
6	induces	induce	VERB	_	_	0	root	_	_
7	seizures	seizure	NOUN	_	_	6	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
8	.	.	PUNCT	_	_	6	punct	_	_

# text = Valproic acid () induces seizures.
1	Valproic	valproic	ADJ	_	_	2	amod	_	NER=B-COMPOUND
2	acid	acid	NOUN	_	_	5	nsubj	_	NER=I-COMPOUND
3	(	(	PUNCT	_	_	2	punct	_	SpaceAfter=No
4	)	)	PUNCT	_	_	2	punct	_	_
5	induces	induce	VERB	_	_	0	root	_	_
6	seizures	seizure	NOUN	_	_	5	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
7	.	.	PUNCT	_	_	5	punct	_	_

# text = Cisplatin shows nephrotoxicity.
1	Cisplatin	cisplatin	NOUN	_	_	2	nsubj	_	NER=B-COMPOUND
2	shows	show	VERB	_	_	0	root	_	_
3	nephrotoxicity	nephrotoxicity	NOUN	_	_	2	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
4	.	.	PUNCT	_	_	2	punct	_	_

# text = Obesity causes diabetes.
1	Obesity	obesity	NOUN	_	_	2	nsubj	_	NER=B-PHENOTYPE
2	causes	cause	VERB	_	_	0	root	_	_
3	diabetes	diabetes	NOUN	_	_	2	obj	_	NER=B-PHENOTYPE|SpaceAfter=No
4	.	.	PUNCT	_	_	2	punct	_	_
";

fn create_router_for_testing() -> Router {
    let pipeline = Arc::new(TreebankPipeline::from_conllu(TREEBANK).unwrap());
    let state = Arc::new(AppState::new(AppConfig::default(), pipeline));
    create_router(state)
}

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let (status, json) = send(
        create_router_for_testing(),
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_check() {
    let (status, json) = send(
        create_router_for_testing(),
        Request::builder().uri("/ready").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ready"], true);
    assert_eq!(json["checks"]["entity_labels"], json!(["COMPOUND", "PHENOTYPE"]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (status, json) = send(
        create_router_for_testing(),
        Request::builder().uri("/metrics").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["uptime_seconds"].is_number());
    assert!(json["total_requests"].is_number());
}

// =============================================================================
// Relationship Tests
// =============================================================================

#[tokio::test]
async fn test_relationships_found() {
    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({ "text": "Valproic acid (VPA) induces seizures." })),
    );
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "relationships": [
                { "cause": "Valproic acid", "verb": "induces", "effect": "seizures" }
            ]
        })
    );
}

#[tokio::test]
async fn test_relationships_not_found() {
    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({ "text": "Cisplatin shows nephrotoxicity." })),
    );
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "relationships": "No relationship found" }));
}

#[tokio::test]
async fn test_relationships_phenotype_cause() {
    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({
            "text": "Obesity causes diabetes.",
            "cause": "PHENOTYPE",
            "effect": "PHENOTYPE"
        })),
    );
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["relationships"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_relationships_unparseable_text_is_not_found() {
    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({ "text": "Nothing in the treebank." })),
    );
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["relationships"], "No relationship found");
}

#[tokio::test]
async fn test_relationships_empty_text() {
    let request = create_json_request("POST", "/relationships", Some(json!({ "text": "" })));
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(json["error"].as_str().unwrap().contains("'text'"));
}

#[tokio::test]
async fn test_relationships_invalid_cause() {
    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({ "text": "Valproic acid (VPA) induces seizures.", "cause": "DRUG" })),
    );
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid value 'DRUG' for 'cause'.");
}

#[tokio::test]
async fn test_relationships_invalid_effect() {
    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({ "text": "Valproic acid (VPA) induces seizures.", "effect": "COMPOUND" })),
    );
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid value 'COMPOUND' for 'effect'.");
}

#[tokio::test]
async fn test_relationships_non_string_text() {
    let request = create_json_request("POST", "/relationships", Some(json!({ "text": 42 })));
    let (status, json) = send(create_router_for_testing(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_request_counter() {
    let pipeline = Arc::new(TreebankPipeline::from_conllu(TREEBANK).unwrap());
    let state = Arc::new(AppState::new(AppConfig::default(), pipeline));

    let request = create_json_request(
        "POST",
        "/relationships",
        Some(json!({ "text": "Valproic acid (VPA) induces seizures." })),
    );
    let (status, _) = send(create_router(state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(state.get_request_count(), 1);
    assert_eq!(state.get_relation_count(), 1);
}

// =============================================================================
// OpenAPI Tests
// =============================================================================

#[tokio::test]
async fn test_openapi_spec_available() {
    let (status, json) = send(
        create_router_for_testing(),
        Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["openapi"].is_string());
    assert!(json["paths"]["/relationships"].is_object());
}
