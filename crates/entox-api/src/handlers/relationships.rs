//! Relationship extraction handler

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use entox_core::{Document, EntityLabel, Extraction};
use entox_extractor::{CausalExtractor, ExtractionConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Relationship extraction request body
#[derive(Debug, Deserialize, ToSchema)]
pub struct RelationshipRequest {
    /// Free text to analyze (one or more sentences)
    #[serde(default)]
    #[schema(example = "Valproic acid (VPA) induces seizures.")]
    pub text: String,

    /// Entity type of the cause
    #[serde(default = "default_cause")]
    #[schema(example = "COMPOUND", default = "COMPOUND")]
    pub cause: String,

    /// Entity type of the effect
    #[serde(default = "default_effect")]
    #[schema(example = "PHENOTYPE", default = "PHENOTYPE")]
    pub effect: String,
}

fn default_cause() -> String {
    EntityLabel::Compound.to_string()
}

fn default_effect() -> String {
    EntityLabel::Phenotype.to_string()
}

/// Relationship extraction response body
///
/// `relationships` is a list of `{cause, verb, effect}` objects, or the
/// string "No relationship found".
#[derive(Debug, Serialize, ToSchema)]
pub struct RelationshipResponse {
    #[schema(value_type = Object)]
    pub relationships: Extraction,
}

/// Entity types a caller may request
#[derive(Debug, Clone)]
pub struct AllowedLabels {
    pub causes: Vec<EntityLabel>,
    pub effects: Vec<EntityLabel>,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub text: String,
    pub cause: EntityLabel,
    pub effect: EntityLabel,
}

/// Check a request against the allow-lists
///
/// Labels must be spelled exactly as the recognizer reports them.
pub fn validate_relationship_request(
    request: RelationshipRequest,
    allowed: &AllowedLabels,
) -> Result<ValidatedRequest, AppError> {
    if request.text.is_empty() {
        return Err(AppError::BadRequest(
            "Invalid input for 'text'. It should be a non-empty string.".to_string(),
        ));
    }

    let find = |labels: &[EntityLabel], value: &str| {
        labels.iter().copied().find(|label| label.as_str() == value)
    };

    let cause = find(&allowed.causes, &request.cause).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid value '{}' for 'cause'.", request.cause))
    })?;
    let effect = find(&allowed.effects, &request.effect).ok_or_else(|| {
        AppError::BadRequest(format!("Invalid value '{}' for 'effect'.", request.effect))
    })?;

    Ok(ValidatedRequest {
        text: request.text,
        cause,
        effect,
    })
}

/// Extract cause -> verb -> effect relations from text
#[utoipa::path(
    post,
    path = "/relationships",
    tag = "relationships",
    request_body = RelationshipRequest,
    responses(
        (status = 200, description = "Extraction ran", body = RelationshipResponse),
        (status = 400, description = "Invalid request", body = crate::error::ApiError),
        (status = 500, description = "Internal error", body = crate::error::ApiError)
    )
)]
pub async fn relationships_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RelationshipRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    state.increment_requests();

    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let settings = &state.config.extraction;
    let allowed = AllowedLabels {
        causes: settings.allowed_causes.clone(),
        effects: settings.allowed_effects.clone(),
    };
    let request = validate_relationship_request(request, &allowed)?;

    let config = ExtractionConfig {
        cause: request.cause,
        effect: request.effect,
        ..ExtractionConfig::from(settings)
    };
    let extractor = CausalExtractor::new(state.pipeline.clone(), config)?;

    let start = std::time::Instant::now();
    let text = request.text;
    let extraction = tokio::task::spawn_blocking(move || {
        extractor.extract_document(&Document::new("request", text))
    })
    .await
    .map_err(|e| AppError::Internal(format!("extraction task failed: {e}")))?;

    state.record_relations(extraction.relations().len());
    tracing::debug!(
        cause = %request.cause,
        effect = %request.effect,
        relations = extraction.relations().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "handled relationships request"
    );

    Ok((
        StatusCode::OK,
        Json(RelationshipResponse {
            relationships: extraction,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn allowed() -> AllowedLabels {
        AllowedLabels {
            causes: vec![EntityLabel::Compound, EntityLabel::Phenotype],
            effects: vec![EntityLabel::Phenotype],
        }
    }

    fn request(text: &str, cause: &str, effect: &str) -> RelationshipRequest {
        RelationshipRequest {
            text: text.to_string(),
            cause: cause.to_string(),
            effect: effect.to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let validated = assert_ok!(validate_relationship_request(
            request("Aspirin induces fever.", "COMPOUND", "PHENOTYPE"),
            &allowed()
        ));
        assert_eq!(validated.cause, EntityLabel::Compound);
        assert_eq!(validated.effect, EntityLabel::Phenotype);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(matches!(
            validate_relationship_request(request("", "COMPOUND", "PHENOTYPE"), &allowed()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            validate_relationship_request(request("x", "DRUG", "PHENOTYPE"), &allowed()),
            Err(AppError::BadRequest(msg)) if msg.contains("'DRUG' for 'cause'")
        ));
        assert!(matches!(
            validate_relationship_request(request("x", "COMPOUND", "COMPOUND"), &allowed()),
            Err(AppError::BadRequest(msg)) if msg.contains("for 'effect'")
        ));
        // Exact spelling only
        assert_err!(validate_relationship_request(
            request("x", "compound", "PHENOTYPE"),
            &allowed()
        ));
    }

    #[test]
    fn test_request_defaults() {
        let request: RelationshipRequest = serde_json::from_str(r#"{"text": "t"}"#).unwrap();
        assert_eq!(request.cause, "COMPOUND");
        assert_eq!(request.effect, "PHENOTYPE");
    }
}
