use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::{error, warn};

use crate::catalog::SearchError;
use crate::gemini::EnrichError;

pub fn json_error(status: StatusCode, detail: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": detail.into() }))).into_response()
}

pub(super) fn search_error_to_response(e: SearchError) -> Response {
    match &e {
        SearchError::InvalidQuery => json_error(StatusCode::BAD_REQUEST, e.to_string()),
        SearchError::NoData => {
            warn!("search requested but catalog is empty");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        SearchError::Internal(cause) => {
            error!(%cause, "search task failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub(super) fn enrich_error_to_response(e: EnrichError) -> Response {
    match &e {
        EnrichError::MissingCredential | EnrichError::MalformedResponse(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        EnrichError::Internal(cause) => {
            error!(%cause, "enrichment failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        EnrichError::Upstream { status, .. } => json_error(
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
            e.to_string(),
        ),
        EnrichError::Unreachable(cause) => {
            warn!(%cause, "Gemini unreachable");
            json_error(StatusCode::GATEWAY_TIMEOUT, e.to_string())
        }
    }
}

pub(super) fn rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_query_is_bad_request() {
        let response = search_error_to_response(SearchError::InvalidQuery);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn search_failures_are_server_errors() {
        for e in [SearchError::NoData, SearchError::Internal("panic".into())] {
            assert_eq!(
                search_error_to_response(e).status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn upstream_status_passes_through() {
        let response = enrich_error_to_response(EnrichError::Upstream {
            status: 429,
            body: "slow down".into(),
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn invalid_upstream_status_becomes_bad_gateway() {
        let response = enrich_error_to_response(EnrichError::Upstream {
            status: 42,
            body: String::new(),
        });
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn proxy_server_errors_are_500() {
        for e in [
            EnrichError::MissingCredential,
            EnrichError::MalformedResponse("x".into()),
            EnrichError::Internal("x".into()),
        ] {
            assert_eq!(
                enrich_error_to_response(e).status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }
}
