use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::outcome::Outcome;

/// Handler-side mapping of an unexpected failure; details stay in the log.
pub(crate) fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %format!("{e:#}"), "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
    )
}

pub(crate) fn not_found(what: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{what} not found"))
}

/// True when the store rejected a write on a UNIQUE constraint.
pub(crate) fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

/// True when a write pointed at a missing row or a delete left rows dangling.
pub(crate) fn is_foreign_key_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// Delete refused because other rows still point at the target.
pub(crate) fn still_referenced(what: &str) -> Response {
    warn!(what, "delete blocked by reference");
    (
        StatusCode::CONFLICT,
        Json(Outcome::error(format!("{what} is still referenced and cannot be deleted."))),
    )
        .into_response()
}

/// Write refused because a referenced id does not exist.
pub(crate) fn unknown_reference(what: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(Outcome::error(format!("{what} refers to a record that does not exist."))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_hides_details() {
        let (status, body) = internal(anyhow::anyhow!("password column missing"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("password"));
    }

    #[test]
    fn non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&anyhow::anyhow!("boom")));
        let row_not_found = anyhow::Error::from(sqlx::Error::RowNotFound);
        assert!(!is_unique_violation(&row_not_found));
        assert!(!is_foreign_key_violation(&row_not_found));
    }

    #[test]
    fn reference_failures_are_client_errors() {
        assert_eq!(still_referenced("Product").status(), StatusCode::CONFLICT);
        assert_eq!(
            unknown_reference("Order item").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
