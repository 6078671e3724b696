use authz::Decision;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::error;

use crate::error::{GateError, GateResult};
use crate::headers::location;

/// Renders a terminal decision as an HTTP response.
///
/// `Allow` emits nothing; the request continues downstream.
pub fn decision_response(decision: Decision, ext_authentication_url: &str) -> GateResult<Option<Response>> {
    let status = match decision {
        Decision::Allow { .. } => return Ok(None),
        Decision::Forbidden => StatusCode::FORBIDDEN,
        Decision::NotFound => StatusCode::NOT_FOUND,
        Decision::BadRequest => StatusCode::BAD_REQUEST,
        Decision::RedirectExternal => {
            let Some(location) = location(ext_authentication_url) else {
                error!("External authentication URL is not a valid Location header");
                return Err(GateError::InvalidRedirect(ext_authentication_url.to_string()));
            };
            return Ok(Some(
                (StatusCode::SEE_OTHER, [(header::LOCATION, location)]).into_response(),
            ));
        }
    };
    Ok(Some(status.into_response()))
}

/// Like [`decision_response`], with faults rendered as a 500.
pub fn render_decision(decision: Decision, ext_authentication_url: &str) -> Option<Response> {
    decision_response(decision, ext_authentication_url).unwrap_or_else(|e| Some(e.into_response()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://idp.example.com/login";

    #[test]
    fn test_allow_emits_nothing() {
        assert!(decision_response(Decision::allow(), URL).unwrap().is_none());
        assert!(decision_response(Decision::allow_owner(), URL).unwrap().is_none());
    }

    #[test]
    fn test_status_mapping() {
        for (decision, status) in [
            (Decision::Forbidden, StatusCode::FORBIDDEN),
            (Decision::NotFound, StatusCode::NOT_FOUND),
            (Decision::BadRequest, StatusCode::BAD_REQUEST),
            (Decision::RedirectExternal, StatusCode::SEE_OTHER),
        ] {
            let response = decision_response(decision, URL).unwrap().unwrap();
            assert_eq!(response.status(), status, "{decision}");
        }
    }

    #[test]
    fn test_redirect_location() {
        let response = decision_response(Decision::RedirectExternal, URL).unwrap().unwrap();
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), URL);
    }

    #[test]
    fn test_invalid_location_is_internal_error() {
        assert!(matches!(
            decision_response(Decision::RedirectExternal, "https://idp\n.example.com"),
            Err(GateError::InvalidRedirect(_))
        ));
        let response = render_decision(Decision::RedirectExternal, "bad\nurl").unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
