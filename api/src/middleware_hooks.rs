use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info};

use crate::gate::{GateOutcome, GateRequest};
use crate::headers::canonicalize_token;
use crate::response::render_decision;
use crate::GateState;

/// Gate middleware in front of the storage service.
///
/// # Flow
///
/// 1. Collect method, decoded path, token and prior-layer markers
/// 2. Run `RequestGate::handle`
/// 3. Terminal decisions are answered here (403/303/404/400)
/// 4. Admitted requests get their extensions installed and continue
///
/// Any gate fault becomes a plain-text 500. Faults are never turned into a
/// denial, and nothing is written to the request before the outcome is
/// known.
pub async fn gate_middleware(
    State(state): State<GateState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    debug!("GATE: Processing {} request to {}", method, path);

    let gate_request = GateRequest::from_http(&request);
    let outcome = match state.gate.handle(&gate_request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(
                code = e.error_code(),
                "GATE: Internal error handling {} {}: {}", method, path, e
            );
            return e.into_response();
        }
    };

    match outcome {
        GateOutcome::Bypass => next.run(request).await,
        GateOutcome::Respond(decision) => {
            info!("GATE: {} {} -> {}", method, path, decision);
            match render_decision(decision, state.gate.config().ext_authentication_url()) {
                Some(response) => response,
                None => next.run(request).await,
            }
        }
        GateOutcome::Proceed(admission) => {
            canonicalize_token(request.headers_mut());
            admission.install(request.extensions_mut());
            next.run(request).await
        }
    }
}
