//! HTTP binding of the authorization gate.
//!
//! [`create_router`] wraps a downstream storage router with the gate
//! middleware. The downstream handlers call [`hook::enforce_authorization`]
//! once they know the target's ACL and sync key.
//!
//! Serve the router with `into_make_service_with_connect_info::<SocketAddr>()`
//! so the peer address is available for sync-host matching.

use axum::{middleware, Router};
use identity_cache::TokenStore;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod gate;
pub mod headers;
pub mod hook;
pub mod middleware_hooks;
pub mod response;


pub use error::{GateError, GateResult};
pub use gate::{Admission, GateOutcome, GateRequest, RequestGate};
pub use hook::{
    enforce_authorization, AclCleaner, AuthorizationHook, AuthorizeOverride, RemoteUser,
    ResellerRequest, ResourceMetadata, SwiftOwner,
};
pub use response::{decision_response, render_decision};

/// Application state shared across requests
#[derive(Clone, Debug)]
pub struct GateState {
    pub gate: Arc<RequestGate>,
}

impl GateState {
    pub fn new(gate: RequestGate) -> Self {
        Self {
            gate: Arc::new(gate),
        }
    }

    pub fn from_config(config: authz::AuthConfig, store: Option<Arc<dyn TokenStore>>) -> Self {
        Self::new(RequestGate::with_store(config, store))
    }
}

/// Wrap `downstream` with the gate middleware and HTTP tracing.
pub fn create_router(state: GateState, downstream: Router) -> Router {
    downstream
        .layer(middleware::from_fn_with_state(
            state,
            middleware_hooks::gate_middleware,
        ))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
