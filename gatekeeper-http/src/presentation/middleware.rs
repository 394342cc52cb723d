//! HTTP middleware for the web server

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use gatekeeper_core::{
    ClientIdentity, GateOutcome, GateRequest, GateResponse, Gatekeeper, HeaderComposer, TierName,
};

use crate::presentation::models::ErrorResponse;

/// The gatekeeper's verdict, attached to every response it handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSummary {
    pub tier: Option<TierName>,
    pub version: Option<String>,
    pub refused: bool,
}

/// Convert a gatekeeper refusal into an HTTP response
pub fn gate_response_to_response(gate: GateResponse) -> Response {
    let mut response = match gate.body {
        Some(body) => (gate.status, Json(ErrorResponse::from(body))).into_response(),
        None => gate.status.into_response(),
    };
    HeaderComposer::merge_into(&gate.headers, response.headers_mut());
    response
}

/// Run every request through the gatekeeping pipeline.
///
/// Refused requests never reach the handler. Forwarded requests carry the
/// caller's `ClientIdentity`, and when negotiated, `TierName` and
/// `VersionContext` as request extensions.
pub async fn gatekeeper_middleware(
    State(gatekeeper): State<Arc<Gatekeeper>>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = gatekeeper.evaluate(&GateRequest::from_request(&request));

    let ctx = match outcome {
        GateOutcome::Respond(gate) => {
            // Preflight answers carry no body and are not refusals
            let refused = gate.body.is_some();
            let mut response = gate_response_to_response(gate);
            response.extensions_mut().insert(GateSummary {
                tier: None,
                version: None,
                refused,
            });
            return response;
        }
        GateOutcome::Forward(ctx) => ctx,
    };

    let summary = GateSummary {
        tier: ctx.tier,
        version: ctx.version.as_ref().map(|v| v.resolved.clone()),
        refused: false,
    };

    let extensions = request.extensions_mut();
    extensions.insert(ctx.identity);
    if let Some(tier) = ctx.tier {
        extensions.insert(tier);
    }
    if let Some(version) = ctx.version {
        extensions.insert(version);
    }

    let mut response = next.run(request).await;
    HeaderComposer::merge_into(&ctx.headers, response.headers_mut());
    response.extensions_mut().insert(summary);
    response
}

/// Per-request access log carrying the caller and the gatekeeper's verdict
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let identity = ClientIdentity::resolve(request.headers());
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis();

    let summary = response.extensions().get::<GateSummary>();
    let tier = summary
        .and_then(|s| s.tier)
        .map_or("-", |tier| tier.as_str());
    let version = summary.and_then(|s| s.version.as_deref()).unwrap_or("-");

    if summary.is_some_and(|s| s.refused) {
        tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            identity = %identity,
            status = %response.status(),
            duration_ms = elapsed_ms,
            "Request refused by gatekeeper"
        );
    } else {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            identity = %identity,
            tier = tier,
            version = version,
            status = %response.status(),
            duration_ms = elapsed_ms,
            "Request completed"
        );
    }

    response
}
