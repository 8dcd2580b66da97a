//! HTTP webhook handlers

use super::server::GatewayState;
use crate::channels::{
    AdditionalParameters, DriverResponse, InboundEvent, MessagingDriver, RequestMatch,
    TwilioMessageDriver, DRIVER_NAME,
};
use crate::config::GatewayConfig;
use crate::error::{to_json, Error};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Create the router
pub fn router(state: Arc<GatewayState>) -> Router {
    let webhook_path = state.config.gateway.webhook_path.clone();
    Router::new()
        .route("/health", get(health_check))
        .route(&webhook_path, post(message_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for DriverResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("Webhook processing failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, Json(to_json(&self))).into_response()
    }
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    driver: String,
    configured: bool,
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let driver = TwilioMessageDriver::detached(state.context.clone());
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        driver: DRIVER_NAME.to_string(),
        configured: driver.is_configured(),
    })
}

/// Inbound message webhook
async fn message_webhook(
    State(state): State<Arc<GatewayState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let url = request_url(&state.config.gateway, &headers, &uri);
    let header_pairs = headers.iter().filter_map(|(name, value)| {
        value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
    });
    let event = InboundEvent::from_request(url, header_pairs, body);
    let driver = TwilioMessageDriver::for_request(state.context.clone(), event);

    match driver.classify_request() {
        RequestMatch::Matched => {}
        RequestMatch::NotThisChannel => {
            return (StatusCode::BAD_REQUEST, "not a messaging webhook").into_response();
        }
        RequestMatch::SignatureRejected { .. } => {
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let Some(message) = driver.get_messages().first() else {
        return DriverResponse::empty().into_response();
    };

    tracing::debug!(
        sid = message.message_sid.as_deref().unwrap_or_default(),
        from = %message.sender,
        "Inbound message"
    );

    let reply = match state.handler.handle(message).await {
        Ok(Some(reply)) => reply,
        Ok(None) => return DriverResponse::empty().into_response(),
        Err(e) => return e.into_response(),
    };

    match driver
        .reply(reply, message, AdditionalParameters::new())
        .await
    {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Public URL of the request as Twilio saw it, used for signature checks
fn request_url(config: &GatewayConfig, headers: &HeaderMap, uri: &Uri) -> String {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    if let Some(base) = &config.public_url {
        return format!("{}{}", base.trim_end_matches('/'), path);
    }

    let header_value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let scheme = header_value("x-forwarded-proto").unwrap_or("http");
    let host = match header_value(header::HOST.as_str()) {
        Some(host) => host.to_string(),
        None => format!("{}:{}", config.host, config.port),
    };
    format!("{}://{}{}", scheme, host, path)
}
