use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use crate::api::AppState;
use crate::errors::HookscanError;
use crate::webhook::{
    parse_event, verify_signature, EventDisposition, DELIVERY_HEADER, EVENT_HEADER,
    SIGNATURE_HEADER,
};

/// The webhook endpoint: authenticate, parse, run the pipeline, report.
/// Returns 200 with the scan result even when its status is partial or
/// failed — those are completed pipeline runs, not transport errors.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), HookscanError> {
    verify_signature(
        &state.config.webhook_secret,
        &body,
        header_str(&headers, SIGNATURE_HEADER),
    )?;

    let disposition = parse_event(
        header_str(&headers, EVENT_HEADER),
        header_str(&headers, DELIVERY_HEADER),
        &body,
    )?;

    let request = match disposition {
        EventDisposition::Ignored { event } => {
            info!(event = %event, "Acknowledged unscanned event");
            return Ok((
                StatusCode::ACCEPTED,
                Json(json!({ "status": "ignored", "event": event })),
            ));
        }
        EventDisposition::Scan(request) => request,
    };

    let result = state.pipeline.process(request).await?;
    let body = serde_json::to_value(&result)?;
    Ok((StatusCode::OK, Json(body)))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
