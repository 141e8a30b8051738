use reqwest::StatusCode;
use serde::Deserialize;
use crate::models::checkout_error::CheckoutError;

#[derive(Deserialize)]
struct ErrorBody {
  message: Option<String>,
  error: Option<String>,
}

pub fn classify_transport(error: &reqwest::Error) -> CheckoutError {
  if error.is_decode() {
    return CheckoutError::DecodingError(error.to_string())
  }

  if let Some(status) = error.status() {
    return classify_response(status, "")
  }

  CheckoutError::NetworkError(error.to_string())
}

/// Maps a non-success HTTP response. The body is inspected for a JSON `message` or
/// `error` field to carry a readable reason.
pub fn classify_response(status: StatusCode, body: &str) -> CheckoutError {
  let reason = serde_json::from_str::<ErrorBody>(body)
    .ok()
    .and_then(|body| body.message.or(body.error))
    .filter(|reason| !reason.trim().is_empty());

  match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CheckoutError::Unauthorized,
    StatusCode::PAYMENT_REQUIRED => CheckoutError::PaymentFailed(
      reason.unwrap_or_else(|| "payment required".to_string())
    ),
    _ => {
      let reason = reason.or_else(|| status.canonical_reason().map(str::to_string)).unwrap_or_default();
      CheckoutError::ServerError(format!("HTTP {}: {}", status.as_u16(), reason))
    }
  }
}

pub fn classify_decoding(error: &serde_json::Error) -> CheckoutError {
  CheckoutError::DecodingError(error.to_string())
}

pub fn classify_presentation_url(_: url::ParseError) -> CheckoutError {
  CheckoutError::InvalidURL
}

pub fn classify_deep_link(_: url::ParseError) -> CheckoutError {
  CheckoutError::InvalidDeepLink
}
