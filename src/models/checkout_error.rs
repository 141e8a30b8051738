use thiserror::Error;

/// Every failure an attempt can end with. Collaborators only ever hand these to the
/// orchestrator; raw transport and decoding errors are classified first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
  #[error("Invalid checkout URL")]
  InvalidURL,
  #[error("Invalid payment callback")]
  InvalidDeepLink,
  #[error("Missing session ID in payment callback")]
  MissingSessionId,
  #[error("Unknown payment callback")]
  UnknownDeepLink,
  #[error("Checkout session expired")]
  SessionExpired,
  #[error("Payment failed: {0}")]
  PaymentFailed(String),
  #[error("Payment canceled")]
  UserCanceled,
  #[error("Network error: {0}")]
  NetworkError(String),
  #[error("Unauthorized")]
  Unauthorized,
  #[error("Server error: {0}")]
  ServerError(String),
  #[error("Could not decode response: {0}")]
  DecodingError(String),
}
