use serde::Deserialize;
use url::Url;

/// A backend-issued session, owned by the orchestrator for the lifetime of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
  pub session_id: String,
  pub presentation_url: Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
  Pending,
  RequiresAction,
  Complete,
  Expired,
}

impl Status {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Status::Complete | Status::Expired)
  }
}

/// Result of a single status check. Never cached past the poll that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
  #[serde(rename = "sessionStatus")]
  pub status: Status,
  #[serde(default)]
  pub transaction_id: Option<String>,
}

impl SessionStatus {
  pub fn pending() -> Self {
    Self {
      status: Status::Pending,
      transaction_id: None,
    }
  }

  pub fn complete(transaction_id: impl Into<String>) -> Self {
    Self {
      status: Status::Complete,
      transaction_id: Some(transaction_id.into()),
    }
  }
}
