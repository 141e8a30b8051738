use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::models::{
  checkout_error::CheckoutError,
  checkout_session::{SessionStatus, Status},
};
use super::backend::CheckoutBackend;

pub struct StatusPoller {
  backend: Arc<dyn CheckoutBackend>,
}

impl StatusPoller {
  pub fn new(backend: Arc<dyn CheckoutBackend>) -> Self {
    Self {
      backend,
    }
  }

  /// Waits `interval` before each status check and stops at the first terminal status.
  /// `expired`, and running out of attempts, both end in `SessionExpired`. Cancelling the
  /// token abandons the pending wait or request and yields `UserCanceled`.
  pub async fn poll(
    &self,
    session_id: &str,
    max_attempts: u32,
    interval: Duration,
    cancel: &CancellationToken,
  ) -> Result<SessionStatus, CheckoutError> {
    for attempt in 1..=max_attempts {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CheckoutError::UserCanceled),
        _ = tokio::time::sleep(interval) => {}
      }

      let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CheckoutError::UserCanceled),
        status = self.backend.check_checkout_status(session_id) => status?,
      };

      if !status.status.is_terminal() {
        debug!("Checkout session {} still {:?} ({}/{})", session_id, status.status, attempt, max_attempts);
        continue
      }

      if status.status == Status::Expired {
        info!("Checkout session {} expired", session_id);
        return Err(CheckoutError::SessionExpired)
      }

      info!("Checkout session {} complete after {} polls", session_id, attempt);
      return Ok(status)
    }

    warn!("Checkout session {} unresolved after {} polls", session_id, max_attempts);
    Err(CheckoutError::SessionExpired)
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::VecDeque, sync::Mutex};
  use async_trait::async_trait;
  use tokio::time::Instant;
  use crate::{
    models::checkout_request::CheckoutRequest,
    services::backend::CreatedSession,
  };
  use super::*;

  struct ScriptedBackend {
    statuses: Mutex<VecDeque<Result<SessionStatus, CheckoutError>>>,
    calls: Mutex<Vec<Instant>>,
  }

  impl ScriptedBackend {
    fn new(statuses: Vec<Result<SessionStatus, CheckoutError>>) -> Arc<Self> {
      Arc::new(Self {
        statuses: Mutex::new(statuses.into()),
        calls: Mutex::new(vec![]),
      })
    }

    fn call_count(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  #[async_trait]
  impl CheckoutBackend for ScriptedBackend {
    async fn create_checkout_session(&self, _: &CheckoutRequest) -> Result<CreatedSession, CheckoutError> {
      Err(CheckoutError::ServerError("unused".to_string()))
    }

    async fn check_checkout_status(&self, _: &str) -> Result<SessionStatus, CheckoutError> {
      self.calls.lock().unwrap().push(Instant::now());
      self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(SessionStatus::pending()))
    }
  }

  const INTERVAL: Duration = Duration::from_secs(2);

  #[tokio::test(start_paused = true)]
  async fn resolves_after_pending_statuses() {
    let mut script: Vec<_> = (0..9).map(|_| Ok(SessionStatus::pending())).collect();
    script.push(Ok(SessionStatus::complete("txn_9")));
    let backend = ScriptedBackend::new(script);
    let poller = StatusPoller::new(backend.clone());
    let started = Instant::now();

    let status = poller.poll("cs_1", 10, INTERVAL, &CancellationToken::new()).await.unwrap();

    assert_eq!(status.transaction_id.as_deref(), Some("txn_9"));
    assert_eq!(backend.call_count(), 10);
    assert!(started.elapsed() >= INTERVAL * 10);
  }

  #[tokio::test(start_paused = true)]
  async fn checks_are_spaced_by_interval() {
    let backend = ScriptedBackend::new(vec![]);
    let poller = StatusPoller::new(backend.clone());

    let _ = poller.poll("cs_1", 3, INTERVAL, &CancellationToken::new()).await;

    let calls = backend.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 3);
    assert!(calls.windows(2).all(|pair| pair[1] - pair[0] >= INTERVAL));
  }

  #[tokio::test(start_paused = true)]
  async fn exhausting_attempts_is_expiry() {
    let backend = ScriptedBackend::new(vec![]);
    let poller = StatusPoller::new(backend.clone());

    let result = poller.poll("cs_1", 5, INTERVAL, &CancellationToken::new()).await;

    assert_eq!(result, Err(CheckoutError::SessionExpired));
    assert_eq!(backend.call_count(), 5);
  }

  #[tokio::test(start_paused = true)]
  async fn expired_status_stops_polling() {
    let backend = ScriptedBackend::new(vec![
      Ok(SessionStatus::pending()),
      Ok(SessionStatus {status: Status::Expired, transaction_id: None}),
    ]);
    let poller = StatusPoller::new(backend.clone());

    let result = poller.poll("cs_1", 10, INTERVAL, &CancellationToken::new()).await;

    assert_eq!(result, Err(CheckoutError::SessionExpired));
    assert_eq!(backend.call_count(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn status_error_is_terminal() {
    let backend = ScriptedBackend::new(vec![
      Ok(SessionStatus {status: Status::RequiresAction, transaction_id: None}),
      Err(CheckoutError::ServerError("HTTP 500: boom".to_string())),
    ]);
    let poller = StatusPoller::new(backend.clone());

    let result = poller.poll("cs_1", 10, INTERVAL, &CancellationToken::new()).await;

    assert_eq!(result, Err(CheckoutError::ServerError("HTTP 500: boom".to_string())));
    assert_eq!(backend.call_count(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn cancellation_stops_further_checks() {
    let backend = ScriptedBackend::new(vec![]);
    let poller = StatusPoller::new(backend.clone());
    let token = CancellationToken::new();
    let canceller = token.clone();

    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_secs(5)).await;
      canceller.cancel();
    });
    let result = poller.poll("cs_1", 100, INTERVAL, &token).await;

    assert_eq!(result, Err(CheckoutError::UserCanceled));
    assert_eq!(backend.call_count(), 2);
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(backend.call_count(), 2);
  }
}
