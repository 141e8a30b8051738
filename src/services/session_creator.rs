use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info};
use crate::models::{
  checkout_error::CheckoutError,
  checkout_request::CheckoutRequest,
  checkout_session::CheckoutSession,
};
use super::backend::{CheckoutBackend, parse_presentation_url};

/// Held while a create call is outstanding; clears the in-flight flag when dropped,
/// whichever way the call ends.
pub struct InFlightGuard {
  flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

pub struct SessionCreator {
  backend: Arc<dyn CheckoutBackend>,
  in_flight: Arc<AtomicBool>,
}

impl SessionCreator {
  pub fn new(backend: Arc<dyn CheckoutBackend>) -> Self {
    Self {
      backend,
      in_flight: Arc::new(AtomicBool::new(false)),
    }
  }

  pub fn is_in_flight(&self) -> bool {
    self.in_flight.load(Ordering::Acquire)
  }

  pub fn try_begin(&self) -> Option<InFlightGuard> {
    self.in_flight
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| InFlightGuard {flag: Arc::clone(&self.in_flight)})
  }

  /// Returns `Ok(None)` without touching the backend when another creation is already
  /// outstanding.
  pub async fn create(&self, request: &CheckoutRequest) -> Result<Option<CheckoutSession>, CheckoutError> {
    match self.try_begin() {
      Some(guard) => self.create_guarded(guard, request).await.map(Some),
      None => {
        debug!("Ignoring checkout session creation for listing {}: one is already in flight", request.listing_id());
        Ok(None)
      }
    }
  }

  pub async fn create_guarded(&self, _guard: InFlightGuard, request: &CheckoutRequest) -> Result<CheckoutSession, CheckoutError> {
    info!("Creating checkout session for listing {} from seller {}", request.listing_id(), request.seller_id());

    let created = self.backend.create_checkout_session(request).await?;
    let presentation_url = parse_presentation_url(&created.url)?;

    if created.session_id.trim().is_empty() {
      return Err(CheckoutError::MissingSessionId)
    }

    info!("Created checkout session {}", created.session_id);
    Ok(CheckoutSession {
      session_id: created.session_id,
      presentation_url,
    })
  }
}
