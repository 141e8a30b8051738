use tokio::sync::mpsc;
use tracing::{debug, warn};
use url::Url;
use crate::models::{
  checkout_error::CheckoutError,
  deep_link::{DeepLinkEvent, DeepLinkKind},
  notification::PaymentNotification,
};
use super::deep_link_router;

/// The embedded-browser surface owned by the host application.
pub trait BrowserSurface: Send + Sync {
  fn present(&self, url: &Url, events: HostEvents);

  fn close(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
  Redirected(String),
  UserDismissed,
}

/// Handle the host uses to report what happened inside the browser it presented.
#[derive(Debug, Clone)]
pub struct HostEvents {
  attempt: u64,
  tx: mpsc::UnboundedSender<(u64, HostEvent)>,
}

impl HostEvents {
  pub(crate) fn new(attempt: u64, tx: mpsc::UnboundedSender<(u64, HostEvent)>) -> Self {
    Self {
      attempt,
      tx,
    }
  }

  pub fn redirected(&self, url: &str) {
    self.send(HostEvent::Redirected(url.to_string()));
  }

  pub fn user_dismissed(&self) {
    self.send(HostEvent::UserDismissed);
  }

  fn send(&self, event: HostEvent) {
    if self.tx.send((self.attempt, event)).is_err() {
      debug!("Dropping browser event; checkout orchestrator is gone");
    }
  }
}

/// What the orchestrator learns from the browser seam, regardless of which channel
/// detected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserSignal {
  Succeeded {
    session_id: String,
  },
  Cancelled,
  Failed(CheckoutError),
}

pub struct BrowserPresentationAdapter {
  listing_id: String,
}

impl BrowserPresentationAdapter {
  pub fn new(listing_id: impl Into<String>) -> Self {
    Self {
      listing_id: listing_id.into(),
    }
  }

  pub fn on_host_event(&self, event: HostEvent) -> Option<BrowserSignal> {
    match event {
      HostEvent::UserDismissed => {
        debug!("Checkout browser dismissed by user");
        Some(BrowserSignal::Cancelled)
      },
      HostEvent::Redirected(url) => {
        debug!("Checkout browser redirected to {}", url);
        self.route(deep_link_router::classify(&url))
      }
    }
  }

  pub fn on_notification(&self, notification: &PaymentNotification) -> Option<BrowserSignal> {
    self.route(Ok(deep_link_router::from_notification(notification)))
  }

  fn route(&self, classified: Result<DeepLinkEvent, CheckoutError>) -> Option<BrowserSignal> {
    let event = match classified {
      Ok(event) => event,
      Err(error) => return Some(BrowserSignal::Failed(error)),
    };

    if !event.matches_listing(&self.listing_id) {
      debug!(
        "Ignoring {:?} deep link for listing {:?}; active listing is {}",
        event.kind,
        event.listing_id,
        self.listing_id,
      );
      return None
    }

    match event.kind {
      DeepLinkKind::Success => match event.session_id {
        Some(session_id) => Some(BrowserSignal::Succeeded {session_id}),
        None => {
          warn!("Success deep link without a session id");
          Some(BrowserSignal::Failed(CheckoutError::MissingSessionId))
        }
      },
      DeepLinkKind::Cancel => Some(BrowserSignal::Cancelled),
      DeepLinkKind::Unknown => Some(BrowserSignal::Failed(CheckoutError::UnknownDeepLink)),
    }
  }
}
