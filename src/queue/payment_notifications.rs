use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use crate::{
  models::{deep_link::DeepLinkKind, notification::PaymentNotification},
  services::deep_link_router,
};

const CHANNEL_CAPACITY: usize = 64;

/// Process-wide fan-out of payment notifications. Created at app start and never torn
/// down; publishers fire and forget.
#[derive(Clone)]
pub struct PaymentNotifications {
  tx: broadcast::Sender<PaymentNotification>,
}

impl Default for PaymentNotifications {
  fn default() -> Self {
    Self::new()
  }
}

impl PaymentNotifications {
  pub fn new() -> Self {
    let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);

    Self {
      tx,
    }
  }

  /// Returns how many subscribers received the notification.
  pub fn publish(&self, notification: PaymentNotification) -> usize {
    debug!("Publishing {:?}", notification);
    self.tx.send(notification).unwrap_or(0)
  }

  pub fn subscribe(&self) -> Subscription {
    Subscription {
      rx: self.tx.subscribe(),
    }
  }

  /// Entry point for a payment return URL intercepted by the platform outside the
  /// embedded browser. Links that carry no usable session id are dropped here.
  pub fn publish_deep_link(&self, url: &str) -> Option<usize> {
    let event = match deep_link_router::classify(url) {
      Ok(event) => event,
      Err(error) => {
        warn!("Dropping payment deep link {}: {}", url, error);
        return None
      }
    };
    let listing_id = event.listing_id.unwrap_or_default();

    let notification = match event.kind {
      DeepLinkKind::Success => {
        let session_id = event.session_id.unwrap_or_default();
        if session_id.trim().is_empty() {
          warn!("Dropping payment deep link {}: blank session id", url);
          return None
        }
        info!("Checkout session {} completed for listing {}", session_id, listing_id);
        PaymentNotification::PaymentSuccess {session_id, listing_id}
      },
      DeepLinkKind::Cancel => {
        info!("Checkout canceled for listing {}", listing_id);
        PaymentNotification::PaymentCanceled {listing_id}
      },
      DeepLinkKind::Unknown => {
        warn!("Dropping unrecognized payment deep link {}", url);
        return None
      }
    };

    Some(self.publish(notification))
  }
}

/// A live subscription. Dropping it unsubscribes.
pub struct Subscription {
  rx: broadcast::Receiver<PaymentNotification>,
}

impl Subscription {
  /// `None` once the channel is closed.
  pub async fn recv(&mut self) -> Option<PaymentNotification> {
    loop {
      match self.rx.recv().await {
        Ok(notification) => return Some(notification),
        Err(RecvError::Lagged(skipped)) => warn!("Payment notification subscriber skipped {} messages", skipped),
        Err(RecvError::Closed) => return None,
      }
    }
  }

  pub fn unsubscribe(self) {
    debug!("Unsubscribing from payment notifications");
  }
}
