/// Payloads carried by the process-wide payment notification channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentNotification {
  PaymentSuccess {
    session_id: String,
    listing_id: String,
  },
  PaymentCanceled {
    listing_id: String,
  },
}

impl PaymentNotification {
  pub fn listing_id(&self) -> &str {
    match self {
      PaymentNotification::PaymentSuccess {listing_id, ..} => listing_id,
      PaymentNotification::PaymentCanceled {listing_id} => listing_id,
    }
  }
}
