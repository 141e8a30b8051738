use url::Url;
use crate::models::{
  checkout_error::CheckoutError,
  deep_link::{DeepLinkEvent, DeepLinkKind},
  notification::PaymentNotification,
};
use super::error_classifier::classify_deep_link;

const SESSION_ID_PARAM: &str = "session_id";
const LISTING_ID_PARAM: &str = "listing_id";

fn query_param(url: &Url, name: &str) -> Option<String> {
  url.query_pairs()
    .find(|(key, _)| key == name)
    .map(|(_, value)| value.into_owned())
}

/// Classifies a return URL by its path. `/success` without a `session_id` parameter is a
/// `MissingSessionId` error; a blank one is passed through for the caller to ignore.
pub fn classify(raw: &str) -> Result<DeepLinkEvent, CheckoutError> {
  let url = Url::parse(raw).map_err(classify_deep_link)?;
  let path = url.path();
  let listing_id = query_param(&url, LISTING_ID_PARAM);

  if path.contains("/success") {
    let session_id = query_param(&url, SESSION_ID_PARAM).ok_or(CheckoutError::MissingSessionId)?;

    return Ok(DeepLinkEvent {
      kind: DeepLinkKind::Success,
      session_id: Some(session_id),
      listing_id,
    })
  }

  let kind = if path.contains("/cancel") {
    DeepLinkKind::Cancel
  } else {
    DeepLinkKind::Unknown
  };

  Ok(DeepLinkEvent {
    kind,
    session_id: None,
    listing_id,
  })
}

pub fn from_notification(notification: &PaymentNotification) -> DeepLinkEvent {
  let listing_id = Some(notification.listing_id().to_string());

  match notification {
    PaymentNotification::PaymentSuccess {session_id, ..} => DeepLinkEvent {
      kind: DeepLinkKind::Success,
      session_id: Some(session_id.clone()),
      listing_id,
    },
    PaymentNotification::PaymentCanceled {..} => DeepLinkEvent {
      kind: DeepLinkKind::Cancel,
      session_id: None,
      listing_id,
    },
  }
}
