#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepLinkKind {
  Success,
  Cancel,
  Unknown,
}

/// A classified redirect or notification. Consumed immediately or discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkEvent {
  pub kind: DeepLinkKind,
  pub session_id: Option<String>,
  pub listing_id: Option<String>,
}

impl DeepLinkEvent {
  /// `true` when the event carries no listing or carries the given one.
  pub fn matches_listing(&self, listing_id: &str) -> bool {
    self.listing_id.as_deref().map_or(true, |id| id == listing_id)
  }
}
