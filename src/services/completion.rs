use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};
use crate::models::outcome::Outcome;

/// Caller side of one attempt: the outcome arrives first, the teardown signal follows
/// after the grace delay. Each resolves once; later calls return `None`/`false`.
pub struct CheckoutAttempt {
  outcome: Option<oneshot::Receiver<Outcome>>,
  teardown: Option<oneshot::Receiver<()>>,
}

impl CheckoutAttempt {
  pub async fn outcome(&mut self) -> Option<Outcome> {
    self.outcome.take()?.await.ok()
  }

  pub async fn teardown(&mut self) -> bool {
    match self.teardown.take() {
      Some(teardown) => teardown.await.is_ok(),
      None => false,
    }
  }
}

/// Exactly-once outcome delivery. The first `complete` wins; later calls are no-ops.
pub struct CompletionDispatcher {
  delivered: Option<Outcome>,
  on_outcome: Option<oneshot::Sender<Outcome>>,
  on_teardown: Option<oneshot::Sender<()>>,
  grace_delay: Duration,
}

impl CompletionDispatcher {
  pub fn new(grace_delay: Duration) -> (Self, CheckoutAttempt) {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (teardown_tx, teardown_rx) = oneshot::channel();

    let dispatcher = Self {
      delivered: None,
      on_outcome: Some(outcome_tx),
      on_teardown: Some(teardown_tx),
      grace_delay,
    };

    (dispatcher, CheckoutAttempt {outcome: Some(outcome_rx), teardown: Some(teardown_rx)})
  }

  pub fn delivered(&self) -> Option<&Outcome> {
    self.delivered.as_ref()
  }

  pub fn complete(&mut self, outcome: Outcome) -> bool {
    if let Some(first) = &self.delivered {
      debug!("Ignoring outcome {:?}; already delivered {:?}", outcome, first);
      return false
    }

    info!("Delivering checkout outcome {:?}", outcome);
    self.delivered = Some(outcome.clone());

    if let Some(on_outcome) = self.on_outcome.take() {
      // the caller may have stopped listening
      let _ = on_outcome.send(outcome);
    }

    if let Some(on_teardown) = self.on_teardown.take() {
      let grace_delay = self.grace_delay;

      tokio::spawn(async move {
        tokio::time::sleep(grace_delay).await;
        debug!("Grace delay elapsed; signalling teardown");
        let _ = on_teardown.send(());
      });
    }

    true
  }
}
