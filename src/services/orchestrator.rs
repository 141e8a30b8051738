use std::{future, sync::Arc};
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use crate::{
  models::{
    checkout_error::CheckoutError,
    checkout_request::CheckoutRequest,
    checkout_session::{CheckoutSession, SessionStatus},
    notification::PaymentNotification,
    outcome::Outcome,
  },
  queue::payment_notifications::{PaymentNotifications, Subscription},
  utils::config::CheckoutConfig,
};
use super::{
  backend::CheckoutBackend,
  browser::{BrowserPresentationAdapter, BrowserSignal, BrowserSurface, HostEvent, HostEvents},
  completion::{CheckoutAttempt, CompletionDispatcher},
  session_creator::SessionCreator,
  status_poller::StatusPoller,
};

/// Observable state tag of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutState {
  Idle,
  CreatingSession,
  AwaitingUserAction,
  Polling,
  Completed,
}

enum Phase {
  Idle,
  CreatingSession,
  AwaitingUserAction {
    session: CheckoutSession,
    presented: bool,
  },
  Polling {
    session_id: String,
  },
  Completed,
}

impl Phase {
  fn tag(&self) -> CheckoutState {
    match self {
      Phase::Idle => CheckoutState::Idle,
      Phase::CreatingSession => CheckoutState::CreatingSession,
      Phase::AwaitingUserAction {..} => CheckoutState::AwaitingUserAction,
      Phase::Polling {..} => CheckoutState::Polling,
      Phase::Completed => CheckoutState::Completed,
    }
  }

  fn is_active(&self) -> bool {
    !matches!(self, Phase::Idle | Phase::Completed)
  }
}

enum Command {
  Start {
    request: CheckoutRequest,
    reply: oneshot::Sender<Option<CheckoutAttempt>>,
  },
  Cancel,
}

enum Step {
  Created(Result<CheckoutSession, CheckoutError>),
  Settled,
  Polled(Result<SessionStatus, CheckoutError>),
}

struct Attempt {
  id: u64,
  adapter: BrowserPresentationAdapter,
  dispatcher: CompletionDispatcher,
  cancel: CancellationToken,
}

/// Drives one externally-hosted checkout at a time to a single outcome.
///
/// All state lives in a background task spawned by [`CheckoutOrchestrator::new`]; the
/// handle only sends it commands. Must be created inside a tokio runtime.
pub struct CheckoutOrchestrator {
  commands: mpsc::UnboundedSender<Command>,
  state: watch::Receiver<CheckoutState>,
}

impl CheckoutOrchestrator {
  pub fn new(
    backend: Arc<dyn CheckoutBackend>,
    surface: Arc<dyn BrowserSurface>,
    notifications: PaymentNotifications,
    config: CheckoutConfig,
  ) -> Self {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (steps_tx, steps_rx) = mpsc::unbounded_channel();
    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let (state_tx, state_rx) = watch::channel(CheckoutState::Idle);

    let driver = Driver {
      creator: Arc::new(SessionCreator::new(Arc::clone(&backend))),
      poller: Arc::new(StatusPoller::new(backend)),
      surface,
      notifications,
      config,
      commands: commands_rx,
      steps_tx,
      steps_rx,
      host_tx,
      host_rx,
      state: state_tx,
      phase: Phase::Idle,
      attempt: None,
      subscription: None,
      next_attempt: 0,
    };
    tokio::spawn(driver.run());

    Self {
      commands: commands_tx,
      state: state_rx,
    }
  }

  /// Begins an attempt. Returns `None`, and does nothing else, while another attempt is
  /// still active or a session creation is in flight.
  pub async fn start(&self, request: CheckoutRequest) -> Option<CheckoutAttempt> {
    let (reply, rx) = oneshot::channel();

    if self.commands.send(Command::Start {request, reply}).is_err() {
      return None
    }

    rx.await.ok().flatten()
  }

  pub fn cancel(&self) {
    let _ = self.commands.send(Command::Cancel);
  }

  pub fn state(&self) -> CheckoutState {
    *self.state.borrow()
  }

  pub fn watch_state(&self) -> watch::Receiver<CheckoutState> {
    self.state.clone()
  }
}

struct Driver {
  creator: Arc<SessionCreator>,
  poller: Arc<StatusPoller>,
  surface: Arc<dyn BrowserSurface>,
  notifications: PaymentNotifications,
  config: CheckoutConfig,
  commands: mpsc::UnboundedReceiver<Command>,
  steps_tx: mpsc::UnboundedSender<(u64, Step)>,
  steps_rx: mpsc::UnboundedReceiver<(u64, Step)>,
  host_tx: mpsc::UnboundedSender<(u64, HostEvent)>,
  host_rx: mpsc::UnboundedReceiver<(u64, HostEvent)>,
  state: watch::Sender<CheckoutState>,
  phase: Phase,
  attempt: Option<Attempt>,
  subscription: Option<Subscription>,
  next_attempt: u64,
}

async fn next_notification(subscription: Option<&mut Subscription>) -> Option<PaymentNotification> {
  match subscription {
    Some(subscription) => subscription.recv().await,
    None => future::pending().await,
  }
}

impl Driver {
  async fn run(mut self) {
    loop {
      tokio::select! {
        biased;
        command = self.commands.recv() => match command {
          Some(Command::Start {request, reply}) => self.on_start(request, reply),
          Some(Command::Cancel) => self.on_cancel(),
          None => break,
        },
        Some((attempt, step)) = self.steps_rx.recv() => self.on_step(attempt, step),
        Some((attempt, event)) = self.host_rx.recv() => self.on_host_event(attempt, event),
        notification = next_notification(self.subscription.as_mut()) => match notification {
          Some(notification) => self.on_notification(notification),
          None => self.subscription = None,
        },
      }
    }

    if self.phase.is_active() {
      info!("Checkout orchestrator dropped mid-attempt; cancelling");
      self.close_browser();
      self.finish(Outcome::Cancelled);
    }
  }

  fn transition(&mut self, phase: Phase) {
    let from = self.phase.tag();
    let to = phase.tag();

    info!("Checkout attempt {:?}: {:?} -> {:?}", self.attempt.as_ref().map(|attempt| attempt.id), from, to);
    self.phase = phase;
    self.state.send_replace(to);
  }

  fn is_current(&self, attempt: u64) -> bool {
    self.attempt.as_ref().map_or(false, |current| current.id == attempt)
  }

  fn on_start(&mut self, request: CheckoutRequest, reply: oneshot::Sender<Option<CheckoutAttempt>>) {
    if self.phase.is_active() {
      info!("Ignoring checkout start for listing {}: an attempt is already {:?}", request.listing_id(), self.phase.tag());
      let _ = reply.send(None);
      return
    }

    let guard = match self.creator.try_begin() {
      Some(guard) => guard,
      None => {
        info!("Ignoring checkout start for listing {}: session creation in flight", request.listing_id());
        let _ = reply.send(None);
        return
      }
    };

    self.next_attempt += 1;
    let id = self.next_attempt;
    let (dispatcher, handle) = CompletionDispatcher::new(self.config.grace_delay);
    let cancel = CancellationToken::new();

    self.subscription = Some(self.notifications.subscribe());
    self.attempt = Some(Attempt {
      id,
      adapter: BrowserPresentationAdapter::new(request.listing_id()),
      dispatcher,
      cancel: cancel.clone(),
    });
    self.transition(Phase::CreatingSession);

    let creator = Arc::clone(&self.creator);
    let steps = self.steps_tx.clone();

    tokio::spawn(async move {
      let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        result = creator.create_guarded(guard, &request) => result,
      };
      let _ = steps.send((id, Step::Created(result)));
    });

    let _ = reply.send(Some(handle));
  }

  fn on_cancel(&mut self) {
    if !self.phase.is_active() {
      debug!("Ignoring cancel: no active checkout attempt");
      return
    }

    if let Some(attempt) = self.attempt.as_ref() {
      info!("Checkout attempt {} cancelled by caller", attempt.id);
    }
    self.close_browser();
    self.finish(Outcome::Cancelled);
  }

  fn on_step(&mut self, attempt: u64, step: Step) {
    if !self.is_current(attempt) {
      debug!("Discarding result of superseded checkout attempt {}", attempt);
      return
    }

    match step {
      Step::Created(result) => {
        if !matches!(self.phase, Phase::CreatingSession) {
          debug!("Ignoring session creation result in state {:?}", self.phase.tag());
          return
        }

        match result {
          Ok(session) => {
            self.transition(Phase::AwaitingUserAction {session, presented: false});
            self.schedule_presentation(attempt);
          },
          Err(error) => {
            warn!("Checkout session creation failed: {}", error);
            self.finish(Outcome::Failed(error));
          }
        }
      },
      Step::Settled => {
        if let Phase::AwaitingUserAction {session, presented} = &mut self.phase {
          if !*presented {
            info!("Presenting checkout session {}", session.session_id);
            *presented = true;
            self.surface.present(&session.presentation_url, HostEvents::new(attempt, self.host_tx.clone()));
          }
        }
      },
      Step::Polled(result) => {
        let session_id = match &self.phase {
          Phase::Polling {session_id} => session_id.clone(),
          _ => return,
        };

        let outcome = match result {
          Ok(SessionStatus {transaction_id: Some(transaction_id), ..}) if !transaction_id.trim().is_empty() => {
            Outcome::Success(transaction_id)
          },
          Ok(_) => {
            warn!("Checkout session {} complete without a transaction id", session_id);
            Outcome::Failed(CheckoutError::MissingSessionId)
          },
          Err(error) => {
            warn!("Polling of checkout session {} failed: {}", session_id, error);
            Outcome::Failed(error)
          }
        };
        self.finish(outcome);
      }
    }
  }

  fn schedule_presentation(&self, attempt: u64) {
    let settle_delay = self.config.settle_delay;
    let steps = self.steps_tx.clone();
    let cancel = match &self.attempt {
      Some(current) => current.cancel.clone(),
      None => return,
    };

    tokio::spawn(async move {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {},
        _ = tokio::time::sleep(settle_delay) => {
          let _ = steps.send((attempt, Step::Settled));
        }
      }
    });
  }

  fn on_host_event(&mut self, attempt: u64, event: HostEvent) {
    if !self.is_current(attempt) {
      debug!("Discarding browser event {:?} from superseded attempt {}", event, attempt);
      return
    }

    let signal = self.attempt.as_ref().and_then(|current| current.adapter.on_host_event(event));
    if let Some(signal) = signal {
      self.on_signal(signal);
    }
  }

  fn on_notification(&mut self, notification: PaymentNotification) {
    let signal = self.attempt.as_ref().and_then(|current| current.adapter.on_notification(&notification));
    if let Some(signal) = signal {
      self.on_signal(signal);
    }
  }

  fn on_signal(&mut self, signal: BrowserSignal) {
    let active_session_id = match &self.phase {
      Phase::AwaitingUserAction {session, ..} => session.session_id.clone(),
      _ => {
        debug!("Ignoring {:?} in state {:?}", signal, self.phase.tag());
        return
      }
    };

    match signal {
      BrowserSignal::Succeeded {session_id} => {
        if session_id.trim().is_empty() {
          warn!("Ignoring payment success with a blank session id");
          return
        }

        if session_id != active_session_id {
          warn!("Ignoring payment success for session {}; active session is {}", session_id, active_session_id);
          return
        }

        self.close_browser();
        self.transition(Phase::Polling {session_id: session_id.clone()});
        self.start_polling(session_id);
      },
      BrowserSignal::Cancelled => {
        self.close_browser();
        self.finish(Outcome::Cancelled);
      },
      BrowserSignal::Failed(error) => {
        warn!("Checkout browser reported {}", error);
        self.close_browser();
        self.finish(Outcome::Failed(error));
      }
    }
  }

  fn start_polling(&self, session_id: String) {
    let (id, cancel) = match &self.attempt {
      Some(current) => (current.id, current.cancel.clone()),
      None => return,
    };
    let poller = Arc::clone(&self.poller);
    let steps = self.steps_tx.clone();
    let max_attempts = self.config.poll_max_attempts;
    let interval = self.config.poll_interval;

    tokio::spawn(async move {
      let result = poller.poll(&session_id, max_attempts, interval, &cancel).await;

      if !cancel.is_cancelled() {
        let _ = steps.send((id, Step::Polled(result)));
      }
    });
  }

  fn close_browser(&mut self) {
    if let Phase::AwaitingUserAction {presented: true, ..} = self.phase {
      self.surface.close();
    }
  }

  fn finish(&mut self, outcome: Outcome) {
    self.transition(Phase::Completed);

    if let Some(mut attempt) = self.attempt.take() {
      attempt.cancel.cancel();
      attempt.dispatcher.complete(outcome);
    }

    if let Some(subscription) = self.subscription.take() {
      subscription.unsubscribe();
    }
  }
}
