#![allow(dead_code)]

use std::{
  collections::VecDeque,
  sync::{
    Arc,
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::Duration,
};
use async_trait::async_trait;
use tokio::{sync::mpsc, time::Instant};
use url::Url;
use checkout_orchestrator::{
  models::{
    checkout_error::CheckoutError,
    checkout_request::{CheckoutRequest, DeliveryMethod},
    checkout_session::SessionStatus,
  },
  queue::payment_notifications::PaymentNotifications,
  services::{
    backend::{CheckoutBackend, CreatedSession},
    browser::{BrowserSurface, HostEvents},
    orchestrator::{CheckoutOrchestrator, CheckoutState},
  },
  utils::config::CheckoutConfig,
};

pub const LISTING_ID: &str = "listing-1";
pub const CREATE_LATENCY: Duration = Duration::from_millis(100);

pub fn request() -> CheckoutRequest {
  CheckoutRequest::sale(LISTING_ID, "seller-1", DeliveryMethod::Pickup)
}

pub fn config() -> CheckoutConfig {
  CheckoutConfig {
    poll_max_attempts: 10,
    ..CheckoutConfig::default()
  }
}

pub struct FakeBackend {
  created: Result<CreatedSession, CheckoutError>,
  statuses: Mutex<VecDeque<Result<SessionStatus, CheckoutError>>>,
  pub create_calls: AtomicUsize,
  pub status_calls: Mutex<Vec<Instant>>,
  pub created_at: Mutex<Option<Instant>>,
}

impl FakeBackend {
  pub fn new(statuses: Vec<Result<SessionStatus, CheckoutError>>) -> Self {
    Self::creating(Ok(CreatedSession {
      session_id: "cs_123".to_string(),
      url: "https://pay.example/cs_123".to_string(),
    }), statuses)
  }

  pub fn creating(created: Result<CreatedSession, CheckoutError>, statuses: Vec<Result<SessionStatus, CheckoutError>>) -> Self {
    Self {
      created,
      statuses: Mutex::new(statuses.into()),
      create_calls: AtomicUsize::new(0),
      status_calls: Mutex::new(vec![]),
      created_at: Mutex::new(None),
    }
  }

  pub fn create_count(&self) -> usize {
    self.create_calls.load(Ordering::SeqCst)
  }

  pub fn status_count(&self) -> usize {
    self.status_calls.lock().unwrap().len()
  }
}

#[async_trait]
impl CheckoutBackend for FakeBackend {
  async fn create_checkout_session(&self, _: &CheckoutRequest) -> Result<CreatedSession, CheckoutError> {
    self.create_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(CREATE_LATENCY).await;
    *self.created_at.lock().unwrap() = Some(Instant::now());
    self.created.clone()
  }

  async fn check_checkout_status(&self, _: &str) -> Result<SessionStatus, CheckoutError> {
    self.status_calls.lock().unwrap().push(Instant::now());
    self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(SessionStatus::pending()))
  }
}

pub struct Presentation {
  pub url: Url,
  pub events: HostEvents,
  pub at: Instant,
}

pub struct FakeSurface {
  presented: mpsc::UnboundedSender<Presentation>,
  pub presents: AtomicUsize,
  pub closes: AtomicUsize,
}

impl BrowserSurface for FakeSurface {
  fn present(&self, url: &Url, events: HostEvents) {
    self.presents.fetch_add(1, Ordering::SeqCst);
    let _ = self.presented.send(Presentation {url: url.clone(), events, at: Instant::now()});
  }

  fn close(&self) {
    self.closes.fetch_add(1, Ordering::SeqCst);
  }
}

impl FakeSurface {
  pub fn present_count(&self) -> usize {
    self.presents.load(Ordering::SeqCst)
  }

  pub fn close_count(&self) -> usize {
    self.closes.load(Ordering::SeqCst)
  }
}

pub struct Harness {
  pub orchestrator: CheckoutOrchestrator,
  pub backend: Arc<FakeBackend>,
  pub surface: Arc<FakeSurface>,
  pub notifications: PaymentNotifications,
  presented: mpsc::UnboundedReceiver<Presentation>,
}

impl Harness {
  pub fn new(backend: FakeBackend) -> Self {
    Self::with_config(backend, config())
  }

  pub fn with_config(backend: FakeBackend, config: CheckoutConfig) -> Self {
    let backend = Arc::new(backend);
    let (tx, presented) = mpsc::unbounded_channel();
    let surface = Arc::new(FakeSurface {
      presented: tx,
      presents: AtomicUsize::new(0),
      closes: AtomicUsize::new(0),
    });
    let notifications = PaymentNotifications::new();
    let orchestrator = CheckoutOrchestrator::new(
      backend.clone(),
      surface.clone(),
      notifications.clone(),
      config,
    );

    Self {
      orchestrator,
      backend,
      surface,
      notifications,
      presented,
    }
  }

  pub async fn next_presentation(&mut self) -> Presentation {
    self.presented.recv().await.expect("surface dropped")
  }

  pub async fn wait_for(&self, state: CheckoutState) {
    let mut rx = self.orchestrator.watch_state();
    rx.wait_for(|current| *current == state).await.expect("orchestrator stopped");
  }
}
