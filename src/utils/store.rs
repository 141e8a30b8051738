use std::sync::Arc;
use eyre::Result;
use crate::{
  queue::payment_notifications::PaymentNotifications,
  services::backend::{CheckoutBackend, HttpCheckoutBackend},
};
use super::config::Config;

pub struct Store {
  pub config: Config,
  pub backend: Arc<dyn CheckoutBackend>,
  pub notifications: PaymentNotifications,
}

impl Store {
  pub fn new() -> Result<Self> {
    let config = Config::new()?;
    let backend = Arc::new(HttpCheckoutBackend::new(
      config.api_base_url.clone(),
      config.api_token.clone(),
      config.request_timeout,
    )?);

    Ok(Self {
      config,
      backend,
      notifications: PaymentNotifications::new(),
    })
  }
}
