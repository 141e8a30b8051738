use std::{env, str::FromStr, time::Duration};
use eyre::{Result, WrapErr};
use url::Url;

/// Timing knobs of the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutConfig {
  pub settle_delay: Duration,
  pub poll_interval: Duration,
  pub poll_max_attempts: u32,
  pub grace_delay: Duration,
}

impl Default for CheckoutConfig {
  fn default() -> Self {
    Self {
      settle_delay: Duration::from_millis(300),
      poll_interval: Duration::from_secs(2),
      poll_max_attempts: 30,
      grace_delay: Duration::from_millis(500),
    }
  }
}

pub struct Config {
  pub api_base_url: Url,
  pub api_token: Option<String>,
  pub request_timeout: Duration,
  pub checkout: CheckoutConfig,
}

fn var_or<T>(name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match env::var(name) {
    Ok(value) => value.parse::<T>().wrap_err_with(|| format!("invalid {}", name)),
    Err(_) => Ok(default),
  }
}

fn millis_or(name: &str, default: Duration) -> Result<Duration> {
  var_or(name, default.as_millis() as u64).map(Duration::from_millis)
}

impl Config {
  pub fn new() -> Result<Self> {
    let defaults = CheckoutConfig::default();
    let api_base_url = env::var("CHECKOUT_API_BASE_URL").wrap_err("CHECKOUT_API_BASE_URL is not set")?;

    Ok(Self {
      api_base_url: Url::parse(&api_base_url).wrap_err("invalid CHECKOUT_API_BASE_URL")?,
      api_token: env::var("CHECKOUT_API_TOKEN").ok().filter(|token| !token.is_empty()),
      request_timeout: millis_or("CHECKOUT_REQUEST_TIMEOUT_MS", Duration::from_secs(15))?,
      checkout: CheckoutConfig {
        settle_delay: millis_or("CHECKOUT_SETTLE_DELAY_MS", defaults.settle_delay)?,
        poll_interval: millis_or("CHECKOUT_POLL_INTERVAL_MS", defaults.poll_interval)?,
        poll_max_attempts: var_or("CHECKOUT_POLL_MAX_ATTEMPTS", defaults.poll_max_attempts)?,
        grace_delay: millis_or("CHECKOUT_GRACE_DELAY_MS", defaults.grace_delay)?,
      },
    })
  }
}
