use std::{
  env,
  io::{self, BufRead, Write},
  panic,
  process,
  sync::Arc,
};
use actix::prelude::*;
use chrono::{DateTime, Utc};
use eyre::{Report, Result, WrapErr};
use tracing::{error, info};
use url::Url;
use checkout_orchestrator::{
  models::{
    checkout_request::{CheckoutRequest, DeliveryMethod},
    outcome::Outcome,
  },
  services::{
    browser::{BrowserSurface, HostEvents},
    orchestrator::CheckoutOrchestrator,
  },
  utils::store::Store,
};

/// Prints the checkout URL and reads the return URL back from stdin. An empty line
/// counts as the user dismissing the browser.
struct TerminalSurface;

impl BrowserSurface for TerminalSurface {
  fn present(&self, url: &Url, events: HostEvents) {
    println!("Open {} to pay, then paste the URL you were redirected to (empty line to cancel):", url);
    let _ = io::stdout().flush();

    tokio::task::spawn_blocking(move || {
      let mut line = String::new();

      match io::stdin().lock().read_line(&mut line) {
        Ok(_) if !line.trim().is_empty() => events.redirected(line.trim()),
        _ => events.user_dismissed(),
      }
    });
  }

  fn close(&self) {
    info!("Checkout browser closed");
  }
}

fn delivery_method(value: &str) -> Result<DeliveryMethod> {
  match value.to_uppercase().as_str() {
    "PICKUP" => Ok(DeliveryMethod::Pickup),
    "DELIVERY" => Ok(DeliveryMethod::Delivery),
    "SHIPPING" => Ok(DeliveryMethod::Shipping),
    other => Err(Report::msg(format!("unknown delivery method {}", other))),
  }
}

fn rental_date(name: &str) -> Result<DateTime<Utc>> {
  let value = env::var(name).wrap_err_with(|| format!("{} is required for rentals", name))?;

  Ok(DateTime::parse_from_rfc3339(&value)?.with_timezone(&Utc))
}

fn request_from_env() -> Result<CheckoutRequest> {
  let listing_id = env::var("CHECKOUT_LISTING_ID").wrap_err("CHECKOUT_LISTING_ID is not set")?;
  let seller_id = env::var("CHECKOUT_SELLER_ID").wrap_err("CHECKOUT_SELLER_ID is not set")?;
  let delivery = delivery_method(&env::var("CHECKOUT_DELIVERY_METHOD").unwrap_or_else(|_| "PICKUP".to_string()))?;
  let transaction_type = env::var("CHECKOUT_TRANSACTION_TYPE").unwrap_or_else(|_| "SALE".to_string());

  let request = match transaction_type.to_uppercase().as_str() {
    "SALE" => CheckoutRequest::sale(listing_id, seller_id, delivery),
    "RENTAL" => CheckoutRequest::rental(
      listing_id,
      seller_id,
      rental_date("CHECKOUT_RENTAL_START")?,
      rental_date("CHECKOUT_RENTAL_END")?,
      delivery,
    )?,
    other => return Err(Report::msg(format!("unknown transaction type {}", other))),
  };

  match env::var("CHECKOUT_INCLUDE_INSURANCE") {
    Ok(value) => Ok(request.with_insurance(value.parse::<bool>()?)),
    Err(_) => Ok(request),
  }
}

async fn run_checkout() -> Result<()> {
  let store = Store::new()?;
  let request = request_from_env()?;
  let orchestrator = CheckoutOrchestrator::new(
    Arc::clone(&store.backend),
    Arc::new(TerminalSurface),
    store.notifications.clone(),
    store.config.checkout,
  );

  let mut attempt = orchestrator.start(request)
    .await
    .ok_or_else(|| Report::msg("checkout already in progress"))?;

  match attempt.outcome().await {
    Some(Outcome::Success(transaction_id)) => println!("Payment completed: {}", transaction_id),
    Some(Outcome::Cancelled) => println!("Payment canceled"),
    Some(Outcome::Failed(error)) => println!("Payment failed: {}", error),
    None => return Err(Report::msg("checkout ended without an outcome")),
  }

  attempt.teardown().await;
  Ok(())
}

fn main() {
  let orig_hook = panic::take_hook();
  panic::set_hook(Box::new(move |panic_info| {
    orig_hook(panic_info);
    process::exit(1);
  }));

  if env::var("ENV").map(|env| env == "development").unwrap_or(false) {
    dotenv::from_filename(".env").expect("cannot load env from a file");
  }

  tracing_subscriber::fmt::init();

  let system = System::new();

  let execution = async {
    if let Err(error) = run_checkout().await {
      error!("Checkout failed: {:?}", error);
    }

    System::current().stop();
  };

  let arbiter = Arbiter::new();
  arbiter.spawn(execution);
  system.run().expect("Could not run the actix-rt system");
}
