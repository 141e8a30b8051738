use chrono::{DateTime, Utc};
use eyre::{Report, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
  Sale,
  Rental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
  Pickup,
  Delivery,
  Shipping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalPeriod {
  pub start: DateTime<Utc>,
  pub end: DateTime<Utc>,
}

/// The immutable input of one orchestration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
  listing_id: String,
  seller_id: String,
  transaction_type: TransactionType,
  rental_period: Option<RentalPeriod>,
  delivery_method: DeliveryMethod,
  include_insurance: Option<bool>,
}

impl CheckoutRequest {
  pub fn sale(
    listing_id: impl Into<String>,
    seller_id: impl Into<String>,
    delivery_method: DeliveryMethod,
  ) -> Self {
    Self {
      listing_id: listing_id.into(),
      seller_id: seller_id.into(),
      transaction_type: TransactionType::Sale,
      rental_period: None,
      delivery_method,
      include_insurance: None,
    }
  }

  pub fn rental(
    listing_id: impl Into<String>,
    seller_id: impl Into<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    delivery_method: DeliveryMethod,
  ) -> Result<Self> {
    if end < start {
      return Err(Report::msg("Rental period ends before it starts"))
    }

    Ok(Self {
      listing_id: listing_id.into(),
      seller_id: seller_id.into(),
      transaction_type: TransactionType::Rental,
      rental_period: Some(RentalPeriod {start, end}),
      delivery_method,
      include_insurance: None,
    })
  }

  pub fn with_insurance(self, include_insurance: bool) -> Self {
    Self {
      include_insurance: Some(include_insurance),
      ..self
    }
  }

  pub fn listing_id(&self) -> &str {
    &self.listing_id
  }

  pub fn seller_id(&self) -> &str {
    &self.seller_id
  }

  pub fn transaction_type(&self) -> TransactionType {
    self.transaction_type
  }

  pub fn rental_period(&self) -> Option<RentalPeriod> {
    self.rental_period
  }

  pub fn delivery_method(&self) -> DeliveryMethod {
    self.delivery_method
  }

  pub fn include_insurance(&self) -> Option<bool> {
    self.include_insurance
  }
}
