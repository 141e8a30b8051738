use super::checkout_error::CheckoutError;

/// The single final result of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Success(String),
  Cancelled,
  Failed(CheckoutError),
}
