use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;
use url::Url;
use crate::models::{
  checkout_error::CheckoutError,
  checkout_request::{CheckoutRequest, DeliveryMethod, TransactionType},
  checkout_session::SessionStatus,
};
use super::error_classifier::{
  classify_decoding,
  classify_presentation_url,
  classify_response,
  classify_transport,
};

/// Raw create-session response; the URL is validated by the session creator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
  pub session_id: String,
  pub url: String,
}

#[async_trait]
pub trait CheckoutBackend: Send + Sync {
  async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CreatedSession, CheckoutError>;

  async fn check_checkout_status(&self, session_id: &str) -> Result<SessionStatus, CheckoutError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateCheckoutPayload<'a> {
  listing_id: &'a str,
  seller_id: &'a str,
  transaction_type: TransactionType,
  #[serde(skip_serializing_if = "Option::is_none")]
  rental_start_date: Option<DateTime<Utc>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  rental_end_date: Option<DateTime<Utc>>,
  delivery_method: DeliveryMethod,
  #[serde(skip_serializing_if = "Option::is_none")]
  include_insurance: Option<bool>,
}

impl<'a> From<&'a CheckoutRequest> for CreateCheckoutPayload<'a> {
  fn from(request: &'a CheckoutRequest) -> Self {
    let period = request.rental_period();

    Self {
      listing_id: request.listing_id(),
      seller_id: request.seller_id(),
      transaction_type: request.transaction_type(),
      rental_start_date: period.map(|period| period.start),
      rental_end_date: period.map(|period| period.end),
      delivery_method: request.delivery_method(),
      include_insurance: request.include_insurance(),
    }
  }
}

pub struct HttpCheckoutBackend {
  client: Client,
  base_url: Url,
  api_token: Option<String>,
}

impl HttpCheckoutBackend {
  pub fn new(base_url: Url, api_token: Option<String>, timeout: Duration) -> Result<Self, CheckoutError> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|error| classify_transport(&error))?;

    Ok(Self {
      client,
      base_url,
      api_token,
    })
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url, CheckoutError> {
    let mut url = self.base_url.clone();
    url.path_segments_mut()
      .map_err(|_| CheckoutError::InvalidURL)?
      .pop_if_empty()
      .extend(segments);

    Ok(url)
  }

  fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
    match &self.api_token {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    }
  }

  async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CheckoutError> {
    let status = response.status();
    let body = response.text().await.map_err(|error| classify_transport(&error))?;

    if !status.is_success() {
      return Err(classify_response(status, &body))
    }

    serde_json::from_str(&body).map_err(|error| classify_decoding(&error))
  }
}

#[async_trait]
impl CheckoutBackend for HttpCheckoutBackend {
  async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CreatedSession, CheckoutError> {
    let url = self.endpoint(&["api", "payments", "create-checkout-session"])?;
    debug!("Creating checkout session for listing {} at {}", request.listing_id(), url);

    let response = self.authorize(self.client.post(url))
      .json(&CreateCheckoutPayload::from(request))
      .send()
      .await
      .map_err(|error| classify_transport(&error))?;

    Self::decode(response).await
  }

  async fn check_checkout_status(&self, session_id: &str) -> Result<SessionStatus, CheckoutError> {
    let url = self.endpoint(&["api", "payments", "checkout-session", session_id, "status"])?;
    debug!("Checking status of checkout session {}", session_id);

    let response = self.authorize(self.client.get(url))
      .send()
      .await
      .map_err(|error| classify_transport(&error))?;

    Self::decode(response).await
  }
}

pub fn parse_presentation_url(raw: &str) -> Result<Url, CheckoutError> {
  let url = Url::parse(raw).map_err(classify_presentation_url)?;

  match url.scheme() {
    "http" | "https" => Ok(url),
    _ => Err(CheckoutError::InvalidURL),
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration as ChronoDuration, TimeZone};
  use mockito::{Matcher, Server};
  use serde_json::json;
  use crate::models::checkout_session::Status;
  use super::*;

  fn backend(server: &Server, token: Option<&str>) -> HttpCheckoutBackend {
    HttpCheckoutBackend::new(
      Url::parse(&server.url()).unwrap(),
      token.map(str::to_string),
      Duration::from_secs(5),
    ).unwrap()
  }

  #[tokio::test]
  async fn create_posts_request_payload() {
    let mut server = Server::new_async().await;
    let start = Utc.with_ymd_and_hms(2025, 7, 1, 10, 0, 0).unwrap();
    let end = start + ChronoDuration::days(2);
    let mock = server.mock("POST", "/api/payments/create-checkout-session")
      .match_header("authorization", "Bearer secret")
      .match_body(Matcher::Json(json!({
        "listingId": "listing-1",
        "sellerId": "seller-1",
        "transactionType": "RENTAL",
        "rentalStartDate": "2025-07-01T10:00:00Z",
        "rentalEndDate": "2025-07-03T10:00:00Z",
        "deliveryMethod": "PICKUP",
        "includeInsurance": true,
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(r#"{"sessionId":"cs_123","url":"https://pay.example/cs_123"}"#)
      .create_async()
      .await;

    let request = CheckoutRequest::rental("listing-1", "seller-1", start, end, DeliveryMethod::Pickup)
      .unwrap()
      .with_insurance(true);
    let created = backend(&server, Some("secret")).create_checkout_session(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(created, CreatedSession {
      session_id: "cs_123".to_string(),
      url: "https://pay.example/cs_123".to_string(),
    });
  }

  #[tokio::test]
  async fn status_decodes_complete_with_transaction() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/api/payments/checkout-session/cs_123/status")
      .with_status(200)
      .with_body(r#"{"sessionStatus":"complete","transactionId":"txn_1"}"#)
      .create_async()
      .await;

    let status = backend(&server, None).check_checkout_status("cs_123").await.unwrap();

    assert_eq!(status.status, Status::Complete);
    assert_eq!(status.transaction_id.as_deref(), Some("txn_1"));
  }

  #[tokio::test]
  async fn status_accepts_requires_action_without_transaction() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/api/payments/checkout-session/cs_1/status")
      .with_status(200)
      .with_body(r#"{"sessionStatus":"requiresAction"}"#)
      .create_async()
      .await;

    let status = backend(&server, None).check_checkout_status("cs_1").await.unwrap();

    assert_eq!(status.status, Status::RequiresAction);
    assert_eq!(status.transaction_id, None);
  }

  #[tokio::test]
  async fn unauthorized_response_is_classified() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/api/payments/checkout-session/cs_1/status")
      .with_status(401)
      .create_async()
      .await;

    let error = backend(&server, None).check_checkout_status("cs_1").await.unwrap_err();

    assert_eq!(error, CheckoutError::Unauthorized);
  }

  #[tokio::test]
  async fn unknown_status_is_decoding_error() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/api/payments/checkout-session/cs_1/status")
      .with_status(200)
      .with_body(r#"{"sessionStatus":"bogus"}"#)
      .create_async()
      .await;

    let error = backend(&server, None).check_checkout_status("cs_1").await.unwrap_err();

    assert!(matches!(error, CheckoutError::DecodingError(_)));
  }

  #[tokio::test]
  async fn unreachable_backend_is_network_error() {
    let backend = HttpCheckoutBackend::new(
      Url::parse("http://127.0.0.1:9").unwrap(),
      None,
      Duration::from_secs(1),
    ).unwrap();
    let request = CheckoutRequest::sale("listing-1", "seller-1", DeliveryMethod::Shipping);

    let error = backend.create_checkout_session(&request).await.unwrap_err();

    assert!(matches!(error, CheckoutError::NetworkError(_)));
  }

  #[test]
  fn presentation_url_must_be_web_url() {
    assert!(parse_presentation_url("https://pay.example/cs_123").is_ok());
    assert_eq!(parse_presentation_url("::nope"), Err(CheckoutError::InvalidURL));
    assert_eq!(parse_presentation_url("javascript:alert(1)"), Err(CheckoutError::InvalidURL));
  }
}
