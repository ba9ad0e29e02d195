//! Stripe API client for PaymentIntents.
//!
//! Only the two calls checkout needs: create and retrieve. Requests are
//! form-encoded with bearer auth; creation carries an idempotency key derived
//! from the order so a retried checkout reuses the same intent.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hearth_core::OrderId;

use crate::config::StripeConfig;

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Payment intent id is not well formed.
    #[error("invalid payment intent id")]
    InvalidId,
}

/// Lifecycle state of a PaymentIntent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// The subset of the PaymentIntent object the storefront reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntent {
    /// Order id recorded in the intent metadata at creation.
    #[must_use]
    pub fn order_id(&self) -> Option<OrderId> {
        self.metadata.get("order_id")?.parse().ok()
    }
}

/// Parameters for a new PaymentIntent.
#[derive(Debug, Clone)]
pub struct NewPaymentIntent<'a> {
    pub order_id: OrderId,
    /// Amount in minor units.
    pub amount: i64,
    /// Lowercase ISO currency code.
    pub currency: &'a str,
    pub receipt_email: Option<&'a str>,
}

impl NewPaymentIntent<'_> {
    fn form(&self) -> Vec<(&'static str, String)> {
        let mut form = vec![
            ("amount", self.amount.to_string()),
            ("currency", self.currency.to_string()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[order_id]", self.order_id.to_string()),
        ];
        if let Some(email) = self.receipt_email {
            form.push(("receipt_email", email.to_string()));
        }
        form
    }

    fn idempotency_key(&self) -> String {
        format!("order-{}-{}-{}", self.order_id, self.amount, self.currency)
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
}

impl StripeClient {
    /// Create a new Stripe API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, StripeError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| StripeError::Parse(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
        })
    }

    /// Create a PaymentIntent for an order.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or the response can't be parsed.
    #[tracing::instrument(skip(self, params), fields(order_id = %params.order_id, amount = params.amount))]
    pub async fn create_payment_intent(
        &self,
        params: &NewPaymentIntent<'_>,
    ) -> Result<PaymentIntent, StripeError> {
        let response = self
            .client
            .post(format!("{}/payment_intents", self.api_base))
            .header("Idempotency-Key", params.idempotency_key())
            .form(&params.form())
            .send()
            .await?;

        parse_response(response).await
    }

    /// Retrieve a PaymentIntent by id.
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidId` for malformed ids, otherwise error if
    /// the API request fails or the response can't be parsed.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, StripeError> {
        if !is_valid_intent_id(id) {
            return Err(StripeError::InvalidId);
        }

        let response = self
            .client
            .get(format!("{}/payment_intents/{id}", self.api_base))
            .send()
            .await?;

        parse_response(response).await
    }
}

async fn parse_response(response: reqwest::Response) -> Result<PaymentIntent, StripeError> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| b.error.message)
            .unwrap_or(body);
        return Err(StripeError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| StripeError::Parse(e.to_string()))
}

/// PaymentIntent ids look like `pi_3MtwBwLkdIwHu7ix28a3tqPa`.
fn is_valid_intent_id(id: &str) -> bool {
    id.strip_prefix("pi_").is_some_and(|rest| {
        !rest.is_empty() && rest.len() <= 255 && rest.chars().all(|c| c.is_ascii_alphanumeric())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Form, Path, State};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use secrecy::SecretString;

    use super::*;

    const INTENT_JSON: &str = r#"{
        "id": "pi_3MtwBwLkdIwHu7ix28a3tqPa",
        "object": "payment_intent",
        "amount": 2599,
        "currency": "usd",
        "status": "requires_payment_method",
        "client_secret": "pi_3MtwBwLkdIwHu7ix28a3tqPa_secret_YrKJUKribcBjcG8HVhfZluoGH",
        "metadata": {"order_id": "42"},
        "livemode": false
    }"#;

    #[test]
    fn test_payment_intent_deserializes() {
        let intent: PaymentIntent = serde_json::from_str(INTENT_JSON).unwrap();
        assert_eq!(intent.amount, 2599);
        assert_eq!(intent.status, PaymentIntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.order_id(), Some(OrderId::new(42)));
        assert!(intent.client_secret.is_some());
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let json = INTENT_JSON.replace("requires_payment_method", "some_future_state");
        let intent: PaymentIntent = serde_json::from_str(&json).unwrap();
        assert_eq!(intent.status, PaymentIntentStatus::Unknown);
    }

    #[test]
    fn test_intent_id_validation() {
        assert!(is_valid_intent_id("pi_3MtwBwLkdIwHu7ix28a3tqPa"));
        assert!(!is_valid_intent_id("pi_"));
        assert!(!is_valid_intent_id("cus_123"));
        assert!(!is_valid_intent_id("pi_123/../../customers"));
    }

    #[test]
    fn test_form_carries_order_metadata() {
        let params = NewPaymentIntent {
            order_id: OrderId::new(7),
            amount: 1050,
            currency: "eur",
            receipt_email: Some("buyer@example.com"),
        };
        let form = params.form();
        assert!(form.contains(&("amount", "1050".to_string())));
        assert!(form.contains(&("currency", "eur".to_string())));
        assert!(form.contains(&("metadata[order_id]", "7".to_string())));
        assert!(form.contains(&("receipt_email", "buyer@example.com".to_string())));
        assert_eq!(params.idempotency_key(), "order-7-1050-eur");
    }

    #[derive(Default)]
    struct Seen {
        idempotency_key: Option<String>,
        authorization: Option<String>,
        form: HashMap<String, String>,
    }

    async fn stub_stripe() -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));

        let app = Router::new()
            .route(
                "/v1/payment_intents",
                post(
                    |State(seen): State<Arc<Mutex<Seen>>>,
                     headers: AxumHeaders,
                     Form(form): Form<HashMap<String, String>>| async move {
                        let mut seen = seen.lock().unwrap();
                        seen.idempotency_key = headers
                            .get("idempotency-key")
                            .map(|v| v.to_str().unwrap().to_string());
                        seen.authorization = headers
                            .get("authorization")
                            .map(|v| v.to_str().unwrap().to_string());
                        seen.form = form;
                        (StatusCode::OK, INTENT_JSON)
                    },
                ),
            )
            .route(
                "/v1/payment_intents/{id}",
                get(|Path(id): Path<String>| async move {
                    if id == "pi_missing" {
                        (
                            StatusCode::NOT_FOUND,
                            Json(serde_json::json!({
                                "error": {"message": "No such payment_intent: 'pi_missing'"}
                            })),
                        )
                    } else {
                        (
                            StatusCode::OK,
                            Json(serde_json::from_str(INTENT_JSON).unwrap()),
                        )
                    }
                }),
            )
            .with_state(Arc::clone(&seen));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{addr}/v1"), seen)
    }

    fn client(api_base: String) -> StripeClient {
        StripeClient::new(&StripeConfig {
            secret_key: SecretString::from("sk_test_4eC39HqLyjWDarjtT1zdp7dc"),
            api_base,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_sends_form_auth_and_idempotency_key() {
        let (base, seen) = stub_stripe().await;
        let stripe = client(base);

        let intent = stripe
            .create_payment_intent(&NewPaymentIntent {
                order_id: OrderId::new(42),
                amount: 2599,
                currency: "usd",
                receipt_email: None,
            })
            .await
            .unwrap();
        assert_eq!(intent.id, "pi_3MtwBwLkdIwHu7ix28a3tqPa");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.idempotency_key.as_deref(), Some("order-42-2599-usd"));
        assert_eq!(
            seen.authorization.as_deref(),
            Some("Bearer sk_test_4eC39HqLyjWDarjtT1zdp7dc")
        );
        assert_eq!(seen.form.get("amount").map(String::as_str), Some("2599"));
        assert_eq!(
            seen.form.get("metadata[order_id]").map(String::as_str),
            Some("42")
        );
    }

    #[tokio::test]
    async fn test_retrieve_maps_api_errors() {
        let (base, _) = stub_stripe().await;
        let stripe = client(base);

        let err = stripe
            .retrieve_payment_intent("pi_missing")
            .await
            .unwrap_err();
        match err {
            StripeError::Api { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("No such payment_intent"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let ok = stripe
            .retrieve_payment_intent("pi_3MtwBwLkdIwHu7ix28a3tqPa")
            .await
            .unwrap();
        assert_eq!(ok.amount, 2599);
    }

    #[tokio::test]
    async fn test_retrieve_rejects_malformed_id_without_request() {
        let stripe = client("http://127.0.0.1:9/v1".to_string());
        assert!(matches!(
            stripe.retrieve_payment_intent("../secrets").await,
            Err(StripeError::InvalidId)
        ));
    }
}
