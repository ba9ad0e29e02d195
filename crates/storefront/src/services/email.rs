//! Email service for verification codes, password resets and order receipts.
//!
//! Delivers through a hosted email API (Resend-compatible `POST /emails`)
//! with Askama HTML and plain text templates. Without an API key the service
//! runs disabled: messages are logged and dropped.

use askama::Template;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;

use hearth_core::{CurrencyCode, Email, Price};

use crate::config::EmailConfig;
use crate::models::OrderDetail;

/// HTML template for verification code email.
#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeEmailHtml<'a> {
    code: &'a str,
}

/// Plain text template for verification code email.
#[derive(Template)]
#[template(path = "email/verification_code.txt")]
struct VerificationCodeEmailText<'a> {
    code: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetEmailHtml<'a> {
    code: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetEmailText<'a> {
    code: &'a str,
}

/// Pre-formatted order line for receipt templates.
struct ReceiptLine {
    name: String,
    quantity: i32,
    subtotal: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationEmailHtml<'a> {
    order_id: i32,
    lines: &'a [ReceiptLine],
    total: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationEmailText<'a> {
    order_id: i32,
    lines: &'a [ReceiptLine],
    total: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    client: reqwest::Client,
    config: Option<EmailConfig>,
}

impl EmailService {
    /// Create an email service. `None` disables delivery.
    #[must_use]
    pub fn new(client: reqwest::Client, config: Option<EmailConfig>) -> Self {
        if config.is_none() {
            tracing::warn!("EMAIL_API_KEY not set, outgoing email will be logged and dropped");
        }
        Self { client, config }
    }

    /// Send an email verification code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_verification_code(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        let html = VerificationCodeEmailHtml { code }.render()?;
        let text = VerificationCodeEmailText { code }.render()?;

        self.send(to, "Your Hearth Market verification code", &text, &html)
            .await
    }

    /// Send a password reset code.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_password_reset(&self, to: &Email, code: &str) -> Result<(), EmailError> {
        let html = PasswordResetEmailHtml { code }.render()?;
        let text = PasswordResetEmailText { code }.render()?;

        self.send(to, "Reset your Hearth Market password", &text, &html)
            .await
    }

    /// Send a receipt for a paid order.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &Email,
        order: &OrderDetail,
        currency: CurrencyCode,
    ) -> Result<(), EmailError> {
        let lines: Vec<ReceiptLine> = order
            .items
            .iter()
            .map(|item| ReceiptLine {
                name: item.product_name.clone(),
                quantity: item.quantity,
                subtotal: Price::new(item.subtotal(), currency).to_string(),
            })
            .collect();
        let total = Price::new(order.order.total, currency).to_string();
        let order_id = order.order.id.as_i32();

        let html = OrderConfirmationEmailHtml {
            order_id,
            lines: &lines,
            total: &total,
        }
        .render()?;
        let text = OrderConfirmationEmailText {
            order_id,
            lines: &lines,
            total: &total,
        }
        .render()?;

        let subject = format!("Hearth Market order #{order_id} confirmed");
        self.send(to, &subject, &text, &html).await
    }

    async fn send(
        &self,
        to: &Email,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let Some(config) = &self.config else {
            tracing::info!(to = %to, subject = %subject, "Email delivery disabled, dropping message");
            return Ok(());
        };

        let response = self
            .client
            .post(format!("{}/emails", config.api_base))
            .bearer_auth(config.api_key.expose_secret())
            .json(&SendEmailRequest {
                from: &config.from_address,
                to: [to.as_str()],
                subject,
                html: html_body,
                text: text_body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}
