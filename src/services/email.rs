//! Email service for loan notifications

use chrono::{DateTime, Utc};
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

#[derive(Clone)]
pub struct EmailService {
    config: EmailConfig,
}

impl EmailService {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Send a due-date reminder for an active loan.
    pub async fn send_due_reminder(
        &self,
        to: &str,
        user_name: &str,
        book_title: &str,
        due_date: DateTime<Utc>,
    ) -> AppResult<()> {
        let subject = format!("Reminder: \"{}\" is due on {}", book_title, due_date.format("%Y-%m-%d"));
        let body = format!(
            r#"
Dear {name},

This is a reminder that the book "{title}" you borrowed from the university
library is due on {due}.

Please return or renew it before the due date to avoid late penalties.

The Library Team
"#,
            name = user_name,
            title = book_title,
            due = due_date.format("%Y-%m-%d"),
        );

        self.send_email(to, &subject, &body).await
    }

    /// Generic email sending function
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self
            .config
            .smtp_from_name
            .as_deref()
            .unwrap_or("Maktaba Library");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        };

        let mailer_builder = mailer_builder.port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) = (
            self.config.smtp_username.clone(),
            self.config.smtp_password.clone(),
        ) {
            mailer_builder
                .credentials(Credentials::new(username, password))
                .build()
        } else {
            mailer_builder.build()
        };

        let to_owned = to.to_string();
        tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email to {}: {}", to_owned, e)))?;

        Ok(())
    }
}
