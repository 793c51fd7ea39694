//! Emails the credential to attendees, one at a time, and keeps the sent
//! marker honest: it is set only after the SMTP server accepted the
//! message.

use std::path::{Path, PathBuf};
use std::time::Duration;

use handlebars::Handlebars;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::issuer;
use crate::store;
use crate::utils::error::AppError;

/// Pause between sends in the batch path, to stay inside the mail
/// provider's rate limit.
const SEND_PAUSE: Duration = Duration::from_secs(5);

pub const CREDENTIAL_EMAIL_TEMPLATE_NAME: &str = "credential_email";

const CREDENTIAL_EMAIL_TEMPLATE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Your event entry pass</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Your event entry pass</h2>
        <p>Hello {{first_name}},</p>
        <p>
            Your entry pass is attached. Please have it ready on your phone or
            printed out; it will be scanned at the gate to bring up your
            registration.
        </p>
        <p>
            Your booking reference is <strong>{{reference_code}}</strong>.
            Quote it if you have any trouble at the gate.
        </p>
        <p style="color: #666; font-size: 14px;">
            The same pass covers entry, food collection, and parking.
        </p>
    </div>
</body>
</html>
"#;

/// Register the email templates on a fresh handlebars registry. Named
/// placeholders only; nothing in an attendee's data can collide with them.
pub fn register_templates(registry: &mut Handlebars) -> Result<(), AppError> {
    registry
        .register_template_string(CREDENTIAL_EMAIL_TEMPLATE_NAME, CREDENTIAL_EMAIL_TEMPLATE)
        .map_err(|e| AppError::InternalServerError(format!("Template registration failed: {e}")))
}

/// Human-quotable reference derived from the attendee id.
pub fn reference_code(id: i64) -> String {
    format!("REG-{id:06}")
}

/// SMTP sender. A fresh transport is built per send to avoid connection
/// pooling issues; the blocking send runs on the blocking thread pool.
#[derive(Clone)]
pub struct Mailer {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from_email: String,
    from_name: String,
}

impl Mailer {
    pub fn new(
        smtp_server: String,
        smtp_port: u16,
        smtp_username: String,
        smtp_password: String,
        from_email: String,
        from_name: String,
    ) -> Self {
        Self {
            smtp_server,
            smtp_port,
            credentials: Credentials::new(smtp_username, smtp_password),
            from_email,
            from_name,
        }
    }

    fn build_transport(&self) -> Result<SmtpTransport, AppError> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| AppError::DeliveryFailed(format!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }

    fn from_header(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_email)
    }

    /// Send one HTML message with a PNG attachment. Resolves only once the
    /// SMTP server has accepted the message.
    async fn send_with_attachment(
        &self,
        to: &str,
        subject: &str,
        html_body: String,
        attachment_name: String,
        png: Vec<u8>,
    ) -> Result<(), AppError> {
        let content_type = ContentType::parse("image/png")
            .map_err(|e| AppError::InternalServerError(format!("Bad attachment type: {e}")))?;

        let email = Message::builder()
            .from(
                self.from_header()
                    .parse()
                    .map_err(|e| AppError::DeliveryFailed(format!("Invalid from address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| AppError::DeliveryFailed(format!("Invalid to address: {e}")))?)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::html(html_body))
                    .singlepart(Attachment::new(attachment_name).body(png, content_type)),
            )
            .map_err(|e| AppError::DeliveryFailed(format!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AppError::DeliveryFailed(format!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| AppError::InternalServerError(format!("Email task failed: {e}")))??;

        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct DispatchFailure {
    pub attendee_id: i64,
    pub reason: String,
}

#[derive(Debug, Default, Serialize)]
pub struct DispatchSummary {
    pub sent: u32,
    pub failed: Vec<DispatchFailure>,
}

fn artifact_path(artifact_dir: &Path, id: i64) -> PathBuf {
    artifact_dir.join(format!("{id}.png"))
}

/// Email the credential to one attendee.
///
/// Issues a credential first if none exists. The PNG is written under the
/// artifact directory for the duration of the send and removed once
/// delivery is confirmed; removal failure is logged, never fatal. On
/// delivery failure the sent marker stays false and the error goes back to
/// the caller; there is no automatic retry.
pub async fn send_one(
    pool: &PgPool,
    mailer: &Mailer,
    templates: &Handlebars<'static>,
    artifact_dir: &Path,
    id: i64,
) -> Result<(), AppError> {
    let details = store::get_attendee(pool, id).await?;
    let credential = issuer::issue(pool, id).await?;

    let png = issuer::render_png(&credential.payload())?;
    let path = artifact_path(artifact_dir, id);
    tokio::fs::write(&path, &png)
        .await
        .map_err(|e| AppError::InternalServerError(format!("Failed to write artifact: {e}")))?;

    let body = templates
        .render(
            CREDENTIAL_EMAIL_TEMPLATE_NAME,
            &json!({
                "first_name": details.attendee.first_name,
                "reference_code": reference_code(id),
            }),
        )
        .map_err(|e| AppError::InternalServerError(format!("Template render failed: {e}")))?;

    mailer
        .send_with_attachment(
            &details.attendee.email_address,
            "Your event entry pass",
            body,
            format!("{id}-pass.png"),
            png,
        )
        .await?;

    store::mark_credential_sent(pool, id).await?;

    if let Err(e) = tokio::fs::remove_file(&path).await {
        warn!(attendee_id = id, error = %e, "Failed to remove credential artifact");
    }

    info!(attendee_id = id, "Credential emailed");

    Ok(())
}

/// Email every attendee still owed a credential, one by one with a fixed
/// pause between sends. A failed attendee is recorded and the loop keeps
/// going; already-sent attendees are never targeted, so re-running after a
/// crash or partial failure picks up exactly where things stopped.
pub async fn send_all_pending(
    pool: &PgPool,
    mailer: &Mailer,
    templates: &Handlebars<'static>,
    artifact_dir: &Path,
) -> Result<DispatchSummary, AppError> {
    let ids = store::pending_dispatch_ids(pool).await?;
    let mut summary = DispatchSummary::default();

    for (i, id) in ids.iter().copied().enumerate() {
        if i > 0 {
            tokio::time::sleep(SEND_PAUSE).await;
        }

        match send_one(pool, mailer, templates, artifact_dir, id).await {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                warn!(attendee_id = id, error = %e, "Dispatch failed in batch");
                summary.failed.push(DispatchFailure {
                    attendee_id: id,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_code_is_zero_padded() {
        assert_eq!(reference_code(7), "REG-000007");
        assert_eq!(reference_code(123456), "REG-123456");
        assert_eq!(reference_code(1234567), "REG-1234567");
    }

    #[test]
    fn email_body_substitutes_named_placeholders() {
        let mut registry = Handlebars::new();
        register_templates(&mut registry).unwrap();

        let body = registry
            .render(
                CREDENTIAL_EMAIL_TEMPLATE_NAME,
                &json!({ "first_name": "Asha", "reference_code": "REG-000042" }),
            )
            .unwrap();

        assert!(body.contains("Hello Asha,"));
        assert!(body.contains("REG-000042"));
        assert!(!body.contains("{{"));
    }

    #[test]
    fn artifact_path_is_scoped_to_the_attendee() {
        let path = artifact_path(Path::new("/tmp/passes"), 9);
        assert_eq!(path, PathBuf::from("/tmp/passes/9.png"));
    }
}
