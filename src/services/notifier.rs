// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Booking confirmation emails.
//!
//! Dispatch is best-effort: callers log failures and carry on.

use crate::config::SmtpConfig;
use crate::error::AppError;
use crate::models::Booking;
use async_trait::async_trait;
use chrono::Locale;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

/// Sends a confirmation once a booking is stored.
#[async_trait]
pub trait BookingNotifier: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking, recipient: &str) -> Result<(), AppError>;
}

/// Rendered confirmation email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationEmail {
    pub subject: String,
    pub html: String,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Long French date, e.g. `lundi 3 juin 2030`.
pub fn french_long_date(date: chrono::NaiveDate) -> String {
    date.format_localized("%A %-d %B %Y", Locale::fr_FR).to_string()
}

/// Render the confirmation for `booking`.
pub fn render_confirmation(booking: &Booking, studio_name: &str, app_url: &str) -> ConfirmationEmail {
    let studio = escape_html(studio_name);
    let date = french_long_date(booking.date);
    let time = if booking.end_time != booking.start_time {
        format!("{} - {}", booking.start_time, booking.end_time)
    } else {
        booking.start_time.to_string()
    };
    let notes = booking
        .notes
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .map(|n| format!("<p><strong>Notes :</strong> {}</p>", escape_html(n)))
        .unwrap_or_default();
    let link = format!(
        "{}/booking/{}",
        app_url.trim_end_matches('/'),
        escape_html(&booking.id)
    );

    let html = format!(
        r#"
<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <div style="background: linear-gradient(to right, #7e22ce, #ec4899); padding: 20px; text-align: center;">
        <h1 style="color: white; margin: 0;">{studio}</h1>
    </div>
    <div style="padding: 20px; background-color: #1f1f1f; color: white;">
        <h2 style="color: #ec4899;">Réservation confirmée !</h2>
        <div style="background-color: #2d2d2d; padding: 20px; border-radius: 8px; margin: 20px 0;">
            <h3 style="color: #7e22ce; margin-top: 0;">Détails de votre session</h3>
            <p><strong>Date :</strong> {date}</p>
            <p><strong>Heure :</strong> {time}</p>
            <p><strong>Type de session :</strong> {session_type}</p>
            {notes}
        </div>
        <div style="background-color: #2d2d2d; padding: 20px; border-radius: 8px;">
            <h3 style="color: #7e22ce; margin-top: 0;">Informations importantes</h3>
            <ul style="padding-left: 20px;">
                <li>Arrivez 10 minutes avant votre session</li>
                <li>Apportez votre matériel si nécessaire</li>
                <li>En cas d'empêchement, prévenez-nous 24h à l'avance</li>
            </ul>
        </div>
        <div style="text-align: center; margin-top: 30px;">
            <a href="{link}"
               style="background-color: #7e22ce; color: white; padding: 12px 24px; text-decoration: none; border-radius: 4px;">
                Voir les détails de la réservation
            </a>
        </div>
    </div>
    <div style="background-color: #2d2d2d; padding: 20px; text-align: center; color: #666;">
        <p>{studio} - Votre studio d'enregistrement professionnel</p>
        <p style="font-size: 12px;">Cet email a été envoyé automatiquement, merci de ne pas y répondre.</p>
    </div>
</div>
"#,
        session_type = booking.session_type,
    );

    ConfirmationEmail {
        subject: format!("Confirmation de votre réservation - {}", studio_name),
        html,
    }
}

/// SMTP notifier using Lettre.
#[derive(Clone)]
pub struct MailNotifier {
    smtp_server: String,
    smtp_port: u16,
    credentials: Credentials,
    from: String,
    studio_name: String,
    app_url: String,
}

impl MailNotifier {
    pub fn new(smtp: &SmtpConfig, studio_name: &str, app_url: &str) -> Self {
        Self {
            smtp_server: smtp.server.clone(),
            smtp_port: smtp.port,
            credentials: Credentials::new(smtp.username.clone(), smtp.password.clone()),
            from: smtp.from.clone(),
            studio_name: studio_name.to_string(),
            app_url: app_url.to_string(),
        }
    }

    /// A new transport per email; confirmations are rare.
    fn build_transport(&self) -> Result<SmtpTransport, AppError> {
        Ok(SmtpTransport::relay(&self.smtp_server)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("SMTP relay error: {e}")))?
            .port(self.smtp_port)
            .credentials(self.credentials.clone())
            .build())
    }
}

#[async_trait]
impl BookingNotifier for MailNotifier {
    async fn booking_confirmed(&self, booking: &Booking, recipient: &str) -> Result<(), AppError> {
        let rendered = render_confirmation(booking, &self.studio_name, &self.app_url);

        let email = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid from address: {e}")))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| AppError::BadRequest(format!("Invalid recipient address: {e}")))?)
            .subject(rendered.subject)
            .header(ContentType::TEXT_HTML)
            .body(rendered.html)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build email: {e}")))?;

        let mailer = self.build_transport()?;

        tokio::task::spawn_blocking(move || {
            mailer
                .send(&email)
                .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to send email: {e}")))
        })
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Email task failed: {e}")))??;

        tracing::info!(booking_id = %booking.id, "Booking confirmation sent");
        Ok(())
    }
}

/// Used when SMTP is not configured.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl BookingNotifier for NoopNotifier {
    async fn booking_confirmed(&self, booking: &Booking, _recipient: &str) -> Result<(), AppError> {
        tracing::debug!(
            booking_id = %booking.id,
            "SMTP not configured, skipping booking confirmation"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingStatus, SessionType};
    use chrono::{NaiveDate, Utc};

    fn booking(notes: Option<&str>) -> Booking {
        Booking {
            id: "abc123".to_string(),
            date: NaiveDate::from_ymd_opt(2030, 6, 3).unwrap(),
            start_time: "14:00".parse().unwrap(),
            end_time: "14:00".parse().unwrap(),
            user_id: "u1".to_string(),
            user_name: "u1@example.com".to_string(),
            status: BookingStatus::Pending,
            session_type: SessionType::Mixing,
            notes: notes.map(str::to_string),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn formats_french_date() {
        let date = NaiveDate::from_ymd_opt(2030, 6, 3).unwrap();
        assert_eq!(french_long_date(date), "lundi 3 juin 2030");
    }

    #[test]
    fn renders_booking_details_and_link() {
        let email = render_confirmation(&booking(None), "43ART Studio", "https://app.test/");
        assert_eq!(email.subject, "Confirmation de votre réservation - 43ART Studio");
        assert!(email.html.contains("lundi 3 juin 2030"));
        assert!(email.html.contains("14:00"));
        assert!(email.html.contains("mixing"));
        assert!(email.html.contains("https://app.test/booking/abc123"));
        assert!(!email.html.contains("Notes :"));
    }

    #[test]
    fn escapes_notes() {
        let email = render_confirmation(
            &booking(Some("<script>alert(1)</script> & co")),
            "43ART Studio",
            "https://app.test",
        );
        assert!(email.html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
        assert!(!email.html.contains("<script>"));
    }

    #[test]
    fn range_bookings_show_both_times() {
        let mut b = booking(None);
        b.end_time = "15:00".parse().unwrap();
        let email = render_confirmation(&b, "43ART Studio", "https://app.test");
        assert!(email.html.contains("14:00 - 15:00"));
    }
}
