use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{NaiveDate, Weekday};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::info;

use crate::utils::time::{date_to_row_key, weekday_name};

use super::Mailer;

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Mail delivery through an HTTP mail API: one json message with the chart attached inline as
/// base64.
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    sender: String,
    recipient: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, token: &str, sender: &str, recipient: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("mail token is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .default_headers(headers)
            .build()
            .context("failed to build mail client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, date: NaiveDate, day: Weekday, artifact: &Path) -> Result<()> {
        let bytes = tokio::fs::read(artifact)
            .await
            .with_context(|| format!("failed to read attachment {artifact:?}"))?;

        let filename = artifact
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "report.svg".to_string());

        let payload = message_payload(
            &self.sender,
            &self.recipient,
            date,
            day,
            &filename,
            &BASE64.encode(&bytes),
        );

        self.client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("mail request failed")?
            .error_for_status()
            .context("mail request was rejected")?;

        info!("Report for {date} mailed to {}", self.recipient);
        Ok(())
    }
}

fn message_payload(
    sender: &str,
    recipient: &str,
    date: NaiveDate,
    day: Weekday,
    filename: &str,
    content: &str,
) -> serde_json::Value {
    serde_json::json!({
        "from": sender,
        "to": recipient,
        "subject": format!("Daily Report | {}", date_to_row_key(date)),
        "body": body_text(date, day),
        "attachments": [{
            "filename": filename,
            "content": content,
        }],
    })
}

fn body_text(date: NaiveDate, day: Weekday) -> String {
    format!(
        "Hello,\n\n\
         This is your automated daily report.\n\n\
         Date: {}, {}\n\n\
         Regards,\n\
         daytally\n",
        date_to_row_key(date),
        weekday_name(day),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_and_body_name_the_data_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let payload = message_payload("me@example.com", "you@example.com", date, Weekday::Sun, "2024-01-07.svg", "aGk=");

        assert_eq!(payload["subject"], "Daily Report | 2024-01-07");
        let body = payload["body"].as_str().unwrap();
        assert!(body.contains("2024-01-07, Sunday"));
        assert_eq!(payload["attachments"][0]["filename"], "2024-01-07.svg");
        assert_eq!(payload["attachments"][0]["content"], "aGk=");
    }
}
