use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::json;
use tracing::debug;

use crate::error::JobError;
use crate::utils::time::{weekday_abbrev, weekday_name, WEEK};

use super::decode::{decode_record, QueryPage, WEEK_START_PROP};
use super::{RecordSource, ResetPatch, TimeBlockRecord};

/// Wire-format version the record store expects on every call.
const API_VERSION_HEADER: &str = "Notion-Version";
const API_VERSION: &str = "2022-06-28";

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Record store client over its HTTP API. Queries are paginated; the continuation cursor is
/// followed until the store reports no more pages.
pub struct HttpRecordSource {
    client: reqwest::Client,
    base_url: String,
    database_id: String,
}

impl HttpRecordSource {
    pub fn new(base_url: &str, token: &str, database_id: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("record store token is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .default_headers(headers)
            .build()
            .context("failed to build record store client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            database_id: database_id.to_string(),
        })
    }

    async fn query_page(&self, cursor: Option<&str>) -> Result<QueryPage> {
        let url = format!("{}/databases/{}/query", self.base_url, self.database_id);
        let body = match cursor {
            Some(cursor) => json!({ "start_cursor": cursor }),
            None => json!({}),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("record store query request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(JobError::SourceFetch(format!("query returned {status}: {detail}")).into());
        }

        response
            .json::<QueryPage>()
            .await
            .context("record store query response was not valid json")
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch_all(&self) -> Result<Vec<TimeBlockRecord>> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = self.query_page(cursor.as_deref()).await?;

            let Some(results) = page.results else {
                return Err(JobError::SourceFetch("query response missing results".into()).into());
            };

            for raw in results {
                records.push(decode_record(raw)?);
            }

            if !page.has_more {
                break;
            }
            cursor = page.next_cursor;
        }

        debug!("Fetched {} records", records.len());
        Ok(records)
    }

    async fn patch_record(&self, id: &str, patch: &ResetPatch) -> Result<()> {
        let url = format!("{}/pages/{}", self.base_url, id);

        let response = self
            .client
            .patch(&url)
            .json(&json!({ "properties": reset_properties(patch) }))
            .send()
            .await
            .with_context(|| format!("patch request for record {id} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("patch of record {id} returned {status}: {detail}");
        }

        Ok(())
    }
}

/// Property payload of a reset patch: every worked marker off, every category unset, and the
/// shared week start moved forward.
fn reset_properties(patch: &ResetPatch) -> serde_json::Value {
    let mut properties = serde_json::Map::new();
    properties.insert(
        WEEK_START_PROP.to_string(),
        json!({ "date": { "start": patch.week_start.format("%Y-%m-%d").to_string() } }),
    );
    for day in WEEK {
        properties.insert(weekday_abbrev(day).to_string(), json!({ "checkbox": false }));
        properties.insert(weekday_name(day).to_string(), json!({ "select": null }));
    }
    serde_json::Value::Object(properties)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn reset_payload_touches_every_day_field() {
        let patch = ResetPatch {
            week_start: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        };
        let properties = reset_properties(&patch);

        assert_eq!(
            properties[WEEK_START_PROP]["date"]["start"],
            serde_json::json!("2024-01-08")
        );
        for day in WEEK {
            assert_eq!(
                properties[weekday_abbrev(day)]["checkbox"],
                serde_json::json!(false)
            );
            assert_eq!(
                properties[weekday_name(day)]["select"],
                serde_json::Value::Null
            );
        }
        // week start + checkbox and select per day
        assert_eq!(properties.as_object().unwrap().len(), 15);
    }
}
