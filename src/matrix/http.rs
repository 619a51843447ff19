use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{CellWrite, SheetBackend, SheetHandle, KEY_HEADER};

const CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Dimensions used when a missing sheet has to be created.
const CREATED_ROWS: u32 = 1000;
const CREATED_COLS: u32 = 30;

/// Sheet service client over its values API. Cells are addressed with A1 ranges scoped to the
/// sheet title.
pub struct HttpSheetBackend {
    client: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Option<Vec<Vec<serde_json::Value>>>,
}

impl HttpSheetBackend {
    pub fn new(base_url: &str, token: &str, spreadsheet_id: &str) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .context("sheet token is not a valid header value")?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(CALL_TIMEOUT)
            .default_headers(headers)
            .build()
            .context("failed to build sheet client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.to_string(),
        })
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/{}/values/{}",
            self.base_url,
            self.spreadsheet_id,
            escape_path(range)
        )
    }

    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        let response = self
            .client
            .get(self.values_url(range))
            .send()
            .await
            .with_context(|| format!("reading range {range} failed"))?
            .error_for_status()
            .with_context(|| format!("reading range {range} was rejected"))?;

        let body: ValueRange = response
            .json()
            .await
            .context("range response was not valid json")?;

        Ok(body
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }

    async fn write_range(&self, range: &str, rows: &[Vec<String>]) -> Result<()> {
        self.client
            .put(self.values_url(range))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": rows }))
            .send()
            .await
            .with_context(|| format!("writing range {range} failed"))?
            .error_for_status()
            .with_context(|| format!("writing range {range} was rejected"))?;
        Ok(())
    }
}

#[async_trait]
impl SheetBackend for HttpSheetBackend {
    async fn open_or_create(&self, title: &str) -> Result<SheetHandle> {
        let meta_url = format!("{}/{}", self.base_url, self.spreadsheet_id);
        let meta: SpreadsheetMeta = self
            .client
            .get(&meta_url)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await
            .context("reading spreadsheet metadata failed")?
            .error_for_status()
            .context("reading spreadsheet metadata was rejected")?
            .json()
            .await
            .context("spreadsheet metadata was not valid json")?;

        let handle = SheetHandle {
            title: title.to_string(),
        };

        if meta
            .sheets
            .iter()
            .any(|sheet| sheet.properties.title == title)
        {
            return Ok(handle);
        }

        debug!("Sheet {title:?} not found, creating it");
        self.client
            .post(format!("{meta_url}:batchUpdate"))
            .json(&json!({
                "requests": [{
                    "addSheet": {
                        "properties": {
                            "title": title,
                            "gridProperties": {
                                "rowCount": CREATED_ROWS,
                                "columnCount": CREATED_COLS,
                            },
                        },
                    },
                }],
            }))
            .send()
            .await
            .context("sheet creation failed")?
            .error_for_status()
            .context("sheet creation was rejected")?;

        self.append_row(&handle, &[KEY_HEADER.to_string()]).await?;
        Ok(handle)
    }

    async fn read_header_row(&self, sheet: &SheetHandle) -> Result<Vec<String>> {
        let rows = self.read_range(&format!("'{}'!1:1", sheet.title)).await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn write_header_row(&self, sheet: &SheetHandle, header: &[String]) -> Result<()> {
        self.write_range(&format!("'{}'!A1", sheet.title), &[header.to_vec()])
            .await
    }

    async fn read_key_column(&self, sheet: &SheetHandle) -> Result<Vec<String>> {
        let rows = self.read_range(&format!("'{}'!A:A", sheet.title)).await?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect())
    }

    async fn append_row(&self, sheet: &SheetHandle, values: &[String]) -> Result<()> {
        let range = format!("'{}'!A1", sheet.title);
        self.client
            .post(format!("{}:append", self.values_url(&range)))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [values] }))
            .send()
            .await
            .context("row append failed")?
            .error_for_status()
            .context("row append was rejected")?;
        Ok(())
    }

    async fn batch_write_cells(&self, sheet: &SheetHandle, writes: &[CellWrite]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let data: Vec<serde_json::Value> = writes
            .iter()
            .map(|write| {
                json!({
                    "range": format!("'{}'!{}", sheet.title, rowcol_to_a1(write.row, write.col)),
                    "values": [[write.value]],
                })
            })
            .collect();

        self.client
            .post(format!(
                "{}/{}/values:batchUpdate",
                self.base_url, self.spreadsheet_id
            ))
            .json(&json!({ "valueInputOption": "RAW", "data": data }))
            .send()
            .await
            .context("cell batch update failed")?
            .error_for_status()
            .context("cell batch update was rejected")?;
        Ok(())
    }
}

/// A1 notation for a 1-based (row, column) pair.
fn rowcol_to_a1(row: u32, col: u32) -> String {
    format!("{}{row}", col_to_letters(col))
}

fn col_to_letters(col: u32) -> String {
    let mut letters = Vec::new();
    let mut remaining = col;
    while remaining > 0 {
        remaining -= 1;
        letters.push(b'A' + (remaining % 26) as u8);
        remaining /= 26;
    }
    letters.reverse();
    String::from_utf8(letters).expect("letters are ascii")
}

/// Ranges land in the URL path, so the characters a sheet title can realistically contain get
/// percent-encoded by hand.
fn escape_path(range: &str) -> String {
    range.replace(' ', "%20").replace('\'', "%27")
}

/// Cells come back as json strings or numbers depending on the render mode.
fn cell_text(value: &serde_json::Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1_single_letter_columns() {
        assert_eq!(rowcol_to_a1(1, 1), "A1");
        assert_eq!(rowcol_to_a1(5, 2), "B5");
        assert_eq!(rowcol_to_a1(10, 26), "Z10");
    }

    #[test]
    fn a1_multi_letter_columns() {
        assert_eq!(rowcol_to_a1(1, 27), "AA1");
        assert_eq!(rowcol_to_a1(3, 52), "AZ3");
        assert_eq!(rowcol_to_a1(7, 703), "AAA7");
    }

    #[test]
    fn path_escaping_covers_title_characters() {
        assert_eq!(escape_path("'Daily Log'!A1"), "%27Daily%20Log%27!A1");
    }

    #[test]
    fn cell_text_handles_both_value_kinds() {
        assert_eq!(cell_text(&serde_json::json!("Date")), "Date");
        assert_eq!(cell_text(&serde_json::json!(1.5)), "1.5");
    }
}
