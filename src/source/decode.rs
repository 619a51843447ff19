use std::collections::HashMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::utils::time::{weekday_abbrev, weekday_name, WEEK};

use super::{DayMark, TimeBlockRecord};

/// Name of the date property every record shares within one tracking period.
pub const WEEK_START_PROP: &str = "Week Start";

/// One page of a record store query response.
#[derive(Debug, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub results: Option<Vec<RawRecord>>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A record as the store returns it: a bag of named properties.
#[derive(Debug, Deserialize)]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub properties: HashMap<String, RawProperty>,
}

/// The property variants the tracker schema uses. Properties of other kinds deserialize with
/// every field unset and fall out during decoding.
#[derive(Debug, Default, Deserialize)]
pub struct RawProperty {
    #[serde(default)]
    pub checkbox: Option<bool>,
    #[serde(default)]
    pub select: Option<RawSelect>,
    #[serde(default)]
    pub date: Option<RawDate>,
}

#[derive(Debug, Deserialize)]
pub struct RawSelect {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RawDate {
    pub start: String,
}

/// Turns a raw property bag into the fixed record shape. The worked marker lives under the
/// 3-letter day key, the category under the full day name. Absent properties decode to
/// unworked/uncategorized rather than failing, matching how the tracker omits untouched fields.
pub fn decode_record(raw: RawRecord) -> Result<TimeBlockRecord> {
    let mut days: [DayMark; 7] = Default::default();
    for (slot, day) in days.iter_mut().zip(WEEK) {
        let worked = raw
            .properties
            .get(weekday_abbrev(day))
            .and_then(|p| p.checkbox)
            .unwrap_or(false);
        let category = raw
            .properties
            .get(weekday_name(day))
            .and_then(|p| p.select.as_ref())
            .map(|s| s.name.clone());
        *slot = DayMark { worked, category };
    }

    let week_start = raw
        .properties
        .get(WEEK_START_PROP)
        .and_then(|p| p.date.as_ref())
        .map(|date| {
            parse_start_date(&date.start)
                .with_context(|| format!("record {}: bad week start {:?}", raw.id, date.start))
        })
        .transpose()?;

    Ok(TimeBlockRecord {
        id: raw.id,
        days,
        week_start,
    })
}

/// Week starts arrive either as a plain date or a full timestamp. Only the date part matters.
fn parse_start_date(value: &str) -> Result<NaiveDate> {
    let date_part = value.get(..10).unwrap_or(value);
    Ok(NaiveDate::parse_from_str(date_part, "%Y-%m-%d")?)
}
