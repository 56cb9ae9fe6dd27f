use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use statbot_lib::{Cached, EntryInfo, IdSet};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Tabled, Serialize)]
struct EntryRow {
    #[tabled(rename = "Key")]
    #[serde(rename = "Key")]
    key: String,
    #[tabled(rename = "Expires")]
    #[serde(rename = "Expires")]
    expires: String,
    #[tabled(rename = "Remaining")]
    #[serde(rename = "Remaining")]
    remaining: String,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Renders a remaining duration as `1h 02m`, `1m 58s` or `45s`.
pub fn format_remaining(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m", h, m)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

fn format_expiry(epoch_secs: f64) -> String {
    DateTime::<Utc>::from_timestamp_millis((epoch_secs * 1000.0) as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn status_line(cached: &Cached) -> String {
    if cached.from_cache {
        format!("cache hit, expires in {}", format_remaining(cached.remaining))
    } else {
        format!("fetched, cached for {}", format_remaining(cached.remaining))
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(map) => format!("{{{} fields}}", map.len()),
        other => other.to_string(),
    }
}

/// One row per top-level field; nested values are summarized.
fn field_rows(value: &Value) -> Vec<FieldRow> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| FieldRow {
                field: k.clone(),
                value: scalar(v),
            })
            .collect(),
        other => vec![FieldRow {
            field: "value".to_string(),
            value: scalar(other),
        }],
    }
}

pub fn print_lookup(cached: &Cached, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            eprintln!("{}", status_line(cached));
            let mut table = Table::new(field_rows(&cached.value));
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            let out = json!({
                "from_cache": cached.from_cache,
                "remaining_secs": cached.remaining.as_secs_f64(),
                "value": cached.value,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

pub fn print_entries(entries: &[EntryInfo], format: &OutputFormat) -> Result<()> {
    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            key: e.key.clone(),
            expires: format_expiry(e.expires_at),
            remaining: format_remaining(e.remaining),
        })
        .collect();
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("Cache is empty.");
                return Ok(());
            }
            let mut table = Table::new(&rows);
            table.with(Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

pub fn print_ids(user: u64, ids: &IdSet, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            let unset = || "(not set)".to_string();
            println!("User {}", user);
            println!("Steam: {}", ids.steam.clone().unwrap_or_else(unset));
            println!("Epic: {}", ids.epic.clone().unwrap_or_else(unset));
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(ids)?),
    }
    Ok(())
}
