//! Custom Tera filters
//!
//! - `ru_date`: "15 января 2024, 12:30" from an RFC 3339 timestamp
//! - `linebreaksbr`: escapes text and turns newlines into `<br>`
//! - `or_empty`: placeholder for null or blank values in the back office

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use tera::{Filter, Result as TeraResult, Tera, Value};

/// Shown in the back office wherever a value is missing
pub const EMPTY_VALUE_DISPLAY: &str = "Не задано";

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

pub fn register(tera: &mut Tera) {
    tera.register_filter("ru_date", ru_date);
    tera.register_filter("linebreaksbr", LineBreaks);
    tera.register_filter("or_empty", or_empty);
}

/// Format a timestamp the way the site displays dates
pub fn format_ru_date(dt: &DateTime<Utc>) -> String {
    format!(
        "{} {} {}, {:02}:{:02}",
        dt.day(),
        MONTHS_GENITIVE[dt.month0() as usize],
        dt.year(),
        dt.hour(),
        dt.minute()
    )
}

fn ru_date(value: &Value, _args: &HashMap<String, Value>) -> TeraResult<Value> {
    let raw = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("ru_date expects an RFC 3339 string"))?;
    let dt = DateTime::parse_from_rfc3339(raw)
        .map_err(|e| tera::Error::msg(format!("ru_date: invalid timestamp '{}': {}", raw, e)))?
        .with_timezone(&Utc);
    Ok(Value::String(format_ru_date(&dt)))
}

fn or_empty(value: &Value, _args: &HashMap<String, Value>) -> TeraResult<Value> {
    match value {
        Value::Null => Ok(Value::String(EMPTY_VALUE_DISPLAY.to_string())),
        Value::String(s) if s.trim().is_empty() => Ok(Value::String(EMPTY_VALUE_DISPLAY.to_string())),
        other => Ok(other.clone()),
    }
}

/// Escapes its input itself, so the output is marked safe.
struct LineBreaks;

impl Filter for LineBreaks {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> TeraResult<Value> {
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let escaped = tera::escape_html(&text);
        Ok(Value::String(
            escaped.replace("\r\n", "\n").replace('\n', "<br>"),
        ))
    }

    fn is_safe(&self) -> bool {
        true
    }
}
