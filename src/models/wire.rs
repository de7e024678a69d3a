//! Column decoders for the loosely typed shapes the hosted tables hand back.

use super::MediaMap;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Text column that is sometimes stored as a number
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Nullable column backing a non-optional field; `null` becomes the default
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Timestamps arrive with or without an offset, or as a bare date
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<String>::deserialize(deserializer)? {
        Some(raw) => raw,
        None => return Ok(None),
    };
    Ok(parse_timestamp(&raw))
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Feature blobs are usually "a, b, c" but older rows hold a JSON array
pub fn comma_blob<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        _ => None,
    })
}

/// Media column: a JSON object, a string holding a JSON object, or null.
/// Anything unparseable decodes to an empty map.
pub fn media_map<'de, D>(deserializer: D) -> Result<MediaMap, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let object = match value {
        Some(Value::Object(map)) => map,
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => return Ok(MediaMap::new()),
        },
        _ => return Ok(MediaMap::new()),
    };

    Ok(object
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(url) => Some((key, url)),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_timestamp_variants() {
        let with_offset = parse_timestamp("2024-03-05T10:20:30+00:00").unwrap();
        assert_eq!((with_offset.month(), with_offset.hour()), (3, 10));

        let naive = parse_timestamp("2024-11-02T08:00:00.123456").unwrap();
        assert_eq!(naive.month(), 11);

        let date = parse_timestamp("2024-01-31").unwrap();
        assert_eq!((date.month(), date.day()), (1, 31));

        assert!(parse_timestamp("yesterday").is_none());
    }
}
