//
// Copyright (c) Memfault, Inc.
// See License.txt for details
//! Optional `u8` given either as a JSON number or as a string with an
//! optional radix prefix (`"0x29"`, `"0o51"`, `"0b101001"`, `"41"`).
use serde::{de::Error, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum IntegerExpression {
    Number(u64),
    Text(String),
}

pub fn serialize<S>(value: &Option<u8>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(value) => serializer.serialize_u8(*value),
        None => serializer.serialize_none(),
    }
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<IntegerExpression>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(IntegerExpression::Number(n)) => n,
        Some(IntegerExpression::Text(text)) => parse(&text)
            .ok_or_else(|| D::Error::custom(format!("\"{}\" is not a valid integer", text)))?,
    };
    u8::try_from(value)
        .map(Some)
        .map_err(|_| D::Error::custom(format!("{} is out of range", value)))
}

fn parse(text: &str) -> Option<u64> {
    let text = text.trim();
    let lower = text.to_ascii_lowercase();
    let (digits, radix) = if let Some(hex) = lower.strip_prefix("0x") {
        (hex, 16)
    } else if let Some(octal) = lower.strip_prefix("0o") {
        (octal, 8)
    } else if let Some(binary) = lower.strip_prefix("0b") {
        (binary, 2)
    } else {
        (lower.as_str(), 10)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
