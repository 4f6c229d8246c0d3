//! Scalar coercion of interpreter tokens.
//!
//! The interpreter only ever hands back text. [`coerce`] guesses the most
//! specific type a token can represent, trying the patterns in a fixed order:
//!
//! 1. empty → [`DecodedValue::Null`]
//! 2. decimal or `0x` hexadecimal integer → [`DecodedValue::Integer`]
//! 3. `-?digits.digits` → [`DecodedValue::Float`]
//! 4. `true` / `false` in any case → [`DecodedValue::Boolean`]
//! 5. `YYYY-M-D H:M:S` → [`DecodedValue::Timestamp`], except the all-zero
//!    `0000-00-00 00:00:00` placeholder which is [`DecodedValue::Null`]
//! 6. anything else → [`DecodedValue::Text`], unchanged
//!
//! Coercion never fails. A token that looks numeric but does not fit the
//! target type (an integer wider than 64 bits, February 30th) falls through
//! to the raw string.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Serialize, Serializer};

/// Format used both to render and to parse timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ZERO_TIMESTAMP: &str = "0000-00-00 00:00:00";

static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?(?:0[xX][0-9a-fA-F]+|\d+)$").unwrap());
static FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").unwrap());
static TIMESTAMP_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\d{4}-\d{1,2}-\d{1,2}\s\d{1,2}:\d{1,2}:\d{1,2}$").unwrap());

/// A single interpreter token after coercion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedValue {
	Null,
	Integer(i64),
	Float(f64),
	Boolean(bool),
	Timestamp(#[serde(serialize_with = "serialize_timestamp")] NaiveDateTime),
	Text(String),
}

/// Coerces a token into the most specific [`DecodedValue`] it matches.
///
/// Surrounding whitespace is ignored.
pub fn coerce(text: &str) -> DecodedValue {
	let data = text.trim();

	if data.is_empty() {
		return DecodedValue::Null;
	}

	if INTEGER_RE.is_match(data) {
		if let Some(value) = parse_integer(data) {
			return DecodedValue::Integer(value);
		}
	} else if FLOAT_RE.is_match(data) {
		if let Ok(value) = data.parse::<f64>() {
			return DecodedValue::Float(value);
		}
	} else if data.eq_ignore_ascii_case("true") {
		return DecodedValue::Boolean(true);
	} else if data.eq_ignore_ascii_case("false") {
		return DecodedValue::Boolean(false);
	} else if TIMESTAMP_RE.is_match(data) {
		if data == ZERO_TIMESTAMP {
			return DecodedValue::Null;
		}
		if let Ok(ts) = NaiveDateTime::parse_from_str(data, TIMESTAMP_FORMAT) {
			return DecodedValue::Timestamp(ts);
		}
	}

	DecodedValue::Text(data.to_string())
}

fn parse_integer(data: &str) -> Option<i64> {
	let (negative, digits) = match data.strip_prefix('-') {
		Some(rest) => (true, rest),
		None => (false, data),
	};

	let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
		Some(hex) => i64::from_str_radix(hex, 16).ok()?,
		None => return data.parse::<i64>().ok(),
	};

	Some(if negative { -magnitude } else { magnitude })
}

fn serialize_timestamp<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}

impl DecodedValue {
	pub fn is_null(&self) -> bool {
		matches!(self, DecodedValue::Null)
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			DecodedValue::Integer(v) => Some(*v),
			_ => None,
		}
	}

	/// Returns the value as a float, widening integers.
	pub fn as_f64(&self) -> Option<f64> {
		match self {
			DecodedValue::Float(v) => Some(*v),
			DecodedValue::Integer(v) => Some(*v as f64),
			_ => None,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			DecodedValue::Boolean(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_timestamp(&self) -> Option<&NaiveDateTime> {
		match self {
			DecodedValue::Timestamp(ts) => Some(ts),
			_ => None,
		}
	}

	/// Returns the raw text for values that stayed strings.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			DecodedValue::Text(s) => Some(s),
			_ => None,
		}
	}

	/// Short lowercase name of the variant, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			DecodedValue::Null => "null",
			DecodedValue::Integer(_) => "integer",
			DecodedValue::Float(_) => "float",
			DecodedValue::Boolean(_) => "boolean",
			DecodedValue::Timestamp(_) => "timestamp",
			DecodedValue::Text(_) => "text",
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
	}
}

/// Renders the value back into interpreter text.
///
/// The output coerces back to an equal value: floats always keep a decimal
/// point so `2.0` does not come back as the integer `2`.
impl fmt::Display for DecodedValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DecodedValue::Null => Ok(()),
			DecodedValue::Integer(v) => write!(f, "{v}"),
			DecodedValue::Float(v) => {
				let rendered = v.to_string();
				if rendered.contains('.') {
					f.write_str(&rendered)
				} else {
					write!(f, "{rendered}.0")
				}
			}
			DecodedValue::Boolean(v) => write!(f, "{v}"),
			DecodedValue::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
			DecodedValue::Text(s) => f.write_str(s),
		}
	}
}

impl From<i64> for DecodedValue {
	fn from(value: i64) -> Self {
		DecodedValue::Integer(value)
	}
}

impl From<f64> for DecodedValue {
	fn from(value: f64) -> Self {
		DecodedValue::Float(value)
	}
}

impl From<bool> for DecodedValue {
	fn from(value: bool) -> Self {
		DecodedValue::Boolean(value)
	}
}

impl From<&str> for DecodedValue {
	fn from(value: &str) -> Self {
		DecodedValue::Text(value.to_string())
	}
}

impl From<String> for DecodedValue {
	fn from(value: String) -> Self {
		DecodedValue::Text(value)
	}
}
