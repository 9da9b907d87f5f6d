use std::fmt;
use std::str::FromStr;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use crate::fetch::{DailyRange, RawRecord};

pub mod fields;

pub use fields::{fields_for, Derived, Fallback, FieldSpec};

/// Marker emitted for fields the provider could not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Output shape requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewType {
    PriceOnly,
    Summary,
    Full,
}

impl ViewType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewType::PriceOnly => "price_only",
            ViewType::Summary => "summary",
            ViewType::Full => "full",
        }
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "price" | "price_only" => Ok(ViewType::PriceOnly),
            "summary" => Ok(ViewType::Summary),
            "full" | "stock" => Ok(ViewType::Full),
            other => Err(format!("unknown view `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(Number),
    Text(String),
    NotAvailable,
}

impl FieldValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(FieldValue::Number(n.clone())),
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn from_f64(value: f64) -> Option<Self> {
        Number::from_f64(value).map(FieldValue::Number)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

impl From<Fallback> for FieldValue {
    fn from(fallback: Fallback) -> Self {
        match fallback {
            Fallback::Zero => FieldValue::Number(Number::from(0)),
            Fallback::NotAvailable => FieldValue::NotAvailable,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Number(n) => n.serialize(serializer),
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

/// Fixed-shape record for one symbol and view. Every declared field is always present.
#[derive(Debug, Clone)]
pub struct NormalizedRecord {
    symbol: String,
    view: ViewType,
    fields: Vec<(&'static str, FieldValue)>,
    generated_at: i64,
}

impl NormalizedRecord {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn view(&self) -> ViewType {
        self.view
    }

    pub fn generated_at(&self) -> i64 {
        self.generated_at
    }

    pub fn fields(&self) -> &[(&'static str, FieldValue)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    fn serialize_entries<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        map.serialize_entry("symbol", &self.symbol)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("timestamp", &self.generated_at)
    }
}

/// The generation timestamp is request-time data and takes no part in equality.
impl PartialEq for NormalizedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.view == other.view && self.fields == other.fields
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 2))?;
        self.serialize_entries(&mut map)?;
        map.end()
    }
}

/// A record as handed to callers, tagged with whether it came from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub record: NormalizedRecord,
    pub cached: bool,
}

impl Serialize for Quote {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.record.fields.len() + 3))?;
        self.record.serialize_entries(&mut map)?;
        map.serialize_entry("cached", &self.cached)?;
        map.end()
    }
}

/// Reshape a raw provider record into the fixed field set of `view`.
///
/// Pure: identical input, view and timestamp always yield an identical record.
pub fn normalize(
    raw: &RawRecord,
    view: ViewType,
    symbol: &str,
    generated_at: i64,
) -> NormalizedRecord {
    let fields = fields_for(view)
        .iter()
        .map(|spec| (spec.name, resolve(spec, raw)))
        .collect();

    NormalizedRecord {
        symbol: symbol.to_string(),
        view,
        fields,
        generated_at,
    }
}

fn resolve(spec: &FieldSpec, raw: &RawRecord) -> FieldValue {
    spec.sources
        .iter()
        .find_map(|source| raw.get(source).and_then(FieldValue::from_json))
        .or_else(|| {
            spec.derived
                .and_then(|how| derive(how, raw.daily_ranges()))
                .and_then(FieldValue::from_f64)
        })
        .unwrap_or_else(|| spec.fallback.into())
}

fn derive(how: Derived, ranges: &[DailyRange]) -> Option<f64> {
    match how {
        Derived::YearHigh => ranges
            .iter()
            .map(|day| day.high)
            .filter(|value| value.is_finite())
            .reduce(f64::max),
        Derived::YearLow => ranges
            .iter()
            .map(|day| day.low)
            .filter(|value| value.is_finite())
            .reduce(f64::min),
    }
}

/// Whether `view` could use daily history to fill fields missing from `raw`.
pub fn needs_history(raw: &RawRecord, view: ViewType) -> bool {
    fields_for(view).iter().any(|spec| {
        spec.derived.is_some() && !spec.sources.iter().any(|source| raw.contains(source))
    })
}
