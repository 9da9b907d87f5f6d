use std::collections::HashMap;

use serde_json::Value;

use crate::error::UpstreamError;

use super::{DailyRange, FetchResult, RawRecord};

const NOT_FOUND_CODE: &str = "Not Found";

/// Flatten a quoteSummary payload into a single field mapping.
///
/// Modules are visited in `modules` order and the first module to supply a key wins.
/// `{"raw": x, "fmt": ...}` wrappers collapse to `x`; empty objects are dropped.
pub fn flatten_quote_summary(
    root: &Value,
    symbol: &str,
    modules: &[&str],
) -> FetchResult<RawRecord> {
    let summary = root
        .get("quoteSummary")
        .ok_or_else(|| UpstreamError::Malformed("missing `quoteSummary` envelope".to_string()))?;

    let result = match summary.get("result").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => &items[0],
        _ => return Err(envelope_error(summary, symbol)),
    };

    let mut fields: HashMap<String, Value> = HashMap::new();
    for module in modules {
        let Some(entries) = result.get(*module).and_then(Value::as_object) else {
            continue;
        };
        for (key, value) in entries {
            if let Some(value) = unwrap_value(value) {
                fields.entry(key.clone()).or_insert(value);
            }
        }
    }

    Ok(RawRecord::new(fields))
}

/// Extract the daily high/low pairs from a chart payload, skipping days with gaps.
pub fn parse_daily_ranges(root: &Value, symbol: &str) -> FetchResult<Vec<DailyRange>> {
    let chart = root
        .get("chart")
        .ok_or_else(|| UpstreamError::Malformed("missing `chart` envelope".to_string()))?;

    let result = match chart.get("result").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => &items[0],
        _ => return Err(envelope_error(chart, symbol)),
    };

    let Some(quote) = result["indicators"]["quote"].get(0) else {
        return Ok(Vec::new());
    };

    let column = |name: &str| -> Vec<Option<f64>> {
        quote
            .get(name)
            .and_then(Value::as_array)
            .map(|values| values.iter().map(Value::as_f64).collect())
            .unwrap_or_default()
    };

    let ranges = column("high")
        .into_iter()
        .zip(column("low"))
        .filter_map(|pair| match pair {
            (Some(high), Some(low)) => Some(DailyRange { high, low }),
            _ => None,
        })
        .collect();

    Ok(ranges)
}

fn unwrap_value(value: &Value) -> Option<Value> {
    match value {
        Value::Null | Value::Array(_) => None,
        Value::Object(map) => map.get("raw").filter(|raw| !raw.is_null()).cloned(),
        scalar => Some(scalar.clone()),
    }
}

fn envelope_error(envelope: &Value, symbol: &str) -> UpstreamError {
    let code = envelope["error"]["code"].as_str();
    match code {
        Some(NOT_FOUND_CODE) | None => UpstreamError::NotFound(symbol.to_string()),
        Some(other) => {
            let description = envelope["error"]["description"].as_str().unwrap_or_default();
            UpstreamError::Malformed(format!("{other}: {description}"))
        }
    }
}
