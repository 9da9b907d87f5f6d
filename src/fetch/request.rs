use std::collections::HashMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{AppError, Context, Result};

/// Replace `{name}` placeholders in `template` with the matching replacement.
pub fn render_template(template: &str, replacements: &[(&str, &str)]) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '{' {
            let mut key = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                key.push(next);
            }

            if !closed {
                return Err(AppError::message(format!(
                    "Unterminated placeholder in template: {{{key}"
                )));
            }

            if key.is_empty() {
                return Err(AppError::message(
                    "Encountered empty placeholder `{}` in template",
                ));
            }

            let value = replacements
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    AppError::message(format!(
                        "No replacement provided for placeholder `{}` in template",
                        key
                    ))
                })?;
            result.push_str(value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Expand `${VAR}` references from the process environment.
pub fn expand_env_vars(value: &str) -> Result<String> {
    expand_with(value, |name| std::env::var(name).ok())
}

fn expand_with<F>(value: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut name = String::new();
            let mut closed = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == '}' {
                    closed = true;
                    break;
                }
                name.push(next);
            }

            if name.is_empty() {
                return Err(AppError::message(
                    "Encountered empty environment placeholder in header",
                ));
            }

            if !closed {
                return Err(AppError::message(
                    "Unterminated environment placeholder in header",
                ));
            }

            let value = lookup(&name).ok_or_else(|| {
                AppError::message(format!(
                    "Environment variable {} required by request header is not set",
                    name
                ))
            })?;
            result.push_str(&value);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Build the static header map sent with every upstream request.
pub fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .with_context(|| format!("Invalid header name: {}", key))?;
        let expanded = expand_env_vars(value)?;
        let header_value = HeaderValue::from_str(&expanded)
            .with_context(|| format!("Invalid header value for {}", key))?;
        map.insert(name, header_value);
    }
    Ok(map)
}
