use crate::error::{AppError, Result};

use super::{BatchConfig, CacheConfig, Config, SymbolConfig, UpstreamConfig};

/// Validate the effective configuration and surface every problem at once.
pub fn validate_config(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    validate_cache(&config.cache, &mut issues);
    validate_symbols(&config.symbols, &mut issues);
    validate_batch(&config.batch, &mut issues);
    validate_upstream(&config.upstream, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(AppError::message(format!(
            "configuration invalid:\n  - {}",
            issues.join("\n  - ")
        )))
    }
}

fn validate_cache(cache: &CacheConfig, issues: &mut Vec<String>) {
    if cache.price_ttl_secs == 0 {
        issues.push("cache.price_ttl_secs must be greater than zero".to_string());
    }
    if cache.company_ttl_secs == 0 {
        issues.push("cache.company_ttl_secs must be greater than zero".to_string());
    }
    if cache.max_entries == 0 {
        issues.push("cache.max_entries must be greater than zero".to_string());
    }
}

fn validate_symbols(symbols: &SymbolConfig, issues: &mut Vec<String>) {
    let suffix = symbols.default_suffix.as_str();
    if suffix.len() < 2 || !suffix.starts_with('.') {
        issues.push(format!(
            "symbols.default_suffix must look like `.NS`, found `{suffix}`"
        ));
    }
}

fn validate_batch(batch: &BatchConfig, issues: &mut Vec<String>) {
    if batch.max_symbols == 0 {
        issues.push("batch.max_symbols must be greater than zero".to_string());
    }
    if batch.watchlist_max_symbols == 0 {
        issues.push("batch.watchlist_max_symbols must be greater than zero".to_string());
    }
    if batch.workers == 0 {
        issues.push("batch.workers must be greater than zero".to_string());
    }
}

fn validate_upstream(upstream: &UpstreamConfig, issues: &mut Vec<String>) {
    for (name, template) in [
        ("upstream.quote_url", &upstream.quote_url),
        ("upstream.chart_url", &upstream.chart_url),
    ] {
        if !template.contains("{symbol}") {
            issues.push(format!("{name} must contain a `{{symbol}}` placeholder"));
        }
    }
    if upstream.modules.trim().is_empty() {
        issues.push("upstream.modules must not be empty".to_string());
    }
    if upstream.timeout_secs == 0 {
        issues.push("upstream.timeout_secs must be greater than zero".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        validate_config(&Config::builtin()).expect("builtin config should be valid");
    }

    #[test]
    fn aggregates_every_issue() {
        let mut config = Config::builtin();
        config.cache.price_ttl_secs = 0;
        config.batch.workers = 0;

        let err = validate_config(&config).expect_err("validation should fail");
        let message = err.to_string();
        assert!(message.contains("price_ttl_secs"), "unexpected: {message}");
        assert!(message.contains("batch.workers"), "unexpected: {message}");
    }

    #[test]
    fn rejects_suffix_without_dot() {
        let mut config = Config::builtin();
        config.symbols.default_suffix = "NS".to_string();

        let err = validate_config(&config).expect_err("validation should fail");
        assert!(
            err.to_string().contains("default_suffix"),
            "unexpected error message: {}",
            err
        );
    }

    #[test]
    fn rejects_template_without_symbol_placeholder() {
        let mut config = Config::builtin();
        config.upstream.chart_url = "https://example.invalid/chart".to_string();

        let err = validate_config(&config).expect_err("validation should fail");
        let msg = err.to_string();
        assert!(msg.contains("upstream.chart_url"), "unexpected error message: {msg}");
    }
}
