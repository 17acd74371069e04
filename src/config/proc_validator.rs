//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - metadata endpoint, refresh timings, retry and server invariants

use tracing::{error, info};

use crate::config::settings::{MetadataConfig, MetricsConfig, RefreshConfig, RetryConfig, ServiceConfig};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_metadata(&cfg.settings.metadata, &mut errors);
    validate_refresh(&cfg.settings.refresh, &mut errors);
    if let Some(retry) = &cfg.settings.retry {
        validate_retry(retry, &mut errors);
    }
    validate_metrics(&cfg.settings.metrics, &mut errors);
    if let Some(logging) = &cfg.settings.logging {
        if !matches!(logging.level.to_lowercase().as_str(), "trace" | "debug" | "info" | "warn" | "error") {
            errors.push(format!("settings.logging.level '{}' is not one of trace, debug, info, warn, error", logging.level));
        }
    }
    if cfg.settings.server.port.parse::<u16>().is_err() {
        errors.push(format!("settings.server.port '{}' is not a valid port", cfg.settings.server.port));
    }

    if errors.is_empty() {
        info!("config validation passed");
        Ok(())
    } else {
        for e in &errors {
            error!("config: {}", e);
        }
        Err(errors)
    }
}

fn validate_metadata(metadata: &MetadataConfig, errors: &mut Vec<String>) {
    let url = metadata.base_url.trim();
    if url.is_empty() {
        errors.push("settings.metadata.base_url must not be empty".to_string());
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("settings.metadata.base_url '{}' must start with http:// or https://", url));
    }
    if metadata.timeout_ms == 0 {
        errors.push("settings.metadata.timeout_ms must be > 0".to_string());
    }
    if metadata.imds_v2 && metadata.token_ttl_seconds == 0 {
        errors.push("settings.metadata.token_ttl_seconds must be > 0 when imds_v2 is enabled".to_string());
    }
}

fn validate_refresh(refresh: &RefreshConfig, errors: &mut Vec<String>) {
    if refresh.safety_margin_seconds == 0 {
        errors.push("settings.refresh.safety_margin_seconds must be > 0".to_string());
    }
    if refresh.min_refresh_delay_seconds == 0 {
        errors.push("settings.refresh.min_refresh_delay_seconds must be >= 1".to_string());
    }
    if refresh.failure_retry_base_seconds == 0 {
        errors.push("settings.refresh.failure_retry_base_seconds must be > 0".to_string());
    }
    if refresh.failure_retry_base_seconds > refresh.failure_retry_max_seconds {
        errors.push(format!(
            "settings.refresh.failure_retry_base_seconds ({}) must be <= failure_retry_max_seconds ({})",
            refresh.failure_retry_base_seconds, refresh.failure_retry_max_seconds
        ));
    }
}

fn validate_retry(retry: &RetryConfig, errors: &mut Vec<String>) {
    if retry.attempts == Some(0) {
        errors.push("settings.retry.attempts must be >= 1".to_string());
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if base > max {
            errors.push(format!(
                "settings.retry.base_delay_ms ({}) must be <= max_delay_ms ({})",
                base, max
            ));
        }
    }
}

fn validate_metrics(metrics: &MetricsConfig, errors: &mut Vec<String>) {
    if metrics.is_enabled && !metrics.path.starts_with('/') {
        errors.push(format!("settings.metrics.path '{}' must start with '/'", metrics.path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::LoggingConfig;

    #[test]
    fn defaults_are_valid() {
        let mut cfg = ServiceConfig::default();
        cfg.settings.logging = Some(LoggingConfig::default());
        assert!(validate_service_config(&cfg).is_ok());
    }

    #[test]
    fn all_issues_are_reported_together() {
        let mut cfg = ServiceConfig::default();
        cfg.settings.metadata.base_url = "169.254.169.254".into();
        cfg.settings.refresh.failure_retry_base_seconds = 120;
        cfg.settings.refresh.failure_retry_max_seconds = 60;
        cfg.settings.retry = Some(RetryConfig { attempts: Some(0), base_delay_ms: Some(500), max_delay_ms: Some(100) });
        cfg.settings.server.port = "http".into();

        let errors = validate_service_config(&cfg).unwrap_err();
        assert_eq!(errors.len(), 5, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("base_url")));
        assert!(errors.iter().any(|e| e.contains("failure_retry_base_seconds")));
        assert!(errors.iter().any(|e| e.contains("attempts")));
        assert!(errors.iter().any(|e| e.contains("base_delay_ms")));
        assert!(errors.iter().any(|e| e.contains("port")));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut cfg = ServiceConfig::default();
        cfg.settings.logging = Some(LoggingConfig::new("verbose".into(), crate::config::settings::LogFormat::Json));
        let errors = validate_service_config(&cfg).unwrap_err();
        assert!(errors[0].contains("verbose"));
    }
}
