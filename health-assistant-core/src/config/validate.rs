//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    let provider = &config.provider;
    let api_base = provider.api_base.trim();
    if api_base.is_empty() {
        errors.push("provider.api_base must not be empty".to_string());
    } else if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
        errors.push("provider.api_base must start with http:// or https://".to_string());
    }
    if provider.model.trim().is_empty() {
        errors.push("provider.model must not be empty".to_string());
    }
    if !(0.0..=2.0).contains(&provider.temperature) {
        errors.push("provider.temperature must be in [0.0, 2.0]".to_string());
    }
    if provider.max_tokens == 0 {
        errors.push("provider.max_tokens must be > 0".to_string());
    }
    if provider.timeout_secs == 0 {
        errors.push("provider.timeout_secs must be > 0".to_string());
    }

    if config.agent.history_window == 0 {
        errors.push("agent.history_window must be > 0".to_string());
    }
    if config
        .agent
        .extra_emergency_keywords
        .iter()
        .any(|k| k.trim().is_empty())
    {
        errors.push("agent.extra_emergency_keywords must not contain blank entries".to_string());
    }

    if config.sessions.max_sessions == 0 {
        errors.push("sessions.max_sessions must be > 0".to_string());
    }
    if config.sessions.idle_ttl_secs == 0 {
        errors.push("sessions.idle_ttl_secs must be > 0".to_string());
    }
    if config.sessions.sweep_interval_secs == 0 {
        errors.push("sessions.sweep_interval_secs must be > 0".to_string());
    }

    if config.server.host.trim().is_empty() {
        errors.push("server.host must not be empty".to_string());
    }
    if config.server.port == 0 {
        errors.push("server.port must be > 0".to_string());
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
        errors.push("logging.level must be one of trace, debug, info, warn, error".to_string());
    }
    let format = config.logging.format.to_ascii_lowercase();
    if format != "text" && format != "json" {
        errors.push("logging.format must be text or json".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}
