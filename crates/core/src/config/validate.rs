use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Default cleaning durations are positive and within the maximum
/// - Queue retry and aging settings are usable
/// - Sweep interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    let turnover = &config.turnover;
    if turnover.max_duration_minutes == 0 {
        return Err(invalid("turnover.max_duration_minutes must be positive"));
    }
    for (key, minutes) in [
        ("standard_minutes", turnover.standard_minutes),
        ("deep_clean_minutes", turnover.deep_clean_minutes),
        ("isolation_minutes", turnover.isolation_minutes),
    ] {
        if minutes == 0 {
            return Err(invalid(format!("turnover.{} must be positive", key)));
        }
        if minutes > turnover.max_duration_minutes {
            return Err(invalid(format!(
                "turnover.{} ({}) exceeds turnover.max_duration_minutes ({})",
                key, minutes, turnover.max_duration_minutes
            )));
        }
    }

    if config.queue.max_assignment_retries == 0 {
        return Err(invalid("queue.max_assignment_retries must be at least 1"));
    }
    let aging = config.queue.aging_points_per_hour;
    if !aging.is_finite() || aging < 0.0 {
        return Err(invalid(
            "queue.aging_points_per_hour must be a non-negative number",
        ));
    }

    if config.sweeper.interval_ms == 0 {
        return Err(invalid("sweeper.interval_ms cannot be 0"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}
