use crate::config::Config;
use crate::error::FieldError;

/// Accepted range for `poll.tick_interval_ms`.
const TICK_INTERVAL_RANGE: std::ops::RangeInclusive<u64> = 10..=10_000;

/// Every rule the configuration breaks. Empty means valid.
pub fn validate(config: &Config) -> Vec<FieldError> {
    let mut issues = Vec::new();
    let mut require = |ok: bool, field: &'static str, message: &str| {
        if !ok {
            issues.push(FieldError {
                field,
                message: message.to_string(),
            });
        }
    };

    require(
        !config.server.host.trim().is_empty(),
        "server.host",
        "must not be empty",
    );
    require(config.server.port != 0, "server.port", "must not be 0");
    require(
        !config.project.language_id.trim().is_empty(),
        "project.language_id",
        "must not be empty",
    );
    require(
        TICK_INTERVAL_RANGE.contains(&config.poll.tick_interval_ms),
        "poll.tick_interval_ms",
        &format!(
            "must be between {} and {}, got {}",
            TICK_INTERVAL_RANGE.start(),
            TICK_INTERVAL_RANGE.end(),
            config.poll.tick_interval_ms
        ),
    );

    issues
}
