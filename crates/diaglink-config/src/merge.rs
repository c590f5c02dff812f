use crate::config::Config;
use crate::error::ConfigError;

/// Layer the TOML document `overlay_toml` over `base`.
///
/// Keys the overlay sets win, tables merge key by key, and everything else
/// keeps its `base` value. `origin` names the document in parse errors.
pub fn merge_configs(base: &Config, overlay_toml: &str, origin: &str) -> Result<Config, ConfigError> {
    let parse_error = |message: String| ConfigError::Parse {
        origin: origin.to_string(),
        message,
    };

    let overlay: toml::Table =
        toml::from_str(overlay_toml).map_err(|e| parse_error(e.to_string()))?;
    let mut merged = match toml::Value::try_from(base) {
        Ok(toml::Value::Table(table)) => table,
        Ok(_) => return Err(parse_error("defaults are not a table".into())),
        Err(e) => return Err(parse_error(e.to_string())),
    };

    overlay_table(&mut merged, overlay);

    toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(e.to_string()))
}

fn overlay_table(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(inner)), toml::Value::Table(nested)) => {
                overlay_table(inner, nested)
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
