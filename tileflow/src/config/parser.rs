//! Mapping of INI sections and keys onto [`PipelineConfig`].

use std::str::FromStr;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::PipelineConfig;
use super::size::parse_size;

/// Overlay the values found in `ini` on the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<PipelineConfig, ConfigFileError> {
    let mut config = PipelineConfig::default();

    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("url_template") {
            let v = v.trim();
            let missing: Vec<&str> = ["{z}", "{x}", "{y}"]
                .into_iter()
                .filter(|placeholder| !v.contains(placeholder))
                .collect();
            if !missing.is_empty() {
                return Err(invalid(
                    "source",
                    "url_template",
                    v,
                    format!("missing placeholder(s) {}", missing.join(", ")),
                ));
            }
            config.source.url_template = v.to_string();
        }
        if let Some(v) = section.get("image_format") {
            let v = v.trim();
            if v.is_empty() {
                return Err(invalid("source", "image_format", v, "must not be empty"));
            }
            config.source.image_format = v.to_lowercase();
        }
    }

    if let Some(section) = ini.section(Some("network")) {
        if let Some(v) = positive(section, "network", "timeout")? {
            config.network.timeout_secs = v;
        }
        if let Some(v) = positive(section, "network", "expiry")? {
            config.network.expiry_secs = v;
        }
        if let Some(v) = section.get("max_payload") {
            config.network.max_payload_bytes = match parse_size(v) {
                Ok(bytes) if bytes > 0 => bytes,
                _ => return Err(invalid("network", "max_payload", v, "expected e.g. '16MB'")),
            };
        }
    }

    if let Some(section) = ini.section(Some("decode")) {
        if let Some(v) = section.get("workers") {
            config.decode.workers = number(v).ok_or_else(|| {
                invalid("decode", "workers", v, "must be 0 (inline) or a thread count")
            })?;
        }
    }

    if let Some(section) = ini.section(Some("cache")) {
        if let Some(v) = section.get("max_size") {
            config.cache.max_bytes = parse_size(v)
                .map_err(|_| invalid("cache", "max_size", v, "expected e.g. '64MB' or '512KB'"))?;
        }
    }

    if let Some(section) = ini.section(Some("surface")) {
        if let Some(v) = positive(section, "surface", "width")? {
            config.surface.width = v;
        }
        if let Some(v) = positive(section, "surface", "height")? {
            config.surface.height = v;
        }
        if let Some(v) = positive(section, "surface", "tile_size")? {
            config.surface.tile_size = v;
        }
    }

    Ok(config)
}

fn number<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

/// Read an optional strictly positive integer.
fn positive<T>(
    section: &Properties,
    section_name: &str,
    key: &str,
) -> Result<Option<T>, ConfigFileError>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(v) = section.get(key) else {
        return Ok(None);
    };
    match number::<T>(v) {
        Some(n) if n > T::default() => Ok(Some(n)),
        _ => Err(invalid(section_name, key, v, "must be a positive integer")),
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}
