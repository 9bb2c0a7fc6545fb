//! Serialization of [`PipelineConfig`] into a commented INI file.

use super::settings::PipelineConfig;
use super::size::format_size;

pub(super) fn to_config_string(config: &PipelineConfig) -> String {
    format!(
        r#"# Tileflow configuration

[source]
# Tile URL. {{map}}, {{z}}, {{x}} and {{y}} are replaced per tile.
url_template = {url_template}
# Payload format, used as the decoder hint (png, jpeg, webp, ...)
image_format = {image_format}

[network]
# Per-transfer timeout in seconds
timeout = {timeout}
# Pending requests older than this many seconds are failed
expiry = {expiry}
# Largest accepted tile response body (e.g. 16MB)
max_payload = {max_payload}

[decode]
# Decode worker threads, 0 decodes on the calling thread
workers = {workers}

[cache]
# Budget for decoded tiles waiting to be drawn (e.g. 64MB)
max_size = {max_size}

[surface]
# Frame size in pixels, used when no tile grid is given
width = {width}
height = {height}
tile_size = {tile_size}
"#,
        url_template = config.source.url_template,
        image_format = config.source.image_format,
        timeout = config.network.timeout_secs,
        expiry = config.network.expiry_secs,
        max_payload = format_size(config.network.max_payload_bytes),
        workers = config.decode.workers,
        max_size = format_size(config.cache.max_bytes),
        width = config.surface.width,
        height = config.surface.height,
        tile_size = config.surface.tile_size,
    )
}
