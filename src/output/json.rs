use anyhow::Result;
use serde::Serialize;

use crate::store::DataOrigin;

pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize + ?Sized> {
    origin: DataOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<&'a str>,
    data: &'a T,
}

/// Wraps a payload with where its data came from, so consumers can flag
/// fallback figures.
pub fn render_json_with_origin<T: Serialize + ?Sized>(
    value: &T,
    origin: DataOrigin,
    warning: Option<&str>,
) -> Result<String> {
    render_json(&Envelope {
        origin,
        warning,
        data: value,
    })
}
