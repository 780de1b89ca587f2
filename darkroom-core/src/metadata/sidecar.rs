use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{GatherError, Result};

/// Per-asset attributes from an exiftool-style JSON sidecar.
///
/// Sidecars are arrays; only the first element is consulted. Every field is
/// optional and anything not listed here is ignored. Numeric fields accept
/// JSON numbers as well as numeric or fractional strings (`"1/250"`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sidecar {
    #[serde(rename = "SourceFile")]
    pub source_file: Option<String>,
    #[serde(rename = "File:FileName")]
    pub file_name: Option<String>,
    #[serde(rename = "File:Directory")]
    pub directory: Option<String>,
    #[serde(rename = "File:FileSize", deserialize_with = "lenient_i64")]
    pub file_size: Option<i64>,

    #[serde(rename = "EXIF:Make")]
    pub make: Option<String>,
    #[serde(rename = "EXIF:Model")]
    pub model: Option<String>,
    #[serde(rename = "EXIF:Orientation", deserialize_with = "lenient_i64")]
    pub orientation: Option<i64>,
    #[serde(rename = "EXIF:ExposureTime", deserialize_with = "lenient_f64")]
    pub exposure_time: Option<f64>,
    #[serde(rename = "EXIF:ISO", deserialize_with = "lenient_i64")]
    pub iso: Option<i64>,
    #[serde(rename = "EXIF:DateTimeOriginal")]
    pub date_time_original: Option<String>,
    #[serde(rename = "EXIF:MaxApertureValue", deserialize_with = "lenient_f64")]
    pub max_aperture_value: Option<f64>,
    #[serde(rename = "EXIF:LensInfo", deserialize_with = "lenient_text")]
    pub lens_info: Option<String>,
    #[serde(rename = "EXIF:LensModel")]
    pub lens_model: Option<String>,

    #[serde(rename = "XMP:Rating", deserialize_with = "lenient_i64")]
    pub rating: Option<i64>,
    #[serde(rename = "XMP:Label")]
    pub label: Option<String>,
    #[serde(rename = "XMP:Subject", deserialize_with = "lenient_list")]
    pub subject: Option<Vec<String>>,
    #[serde(rename = "IPTC:Keywords", deserialize_with = "lenient_list")]
    pub keywords: Option<Vec<String>>,

    #[serde(rename = "Composite:Aperture", deserialize_with = "lenient_f64")]
    pub aperture: Option<f64>,
    #[serde(rename = "Composite:Megapixels", deserialize_with = "lenient_f64")]
    pub megapixels: Option<f64>,
    #[serde(rename = "Composite:ShutterSpeed", deserialize_with = "lenient_f64")]
    pub shutter_speed: Option<f64>,
}

impl Sidecar {
    /// "Make Model", collapsing a model that already starts with the make.
    pub fn camera(&self) -> Option<String> {
        match (self.make.as_deref(), self.model.as_deref()) {
            (Some(make), Some(model)) if model.starts_with(make) => {
                Some(model.to_string())
            }
            (Some(make), Some(model)) => Some(format!("{make} {model}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
            (None, None) => None,
        }
    }
}

/// Parse sidecar bytes, returning the first document of the array.
pub fn parse_sidecar(bytes: &[u8], origin: &Path) -> Result<Sidecar> {
    let documents: Vec<Sidecar> =
        serde_json::from_slice(bytes).map_err(|err| GatherError::InvalidSidecar {
            path: origin.to_path_buf(),
            reason: err.to_string(),
        })?;

    documents
        .into_iter()
        .next()
        .ok_or_else(|| GatherError::InvalidSidecar {
            path: origin.to_path_buf(),
            reason: "empty document array".into(),
        })
}

pub async fn read_sidecar(path: &Path) -> Result<Sidecar> {
    let bytes = tokio::fs::read(path).await?;
    parse_sidecar(&bytes, path)
}

fn number_from(value: Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            match s.split_once('/') {
                Some((num, den)) => {
                    let num: f64 = num.trim().parse().ok()?;
                    let den: f64 = den.trim().parse().ok()?;
                    (den != 0.0).then(|| num / den)
                }
                None => s.parse().ok(),
            }
        }
        _ => None,
    }
}

fn text_from(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(number_from))
}

fn lenient_i64<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(number_from)
        .map(|n| n.round() as i64))
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(text_from))
}

fn lenient_list<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => {
            Some(items.into_iter().filter_map(text_from).collect())
        }
        Some(other) => text_from(other).map(|one| vec![one]),
        None => None,
    })
}
