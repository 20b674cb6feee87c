use crate::error::FetchCause;
use crate::types::series::{MetricSeries, Month};
use flate2::read::GzDecoder;
use serde_json::{Map, Value};
use std::io::Read;
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The three document shapes the provider serves for a metric.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    /// `{"2025-01": 3.2, ...}`
    Flat(MetricSeries),
    /// `{"avg": {"2025-01": 3.2, ...}, "levels": ..., "quantile_0": ...}`
    Averaged(MetricSeries),
    /// A bare number.
    Scalar(f64),
}

impl ProviderPayload {
    pub fn decode(body: &[u8]) -> Result<Self, FetchCause> {
        let document: Value =
            serde_json::from_slice(body).map_err(|e| FetchCause::Json(e.to_string()))?;
        match document {
            Value::Object(map) => match map.get("avg") {
                Some(Value::Object(avg)) => month_entries(avg).map(Self::Averaged),
                _ => month_entries(&map).map(Self::Flat),
            },
            Value::Number(number) => number
                .as_f64()
                .map(Self::Scalar)
                .ok_or_else(|| FetchCause::UnexpectedShape(format!("unrepresentable number {number}"))),
            other => Err(FetchCause::UnexpectedShape(format!(
                "expected object or number, found {}",
                kind(&other)
            ))),
        }
    }

    /// A scalar carries no month, so it normalises to an empty series.
    pub fn into_series(self) -> MetricSeries {
        match self {
            Self::Flat(series) | Self::Averaged(series) => series,
            Self::Scalar(_) => MetricSeries::new(),
        }
    }
}

/// Keep only `YYYY-MM` keys; yearly, quarterly and `-raw` keys are dropped.
fn month_entries(map: &Map<String, Value>) -> Result<MetricSeries, FetchCause> {
    let mut series = MetricSeries::new();
    for (key, value) in map {
        let Ok(month) = key.parse::<Month>() else {
            continue;
        };
        let number = value.as_f64().ok_or_else(|| {
            FetchCause::UnexpectedShape(format!("non-numeric value for {key}: {}", kind(value)))
        })?;
        series.insert(month, number);
    }
    Ok(series)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Inflate a gzip body. Only the magic bytes decide: the provider sometimes
/// compresses without declaring it, and an intermediary may already have
/// inflated a body that still carries `Content-Encoding: gzip`.
pub fn decompress(body: Vec<u8>, declared_encoding: Option<&str>) -> Result<Vec<u8>, FetchCause> {
    if !body.starts_with(&GZIP_MAGIC) {
        if declared_encoding.is_some_and(|encoding| encoding.to_ascii_lowercase().contains("gzip")) {
            debug!("body declared gzip but is not compressed; using it as is");
        }
        return Ok(body);
    }
    let mut inflated = Vec::new();
    GzDecoder::new(body.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| FetchCause::Decompress(e.to_string()))?;
    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(raw: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(raw.as_bytes()).expect("gzip write");
        encoder.finish().expect("gzip finish")
    }

    fn month(raw: &str) -> Month {
        raw.parse().expect("month should parse")
    }

    #[test]
    fn decode_flat_mapping_keeps_month_keys_only() {
        let payload = ProviderPayload::decode(
            br#"{"2024": 10.0, "2024Q4": 3.0, "2024-11": 1.5, "2024-12": 2.0, "2024-12-raw": 7.0}"#,
        )
        .expect("flat payload should decode");
        let ProviderPayload::Flat(series) = payload else {
            panic!("expected flat payload");
        };
        assert_eq!(series.len(), 2);
        assert_eq!(series[&month("2024-12")], 2.0);
    }

    #[test]
    fn decode_unwraps_avg_mapping() {
        let payload = ProviderPayload::decode(
            br#"{"avg": {"2025-01": 4.5}, "levels": {"2025-01": [1, 2, 3]}, "quantile_0": {"2025-01": 0}}"#,
        )
        .expect("avg payload should decode");
        assert_eq!(
            payload.clone().into_series().get(&month("2025-01")),
            Some(&4.5)
        );
        assert!(matches!(payload, ProviderPayload::Averaged(_)));
    }

    #[test]
    fn decode_scalar_normalises_to_empty_series() {
        let payload = ProviderPayload::decode(b"12.5").expect("scalar should decode");
        assert_eq!(payload, ProviderPayload::Scalar(12.5));
        assert!(payload.into_series().is_empty());
    }

    #[test]
    fn decode_rejects_unexpected_shapes() {
        assert!(matches!(
            ProviderPayload::decode(b"[1, 2]"),
            Err(FetchCause::UnexpectedShape(_))
        ));
        assert!(matches!(
            ProviderPayload::decode(br#"{"2025-01": "high"}"#),
            Err(FetchCause::UnexpectedShape(_))
        ));
        assert!(matches!(
            ProviderPayload::decode(b"{not json"),
            Err(FetchCause::Json(_))
        ));
    }

    #[test]
    fn decompress_honours_declared_encoding_and_magic_bytes() {
        let body = r#"{"2025-01": 1.0}"#;
        let declared = decompress(gzip(body), Some("gzip")).expect("declared gzip inflates");
        assert_eq!(declared, body.as_bytes());

        let sniffed = decompress(gzip(body), None).expect("undeclared gzip inflates");
        assert_eq!(sniffed, body.as_bytes());

        let plain = decompress(body.as_bytes().to_vec(), None).expect("plain passes through");
        assert_eq!(plain, body.as_bytes());
    }

    #[test]
    fn decompress_passes_through_body_already_inflated_upstream() {
        let body = r#"{"2025-01": 1.0}"#;
        let inflated =
            decompress(body.as_bytes().to_vec(), Some("gzip")).expect("plain body passes through");
        assert_eq!(inflated, body.as_bytes());
    }

    #[test]
    fn decompress_reports_corrupt_gzip() {
        let mut corrupt = GZIP_MAGIC.to_vec();
        corrupt.extend_from_slice(b"not a deflate stream");
        let result = decompress(corrupt, None);
        assert!(matches!(result, Err(FetchCause::Decompress(_))));
    }
}
