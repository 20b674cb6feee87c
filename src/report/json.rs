use serde::Serialize;

pub fn to_json<R: Serialize + ?Sized>(report: &R) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
