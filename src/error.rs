use thiserror::Error;

/// Why a single metric fetch failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchCause {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {0}")]
    Status(u16),

    #[error("gzip decode failed: {0}")]
    Decompress(String),

    #[error("malformed json: {0}")]
    Json(String),

    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),
}

#[derive(Error, Debug)]
pub enum PotentialError {
    #[error("invalid repo format (expected owner/name): {0}")]
    InvalidRepoFormat(String),

    #[error("invalid month token (expected YYYY-MM): {0}")]
    InvalidMonth(String),

    #[error("fetch failed for {metric} of {repo}: {cause}")]
    FetchFailed {
        metric: String,
        repo: String,
        cause: FetchCause,
    },

    #[error("degenerate batch: {0}")]
    DegenerateBatch(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("config parse error: {0}")]
    ConfigParse(String),

    #[error("commentary unavailable: {0}")]
    Commentary(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PotentialError {
    pub fn fetch_failed(repo: &str, metric: &str, cause: FetchCause) -> Self {
        Self::FetchFailed {
            metric: metric.to_string(),
            repo: repo.to_string(),
            cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, PotentialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_failure_message_names_metric_repo_and_cause() {
        let err = PotentialError::fetch_failed("a/b", "openrank", FetchCause::Status(404));
        assert_eq!(
            err.to_string(),
            "fetch failed for openrank of a/b: provider returned status 404"
        );
        assert_eq!(
            FetchCause::Decompress("bad header".to_string()).to_string(),
            "gzip decode failed: bad header"
        );
    }
}
