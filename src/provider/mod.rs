pub mod payload;
pub mod transport;

use crate::error::{FetchCause, PotentialError, Result};
use crate::types::series::{Metric, MetricSeries, RepoId};
use payload::{decompress, ProviderPayload};
use std::collections::BTreeMap;
use tracing::debug;
use transport::Transport;

pub const DEFAULT_BASE_URL: &str = "https://oss.open-digger.cn/github";

/// Fetches metric documents for one repository at a time. Every call goes to
/// the transport; nothing is cached.
pub struct MetricsClient<T: Transport> {
    base_url: String,
    transport: T,
}

impl<T: Transport> MetricsClient<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
        }
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn metric_url(&self, repo: &RepoId, metric: Metric) -> String {
        format!(
            "{}/{}/{}/{}.json",
            self.base_url,
            repo.owner(),
            repo.name(),
            metric.as_str()
        )
    }

    /// Validate `repo` and fetch one metric series.
    pub fn fetch(&self, repo: &str, metric: Metric) -> Result<MetricSeries> {
        let repo = RepoId::parse(repo)?;
        self.fetch_series(&repo, metric)
    }

    pub fn fetch_series(&self, repo: &RepoId, metric: Metric) -> Result<MetricSeries> {
        self.fetch_payload(repo, metric).map(ProviderPayload::into_series)
    }

    pub fn fetch_payload(&self, repo: &RepoId, metric: Metric) -> Result<ProviderPayload> {
        let url = self.metric_url(repo, metric);
        debug!(%url, "fetching metric");
        let failed = |cause: FetchCause| PotentialError::fetch_failed(&repo.to_string(), metric.as_str(), cause);

        let response = self.transport.get(&url).map_err(failed)?;
        if response.status != 200 {
            return Err(failed(FetchCause::Status(response.status)));
        }
        let body = decompress(response.body, response.content_encoding.as_deref()).map_err(failed)?;
        ProviderPayload::decode(&body).map_err(failed)
    }

    /// Fetch every metric, stopping at the first failure so a repository is
    /// never returned with a partial set.
    pub fn fetch_all(&self, repo: &RepoId, metrics: &[Metric]) -> Result<BTreeMap<Metric, MetricSeries>> {
        let mut collected = BTreeMap::new();
        for metric in metrics {
            collected.insert(*metric, self.fetch_series(repo, *metric)?);
        }
        Ok(collected)
    }
}
