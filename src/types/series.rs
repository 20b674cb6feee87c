use crate::error::{PotentialError, Result};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A calendar month, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PotentialError::InvalidMonth(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::from_date(Utc::now().date_naive())
    }

    /// Shift by a signed number of months, carrying across year boundaries.
    pub fn offset(self, delta: i32) -> Self {
        let index = self.year * 12 + (self.month as i32 - 1) + delta;
        Self {
            year: index.div_euclid(12),
            month: index.rem_euclid(12) as u32 + 1,
        }
    }

    pub fn pred(self) -> Self {
        self.offset(-1)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = PotentialError;

    fn from_str(token: &str) -> Result<Self> {
        let invalid = || PotentialError::InvalidMonth(token.to_string());
        let (year, month) = token.trim().split_once('-').ok_or_else(invalid)?;
        let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if year.len() != 4 || !all_digits(year) || month.len() > 2 || !all_digits(month) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Month-keyed values for one metric of one repository. Sparse by nature.
pub type MetricSeries = BTreeMap<Month, f64>;

/// The metric vocabulary published by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    Activity,
    Openrank,
    Participants,
    Contributors,
    NewContributors,
    InactiveContributors,
    BusFactor,
    Stars,
    TechnicalFork,
    Attention,
    IssuesNew,
    IssuesClosed,
    IssueResponseTime,
    IssueResolutionDuration,
    ChangeRequests,
    ChangeRequestsAccepted,
    ChangeRequestResponseTime,
    ChangeRequestResolutionDuration,
}

impl Metric {
    pub const ALL: [Metric; 18] = [
        Metric::Activity,
        Metric::Openrank,
        Metric::Participants,
        Metric::Contributors,
        Metric::NewContributors,
        Metric::InactiveContributors,
        Metric::BusFactor,
        Metric::Stars,
        Metric::TechnicalFork,
        Metric::Attention,
        Metric::IssuesNew,
        Metric::IssuesClosed,
        Metric::IssueResponseTime,
        Metric::IssueResolutionDuration,
        Metric::ChangeRequests,
        Metric::ChangeRequestsAccepted,
        Metric::ChangeRequestResponseTime,
        Metric::ChangeRequestResolutionDuration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Openrank => "openrank",
            Self::Participants => "participants",
            Self::Contributors => "contributors",
            Self::NewContributors => "new_contributors",
            Self::InactiveContributors => "inactive_contributors",
            Self::BusFactor => "bus_factor",
            Self::Stars => "stars",
            Self::TechnicalFork => "technical_fork",
            Self::Attention => "attention",
            Self::IssuesNew => "issues_new",
            Self::IssuesClosed => "issues_closed",
            Self::IssueResponseTime => "issue_response_time",
            Self::IssueResolutionDuration => "issue_resolution_duration",
            Self::ChangeRequests => "change_requests",
            Self::ChangeRequestsAccepted => "change_requests_accepted",
            Self::ChangeRequestResponseTime => "change_request_response_time",
            Self::ChangeRequestResolutionDuration => "change_request_resolution_duration",
        }
    }

    /// Metrics where a lower raw value is the favourable direction.
    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            Self::InactiveContributors
                | Self::IssueResponseTime
                | Self::IssueResolutionDuration
                | Self::ChangeRequestResponseTime
                | Self::ChangeRequestResolutionDuration
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = PotentialError;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|metric| metric.as_str() == name.trim())
            .ok_or_else(|| PotentialError::ConfigParse(format!("unknown metric: {name}")))
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A repository identifier of the exact shape `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok(Self {
                owner: owner.to_string(),
                name: name.to_string(),
            }),
            _ => Err(PotentialError::InvalidRepoFormat(raw.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = PotentialError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl Serialize for RepoId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RepoId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Per-metric values over a fixed run of consecutive months, oldest first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowedMetrics {
    pub months: Vec<Month>,
    pub values: BTreeMap<Metric, Vec<f64>>,
}

impl WindowedMetrics {
    pub fn new(months: Vec<Month>) -> Self {
        Self {
            months,
            values: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, metric: Metric, values: Vec<f64>) {
        self.values.insert(metric, values);
    }

    /// Values for `metric`; an absent metric reads as an empty sequence.
    pub fn get(&self, metric: Metric) -> &[f64] {
        self.values.get(&metric).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    /// The first `len` months of every metric.
    pub fn prefix(&self, len: usize) -> Self {
        let len = std::cmp::min(len, self.months.len());
        Self {
            months: self.months[..len].to_vec(),
            values: self
                .values
                .iter()
                .map(|(metric, values)| (*metric, values[..std::cmp::min(len, values.len())].to_vec()))
                .collect(),
        }
    }

    /// Mean of each metric over the window, rounded to two decimals.
    pub fn averages(&self) -> BTreeMap<Metric, f64> {
        self.values
            .iter()
            .map(|(metric, values)| {
                let mean = if values.is_empty() {
                    0.0
                } else {
                    values.iter().mean()
                };
                (*metric, (mean * 100.0).round() / 100.0)
            })
            .collect()
    }
}
