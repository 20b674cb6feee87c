use std::collections::BTreeMap;

pub type Score = f64;

/// Feature name to value, e.g. `activity_trend -> 8.999991`.
pub type FeatureVector = BTreeMap<String, f64>;

/// Feature name to signed weight.
pub type WeightVector = BTreeMap<String, f64>;
