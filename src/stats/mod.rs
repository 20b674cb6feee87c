pub mod distribution;
pub mod linalg;
pub mod pca;
pub mod regression;
pub mod standardize;
