pub mod metrics;
pub mod vector;

pub use metrics::{MetricFact, MetricRecord, MetricStore, Topic};
pub use vector::{IndexedFact, VectorIndex};
