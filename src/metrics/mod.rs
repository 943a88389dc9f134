//! @ai:module:intent Classification of repeated runs and campaign statistics
//! @ai:module:layer application
//! @ai:module:public_api CombinedResult, RunOutcome, CampaignSummary, SummaryAggregator

pub mod combined;
pub mod summary;

pub use combined::{CombinedResult, RunOutcome};
pub use summary::{
    BenchmarkOutcome, CampaignSummary, ConfigurationStats, SummaryAggregator, SummaryAggregatorTrait,
};
