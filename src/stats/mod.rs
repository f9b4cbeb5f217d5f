pub mod aggregator;
pub mod models;
pub mod windows;

mod errors;

pub use aggregator::{
    bar_length, build_report, histogram_by_window, max_count, ranked_counts, top_active,
};
pub use errors::StatsError;
pub use models::{DailyReport, ReportSettings, WindowBucket, WindowHistogram};
pub use windows::{TimeWindow, UnmatchedPolicy, WindowSet, OTHER_LABEL};
