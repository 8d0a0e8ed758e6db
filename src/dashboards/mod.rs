//! The two dashboards, each an explicit pure function from a raw dataset and
//! the current widget state to everything the presentation layer shows.
//!
//! Both recompute from scratch on every call; there is no memoisation.

pub mod bus_speeds;
pub mod customer_journey;

use serde::Serialize;

use crate::dataset::Dataset;
use crate::pipeline::chart::{BarSeries, LineSeries, Projection};
use crate::pipeline::types::{AggregatedRow, Notice, StageReport};

/// Everything a dashboard run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub dataset: String,
    pub rows: usize,
    /// Option set and applied selection per filter dimension, in stage order.
    pub stages: Vec<StageReport>,
    /// Monthly aggregates; empty for dashboards that do not aggregate.
    pub aggregated: Vec<AggregatedRow>,
    pub line: Projection<LineSeries>,
    /// `None` for dashboards without a comparison chart.
    pub bar: Option<Projection<BarSeries>>,
    pub notices: Vec<Notice>,
    /// The filtered table, for display and CSV export.
    #[serde(skip)]
    pub table: Dataset,
}
