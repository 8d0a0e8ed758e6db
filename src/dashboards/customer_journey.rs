//! Customer journey dashboard: narrow by date, trip type, period, borough
//! and route, pick a metric and its range, then compare routes over time and
//! boroughs side by side.

use chrono::NaiveDate;
use tracing::info;

use crate::catalog::DatasetId;
use crate::dashboards::DashboardView;
use crate::dataset::Dataset;
use crate::pipeline::chart::{
    BarRequest, LineRequest, Projection, Reduction, bar_by_category, line_by_month,
};
use crate::pipeline::filter::{METRIC_DIMENSION, apply_filters};
use crate::pipeline::types::{Applied, FilterSpec, MetricRange, RangeRequest, Selection};

pub const TRIP_TYPE: &str = "trip_type";
pub const PERIOD: &str = "period";
pub const BOROUGH: &str = "borough";
pub const ROUTE: &str = "route_id";
pub const DEFAULT_BAR_TITLE: &str = "Number of customers by borough";

/// Widget state for the customer journey dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneySelection {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub trip_type: Option<String>,
    pub period: Option<String>,
    pub boroughs: Option<Vec<String>>,
    pub routes: Option<Vec<String>>,
    pub metric: Option<String>,
    pub metric_min: Option<f64>,
    pub metric_max: Option<f64>,
    pub bar_title: String,
    /// How routes sharing a borough are combined in the bar chart.
    pub bar_reduction: Reduction,
}

impl Default for JourneySelection {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            trip_type: None,
            period: None,
            boroughs: None,
            routes: None,
            metric: None,
            metric_min: None,
            metric_max: None,
            bar_title: DEFAULT_BAR_TITLE.to_string(),
            bar_reduction: Reduction::Sum,
        }
    }
}

impl JourneySelection {
    /// Date → trip type → period → borough → route → metric range.
    ///
    /// Defaults: first trip type, second period, first borough, first two
    /// routes, first numeric column over its full range.
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .dates(RangeRequest {
                low: self.start,
                high: self.end,
            })
            .categorical(
                TRIP_TYPE,
                Selection::Equals {
                    value: self.trip_type.clone(),
                    default_index: 0,
                },
            )
            .categorical(
                PERIOD,
                Selection::Equals {
                    value: self.period.clone(),
                    default_index: 1,
                },
            )
            .categorical(
                BOROUGH,
                Selection::OneOf {
                    values: self.boroughs.clone(),
                    default_count: 1,
                },
            )
            .categorical(
                ROUTE,
                Selection::OneOf {
                    values: self.routes.clone(),
                    default_count: 2,
                },
            )
            .metric(MetricRange {
                column: self.metric.clone(),
                range: RangeRequest {
                    low: self.metric_min,
                    high: self.metric_max,
                },
            })
    }
}

#[tracing::instrument(skip_all, fields(metric = ?selection.metric))]
pub fn run(dataset: &Dataset, selection: &JourneySelection) -> DashboardView {
    let filtered = apply_filters(dataset, &selection.filter_spec());
    let mut notices = filtered.notices.clone();

    let metric = match filtered.stage(METRIC_DIMENSION).map(|s| &s.applied) {
        Some(Applied::Metric {
            column: Some(column),
            ..
        }) => Some(column.clone()),
        _ => None,
    };

    let (line, bar) = match &metric {
        Some(metric) => {
            let line = line_by_month(
                &filtered.table,
                &LineRequest {
                    metric: metric.clone(),
                    series_key: Some(ROUTE.to_string()),
                    title: format!("{metric} by month"),
                    reduction: Reduction::Mean,
                },
            );
            let bar = bar_by_category(
                &filtered.table,
                &BarRequest {
                    category: BOROUGH.to_string(),
                    metric: metric.clone(),
                    title: selection.bar_title.clone(),
                    reduction: selection.bar_reduction,
                },
            );
            (line, bar)
        }
        None => (Projection::Empty, Projection::Empty),
    };

    notices.extend(bar.notice("bar"));

    info!(
        rows = filtered.table.len(),
        notices = notices.len(),
        "Customer journey dashboard computed"
    );

    DashboardView {
        dataset: DatasetId::CustomerJourney.slug().to_string(),
        rows: filtered.table.len(),
        stages: filtered.stages,
        aggregated: Vec::new(),
        line,
        bar: Some(bar),
        notices,
        table: filtered.table,
    }
}
