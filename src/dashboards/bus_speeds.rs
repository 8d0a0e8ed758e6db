//! Bus speeds dashboard: pick a borough and a date range, see the monthly
//! average speed (total mileage over total operating time).

use chrono::NaiveDate;
use tracing::info;

use crate::catalog::DatasetId;
use crate::dashboards::DashboardView;
use crate::dataset::Dataset;
use crate::pipeline::aggregate::{AggregateSpec, aggregate_monthly};
use crate::pipeline::chart::line_from_aggregation;
use crate::pipeline::filter::apply_filters;
use crate::pipeline::types::{Applied, FilterSpec, RangeRequest, Selection};

pub const BOROUGH: &str = "borough";
pub const X_FIELD: &str = "Date";
pub const Y_FIELD: &str = "Average speed (mph)";
pub const Y_TITLE: &str = "Average Bus Speed (mph)";

/// Widget state for the bus speeds dashboard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BusSpeedsSelection {
    pub borough: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl BusSpeedsSelection {
    /// Date range first, then a single borough (first sorted one by default).
    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new()
            .dates(RangeRequest {
                low: self.start,
                high: self.end,
            })
            .categorical(BOROUGH, Selection::equals(self.borough.clone()))
    }
}

#[tracing::instrument(skip_all, fields(borough = ?selection.borough))]
pub fn run(dataset: &Dataset, selection: &BusSpeedsSelection) -> DashboardView {
    let filtered = apply_filters(dataset, &selection.filter_spec());
    let aggregation = aggregate_monthly(&filtered.table, &AggregateSpec::average_speed());

    let borough = filtered
        .applied_values(BOROUGH)
        .first()
        .cloned()
        .unwrap_or_default();
    let title = match filtered.stage("month").map(|s| &s.applied) {
        Some(Applied::DateRange {
            bounds: Some(bounds),
        }) => format!(
            "Average Bus Speed in {borough} from {} to {}",
            bounds.low, bounds.high
        ),
        _ => format!("Average Bus Speed in {borough}"),
    };

    let line = line_from_aggregation(&aggregation, &title, X_FIELD, Y_FIELD, Y_TITLE);

    let mut notices = filtered.notices;
    notices.extend(aggregation.notices);

    info!(
        rows = filtered.table.len(),
        months = aggregation.rows.len(),
        notices = notices.len(),
        "Bus speeds dashboard computed"
    );

    DashboardView {
        dataset: DatasetId::BusSpeeds.slug().to_string(),
        rows: filtered.table.len(),
        stages: filtered.stages,
        aggregated: aggregation.rows,
        line,
        bar: None,
        notices,
        table: filtered.table,
    }
}
