use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dataset::{Dataset, Record};
use crate::pipeline::types::{AggregatedRow, Notice};
use crate::pipeline::utility::{max, ratio};

/// Headroom multiplier applied to the largest ratio when sizing a chart axis.
pub const SCALE_HEADROOM: f64 = 1.2;

/// Which columns are summed per month and what the resulting ratio is called.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSpec {
    pub numerator: String,
    pub denominator: String,
    pub output: String,
}

impl AggregateSpec {
    /// Monthly average speed: total miles over total operating hours.
    pub fn average_speed() -> Self {
        Self {
            numerator: "total_mileage".to_string(),
            denominator: "total_operating_time".to_string(),
            output: "average_speed".to_string(),
        }
    }
}

/// Monthly groups of a filtered table.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub metric: String,
    pub rows: Vec<AggregatedRow>,
    /// `max(ratio) * 1.2`; `None` when no month has a defined ratio.
    pub scale_max: Option<f64>,
    pub notices: Vec<Notice>,
}

/// Groups `table` by month and computes `sum(numerator) / sum(denominator)`
/// for each group.
///
/// Missing cells are skipped when summing. A month whose denominator sums to
/// zero gets `ratio: None` and an [`Notice::UndefinedMetric`]. If either
/// column is absent from the schema nothing is aggregated and a
/// [`Notice::MissingColumn`] is reported per absent column.
pub fn aggregate_monthly(table: &Dataset, spec: &AggregateSpec) -> Aggregation {
    let schema = table.schema();
    let (num, den) = match (
        schema.index_of(&spec.numerator),
        schema.index_of(&spec.denominator),
    ) {
        (Some(num), Some(den)) => (num, den),
        _ => {
            let notices: Vec<Notice> = [&spec.numerator, &spec.denominator]
                .into_iter()
                .filter(|c| schema.index_of(c).is_none())
                .map(|c| Notice::MissingColumn { column: c.clone() })
                .collect();
            warn!(?notices, "Aggregate columns not in schema");
            return Aggregation {
                metric: spec.output.clone(),
                rows: Vec::new(),
                scale_max: None,
                notices,
            };
        }
    };

    let cell = |row: &Record, index: usize| row.get(index).as_number().unwrap_or(0.0);

    let mut groups: BTreeMap<NaiveDate, (f64, f64)> = BTreeMap::new();
    for row in table.rows() {
        let entry = groups.entry(row.month()).or_default();
        entry.0 += cell(row, num);
        entry.1 += cell(row, den);
    }

    let mut notices = Vec::new();
    let rows: Vec<AggregatedRow> = groups
        .into_iter()
        .map(|(month, (numerator, denominator))| {
            let value = ratio(numerator, denominator);
            if value.is_none() {
                notices.push(Notice::UndefinedMetric {
                    month,
                    metric: spec.output.clone(),
                });
            }
            AggregatedRow {
                month,
                numerator,
                denominator,
                ratio: value,
            }
        })
        .collect();

    let largest = max(rows.iter().filter_map(|r| r.ratio));
    let scale_max = largest.map(|m| m * SCALE_HEADROOM);

    debug!(
        rows_in = table.len(),
        months = rows.len(),
        undefined = notices.len(),
        ?scale_max,
        "Monthly aggregation computed"
    );

    Aggregation {
        metric: spec.output.clone(),
        rows,
        scale_max,
        notices,
    }
}
