//! Projection of tables into chart-ready series descriptions.
//!
//! Nothing here draws anything. A series carries its points by value along
//! with axis fields, tooltip fields and y-scale bounds so any renderer (or a
//! JSON consumer) can draw it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::pipeline::aggregate::Aggregation;
use crate::pipeline::types::Notice;
use crate::pipeline::utility::mean;

/// How rows that land on the same chart position are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Sum,
    Mean,
}

impl Reduction {
    fn reduce(self, values: &[f64]) -> Option<f64> {
        match self {
            Reduction::Sum if values.is_empty() => None,
            Reduction::Sum => Some(values.iter().sum()),
            Reduction::Mean => mean(values),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scale {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub field: String,
    pub title: Option<String>,
}

impl Tooltip {
    pub fn field(field: &str) -> Self {
        Self {
            field: field.to_string(),
            title: None,
        }
    }

    pub fn titled(field: &str, title: &str) -> Self {
        Self {
            field: field.to_string(),
            title: Some(title.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinePoint {
    pub series: Option<String>,
    pub x: NaiveDate,
    /// `None` renders as a gap.
    pub y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineSeries {
    pub title: String,
    pub x_field: String,
    pub y_field: String,
    pub y_title: Option<String>,
    /// Column that splits the points into separate lines.
    pub series_field: Option<String>,
    pub reduction: Reduction,
    pub tooltip: Vec<Tooltip>,
    pub scale: Scale,
    pub points: Vec<LinePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarPoint {
    pub category: String,
    pub y: f64,
    /// Number of table rows reduced into this bar.
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub title: String,
    pub x_field: String,
    pub y_field: String,
    pub reduction: Reduction,
    pub tooltip: Vec<Tooltip>,
    pub scale: Scale,
    pub bars: Vec<BarPoint>,
}

/// Result of projecting a table into a chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Projection<T> {
    Ready(T),
    /// No rows to plot.
    Empty,
    /// A comparison chart would show a single category.
    NonComparative { category: String },
}

impl<T> Projection<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Projection::Ready(series) => Some(series),
            _ => None,
        }
    }

    /// The notice the presentation layer should show instead of the chart.
    pub fn notice(&self, chart: &str) -> Option<Notice> {
        match self {
            Projection::NonComparative { category } => Some(Notice::NonComparativeSelection {
                chart: chart.to_string(),
                category: category.clone(),
            }),
            _ => None,
        }
    }
}

/// A metric over months, optionally one line per category.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRequest {
    pub metric: String,
    pub series_key: Option<String>,
    pub title: String,
    /// Combines rows sharing a (series, month) position.
    pub reduction: Reduction,
}

/// A metric compared across the values of a category column.
#[derive(Debug, Clone, PartialEq)]
pub struct BarRequest {
    pub category: String,
    pub metric: String,
    pub title: String,
    pub reduction: Reduction,
}

/// Projects `table` into a line series over the date column.
///
/// Points are grouped per series key and ordered by (key, month), so data
/// for several routes never zig-zags along one line. Rows with a missing
/// metric are skipped.
pub fn line_by_month(table: &Dataset, request: &LineRequest) -> Projection<LineSeries> {
    let schema = table.schema();
    let Some(metric) = schema.index_of(&request.metric) else {
        return Projection::Empty;
    };
    let key = request
        .series_key
        .as_deref()
        .and_then(|k| schema.index_of(k));

    let mut groups: BTreeMap<(Option<String>, NaiveDate), Vec<f64>> = BTreeMap::new();
    for row in table.rows() {
        let Some(y) = row.get(metric).as_number() else {
            continue;
        };
        let series = key.and_then(|k| row.get(k).as_text()).map(str::to_string);
        groups.entry((series, row.month())).or_default().push(y);
    }

    if groups.is_empty() {
        return Projection::Empty;
    }

    let points = groups
        .into_iter()
        .map(|((series, x), ys)| LinePoint {
            series,
            x,
            y: request.reduction.reduce(&ys),
        })
        .collect();

    let x_field = schema.date_column().name.clone();
    let mut tooltip = vec![Tooltip::field(&x_field)];
    if let Some(k) = &request.series_key {
        tooltip.push(Tooltip::field(k));
    }
    tooltip.push(Tooltip::field(&request.metric));

    Projection::Ready(LineSeries {
        title: request.title.clone(),
        x_field,
        y_field: request.metric.clone(),
        y_title: None,
        series_field: request.series_key.clone(),
        reduction: request.reduction,
        tooltip,
        scale: Scale::default(),
        points,
    })
}

/// Projects `table` into one bar per category value, sorted ascending.
///
/// Fewer than two categories yield [`Projection::Empty`] or
/// [`Projection::NonComparative`] instead of a chart.
pub fn bar_by_category(table: &Dataset, request: &BarRequest) -> Projection<BarSeries> {
    let schema = table.schema();
    let (Some(category), Some(metric)) = (
        schema.index_of(&request.category),
        schema.index_of(&request.metric),
    ) else {
        return Projection::Empty;
    };

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in table.rows() {
        let (Some(c), Some(y)) = (row.get(category).as_text(), row.get(metric).as_number()) else {
            continue;
        };
        groups.entry(c.to_string()).or_default().push(y);
    }

    match groups.len() {
        0 => return Projection::Empty,
        1 => {
            let category = groups.into_keys().next().unwrap_or_default();
            return Projection::NonComparative { category };
        }
        _ => {}
    }

    let bars = groups
        .into_iter()
        .filter_map(|(category, ys)| {
            request.reduction.reduce(&ys).map(|y| BarPoint {
                category,
                y,
                rows: ys.len(),
            })
        })
        .collect();

    Projection::Ready(BarSeries {
        title: request.title.clone(),
        x_field: request.category.clone(),
        y_field: request.metric.clone(),
        reduction: request.reduction,
        tooltip: vec![
            Tooltip::field(&request.category),
            Tooltip::field(&request.metric),
        ],
        scale: Scale {
            min: Some(0.0),
            max: None,
        },
        bars,
    })
}

/// Projects monthly aggregates into a single line anchored at zero, with the
/// aggregation's headroom bound as the ceiling. Undefined months stay as gaps.
pub fn line_from_aggregation(
    aggregation: &Aggregation,
    title: &str,
    x_field: &str,
    y_field: &str,
    y_title: &str,
) -> Projection<LineSeries> {
    if aggregation.rows.is_empty() {
        return Projection::Empty;
    }

    let points = aggregation
        .rows
        .iter()
        .map(|r| LinePoint {
            series: None,
            x: r.month,
            y: r.ratio,
        })
        .collect();

    Projection::Ready(LineSeries {
        title: title.to_string(),
        x_field: x_field.to_string(),
        y_field: y_field.to_string(),
        y_title: Some(y_title.to_string()),
        series_field: None,
        reduction: Reduction::Sum,
        tooltip: vec![Tooltip::field(x_field), Tooltip::titled(y_field, y_title)],
        scale: Scale {
            min: Some(0.0),
            max: aggregation.scale_max,
        },
        points,
    })
}
