//! Data types used by the filter, aggregate and chart stages.

use chrono::NaiveDate;
use serde::Serialize;

/// Closed interval `[low, high]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub low: T,
    pub high: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    pub fn new(low: T, high: T) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: T) -> bool {
        self.low <= value && value <= self.high
    }
}

impl<T> From<(T, T)> for Bounds<T> {
    fn from((low, high): (T, T)) -> Self {
        Self { low, high }
    }
}

/// A requested closed range. Each side left `None` defaults to the observed
/// bound of the table the stage runs on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeRequest<T> {
    pub low: Option<T>,
    pub high: Option<T>,
}

impl<T> Default for RangeRequest<T> {
    fn default() -> Self {
        Self {
            low: None,
            high: None,
        }
    }
}

impl<T> RangeRequest<T> {
    pub fn between(low: T, high: T) -> Self {
        Self {
            low: Some(low),
            high: Some(high),
        }
    }
}

/// How a categorical dimension is constrained.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Keep rows whose value equals the chosen one. `None` picks the option
    /// at `default_index`.
    Equals {
        value: Option<String>,
        default_index: usize,
    },
    /// Keep rows whose value is in the chosen set. `None` picks the first
    /// `default_count` options.
    OneOf {
        values: Option<Vec<String>>,
        default_count: usize,
    },
}

impl Selection {
    pub fn equals(value: Option<String>) -> Self {
        Selection::Equals {
            value,
            default_index: 0,
        }
    }

    pub fn one_of(values: Option<Vec<String>>) -> Self {
        Selection::OneOf {
            values,
            default_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalFilter {
    pub column: String,
    pub selection: Selection,
}

impl CategoricalFilter {
    pub fn new(column: impl Into<String>, selection: Selection) -> Self {
        Self {
            column: column.into(),
            selection,
        }
    }
}

/// Numeric range on one metric column. `column: None` picks the first
/// numeric column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricRange {
    pub column: Option<String>,
    pub range: RangeRequest<f64>,
}

/// Every constraint the user currently has active.
///
/// Stages run in a fixed order: date range, then each categorical filter in
/// the order listed, then the metric range. Each stage sees only the rows
/// that survived the stages before it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub date_range: RangeRequest<NaiveDate>,
    pub categorical: Vec<CategoricalFilter>,
    pub metric: Option<MetricRange>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = RangeRequest::between(start, end);
        self
    }

    pub fn dates(mut self, range: RangeRequest<NaiveDate>) -> Self {
        self.date_range = range;
        self
    }

    pub fn categorical(mut self, column: impl Into<String>, selection: Selection) -> Self {
        self.categorical.push(CategoricalFilter::new(column, selection));
        self
    }

    pub fn metric(mut self, range: MetricRange) -> Self {
        self.metric = Some(range);
        self
    }
}

/// The choices offered for one filter dimension, computed from the rows
/// that reached that stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptionSet {
    DateRange {
        bounds: Option<Bounds<NaiveDate>>,
    },
    Values {
        values: Vec<String>,
    },
    Metric {
        columns: Vec<String>,
        bounds: Option<Bounds<f64>>,
    },
}

/// What a stage actually filtered on after defaults and recovery.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Applied {
    DateRange {
        bounds: Option<Bounds<NaiveDate>>,
    },
    Values {
        values: Vec<String>,
    },
    Metric {
        column: Option<String>,
        bounds: Option<Bounds<f64>>,
    },
}

/// Option set and applied selection for one dimension, plus the row count
/// that survived it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub dimension: String,
    pub options: OptionSet,
    pub applied: Applied,
    pub rows_out: usize,
}

/// A condition the pipeline recovered from. Shown to the user, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A stage left no rows.
    EmptyResult { dimension: String },
    /// A ratio had a zero denominator.
    UndefinedMetric { month: NaiveDate, metric: String },
    /// A selection no longer matched the narrowed options and was reset.
    StaleSelection {
        dimension: String,
        requested: String,
        applied: String,
    },
    /// A range was given high-to-low and was swapped.
    ReversedRange {
        dimension: String,
        requested: String,
        applied: String,
    },
    /// An aggregate referenced a column the dataset does not have.
    MissingColumn { column: String },
    /// A comparison chart was requested for a single category.
    NonComparativeSelection { chart: String, category: String },
}

/// Output of [`apply_filters`](super::filter::apply_filters).
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub table: crate::dataset::Dataset,
    pub stages: Vec<StageReport>,
    pub notices: Vec<Notice>,
}

impl FilterOutcome {
    pub fn stage(&self, dimension: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.dimension == dimension)
    }

    /// The values a categorical stage actually kept.
    pub fn applied_values(&self, dimension: &str) -> &[String] {
        match self.stage(dimension).map(|s| &s.applied) {
            Some(Applied::Values { values }) => values,
            _ => &[],
        }
    }
}

/// One month of a grouped ratio metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub month: NaiveDate,
    pub numerator: f64,
    pub denominator: f64,
    /// `None` when `denominator` is zero.
    pub ratio: Option<f64>,
}
