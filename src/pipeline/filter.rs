//! Sequential filter stages.
//!
//! Each stage computes its option set from the rows that survived the
//! previous stages, resolves the user's selection against it, and produces a
//! new table. Nothing is cached: narrowing an upstream stage changes every
//! downstream option set.

use std::fmt::Display;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::dataset::Dataset;
use crate::pipeline::types::{
    Applied, Bounds, CategoricalFilter, FilterOutcome, FilterSpec, MetricRange, Notice,
    OptionSet, RangeRequest, Selection, StageReport,
};

/// Dimension name reported for the metric range stage.
pub const METRIC_DIMENSION: &str = "metric";

/// Runs every stage of `spec` over `dataset` in order.
///
/// The input is never modified. Stale or reversed selections are corrected
/// and reported in [`FilterOutcome::notices`].
pub fn apply_filters(dataset: &Dataset, spec: &FilterSpec) -> FilterOutcome {
    let mut notices = Vec::new();
    let mut stages = Vec::new();

    let (mut table, report) = filter_dates(dataset, spec.date_range, &mut notices);
    push_stage(&mut stages, &mut notices, dataset.len(), report);

    for filter in &spec.categorical {
        let rows_in = table.len();
        let (next, report) = filter_category(&table, filter, &mut notices);
        push_stage(&mut stages, &mut notices, rows_in, report);
        table = next;
    }

    if let Some(metric) = &spec.metric {
        let rows_in = table.len();
        let (next, report) = filter_metric(&table, metric, &mut notices);
        push_stage(&mut stages, &mut notices, rows_in, report);
        table = next;
    }

    for notice in &notices {
        warn!(?notice, "Filter selection adjusted");
    }

    FilterOutcome {
        table,
        stages,
        notices,
    }
}

/// Selectable values for `column` in `table`, sorted ascending.
pub fn options_for(table: &Dataset, column: &str) -> Vec<String> {
    table.distinct_text(column)
}

fn push_stage(
    stages: &mut Vec<StageReport>,
    notices: &mut Vec<Notice>,
    rows_in: usize,
    report: StageReport,
) {
    debug!(
        dimension = %report.dimension,
        rows_in,
        rows_out = report.rows_out,
        "Filter stage applied"
    );
    if rows_in > 0 && report.rows_out == 0 {
        notices.push(Notice::EmptyResult {
            dimension: report.dimension.clone(),
        });
    }
    stages.push(report);
}

fn filter_dates(
    table: &Dataset,
    requested: RangeRequest<NaiveDate>,
    notices: &mut Vec<Notice>,
) -> (Dataset, StageReport) {
    let dimension = table.schema().date_column().name.clone();
    let observed = table.month_bounds().map(Bounds::from);
    let applied = resolve_range(&dimension, requested, observed, notices);

    let out = match applied {
        Some(b) => table.retain_where(|r| b.contains(r.month())),
        None => table.clone(),
    };

    let report = StageReport {
        dimension,
        options: OptionSet::DateRange { bounds: observed },
        applied: Applied::DateRange { bounds: applied },
        rows_out: out.len(),
    };
    (out, report)
}

fn filter_category(
    table: &Dataset,
    filter: &CategoricalFilter,
    notices: &mut Vec<Notice>,
) -> (Dataset, StageReport) {
    let options = options_for(table, &filter.column);
    let chosen = resolve_selection(&filter.column, &filter.selection, &options, notices);

    let out = match table.schema().index_of(&filter.column) {
        Some(i) => table.retain_where(|r| {
            r.get(i)
                .as_text()
                .is_some_and(|v| chosen.iter().any(|c| c == v))
        }),
        None => table.retain_where(|_| false),
    };

    let report = StageReport {
        dimension: filter.column.clone(),
        options: OptionSet::Values { values: options },
        applied: Applied::Values { values: chosen },
        rows_out: out.len(),
    };
    (out, report)
}

fn filter_metric(
    table: &Dataset,
    metric: &MetricRange,
    notices: &mut Vec<Notice>,
) -> (Dataset, StageReport) {
    let columns: Vec<String> = table
        .schema()
        .numeric_columns()
        .map(str::to_string)
        .collect();

    let column = match &metric.column {
        Some(c) if columns.contains(c) => Some(c.clone()),
        Some(c) => {
            let fallback = columns.first().cloned();
            if let Some(applied) = &fallback {
                notices.push(Notice::StaleSelection {
                    dimension: METRIC_DIMENSION.to_string(),
                    requested: c.clone(),
                    applied: applied.clone(),
                });
            }
            fallback
        }
        None => columns.first().cloned(),
    };

    let Some(column) = column else {
        let report = StageReport {
            dimension: METRIC_DIMENSION.to_string(),
            options: OptionSet::Metric {
                columns,
                bounds: None,
            },
            applied: Applied::Metric {
                column: None,
                bounds: None,
            },
            rows_out: table.len(),
        };
        return (table.clone(), report);
    };

    let observed = table.numeric_bounds(&column).map(Bounds::from);
    let applied = resolve_range(&column, metric.range, observed, notices);

    // rows with a missing metric never satisfy a range
    let out = match table.schema().index_of(&column) {
        Some(i) => table.retain_where(|r| {
            r.get(i)
                .as_number()
                .is_some_and(|v| applied.is_none_or(|b| b.contains(v)))
        }),
        None => table.retain_where(|_| false),
    };

    let report = StageReport {
        dimension: METRIC_DIMENSION.to_string(),
        options: OptionSet::Metric {
            columns,
            bounds: observed,
        },
        applied: Applied::Metric {
            column: Some(column),
            bounds: applied,
        },
        rows_out: out.len(),
    };
    (out, report)
}

/// Resolves a categorical selection against the narrowed option set.
fn resolve_selection(
    dimension: &str,
    selection: &Selection,
    options: &[String],
    notices: &mut Vec<Notice>,
) -> Vec<String> {
    match selection {
        Selection::Equals {
            value: None,
            default_index,
        } => {
            let index = (*default_index).min(options.len().saturating_sub(1));
            options.get(index).cloned().into_iter().collect()
        }
        Selection::Equals {
            value: Some(value), ..
        } => {
            if options.contains(value) || options.is_empty() {
                return options.iter().filter(|o| *o == value).cloned().collect();
            }
            let fallback = options[0].clone();
            notices.push(Notice::StaleSelection {
                dimension: dimension.to_string(),
                requested: value.clone(),
                applied: fallback.clone(),
            });
            vec![fallback]
        }
        Selection::OneOf {
            values: None,
            default_count,
        } => options.iter().take(*default_count).cloned().collect(),
        Selection::OneOf {
            values: Some(values),
            ..
        } => {
            let valid: Vec<String> = options
                .iter()
                .filter(|o| values.contains(o))
                .cloned()
                .collect();
            let has_stale = values.iter().any(|v| !options.contains(v));
            if !has_stale || options.is_empty() {
                return valid;
            }

            let applied = if valid.is_empty() {
                vec![options[0].clone()]
            } else {
                valid
            };
            notices.push(Notice::StaleSelection {
                dimension: dimension.to_string(),
                requested: values.join(", "),
                applied: applied.join(", "),
            });
            applied
        }
    }
}

/// Resolves a requested closed range against the observed one.
///
/// Open sides take the observed bound. Explicitly reversed bounds are
/// swapped. Bounds outside the observed range are clamped into it, or reset
/// to the full range if nothing is left.
fn resolve_range<T>(
    dimension: &str,
    requested: RangeRequest<T>,
    observed: Option<Bounds<T>>,
    notices: &mut Vec<Notice>,
) -> Option<Bounds<T>>
where
    T: PartialOrd + Copy + Display,
{
    let observed = observed?;
    let mut wanted = Bounds::new(
        requested.low.unwrap_or(observed.low),
        requested.high.unwrap_or(observed.high),
    );

    let both_given = requested.low.is_some() && requested.high.is_some();
    if both_given && wanted.low > wanted.high {
        let swapped = Bounds::new(wanted.high, wanted.low);
        notices.push(Notice::ReversedRange {
            dimension: dimension.to_string(),
            requested: describe(&wanted),
            applied: describe(&swapped),
        });
        wanted = swapped;
    }

    let low = if wanted.low > observed.low {
        wanted.low
    } else {
        observed.low
    };
    let high = if wanted.high < observed.high {
        wanted.high
    } else {
        observed.high
    };
    let clamped = Bounds::new(low, high);
    if clamped == wanted && clamped.low <= clamped.high {
        return Some(wanted);
    }

    let applied = if clamped.low <= clamped.high {
        clamped
    } else {
        observed
    };
    notices.push(Notice::StaleSelection {
        dimension: dimension.to_string(),
        requested: describe(&wanted),
        applied: describe(&applied),
    });
    Some(applied)
}

fn describe<T: Display>(b: &Bounds<T>) -> String {
    format!("{} to {}", b.low, b.high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::{month, speeds_row, speeds_schema};
    use crate::dataset::Value;

    fn sample() -> Dataset {
        let mut ds = Dataset::new(speeds_schema());
        speeds_row(&mut ds, month(2021, 1), "Bronx", "Bx1", 100.0, 10.0);
        speeds_row(&mut ds, month(2021, 1), "Queens", "Q1", 50.0, 5.0);
        speeds_row(&mut ds, month(2021, 2), "Bronx", "Bx2", 80.0, 8.0);
        speeds_row(&mut ds, month(2021, 3), "Queens", "Q2", 60.0, 0.0);
        speeds_row(&mut ds, month(2021, 3), "Brooklyn", "B1", 30.0, 3.0);
        ds
    }

    fn boroughs(ds: &Dataset) -> Vec<String> {
        ds.column("borough")
            .filter_map(Value::as_text)
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_empty_spec_keeps_all_rows_in_order() {
        let ds = sample();
        let out = apply_filters(&ds, &FilterSpec::new());
        assert_eq!(out.table, ds);
        assert!(out.notices.is_empty());
    }

    #[test]
    fn test_date_range_is_inclusive() {
        let ds = sample();
        let spec = FilterSpec::new().date_range(month(2021, 1), month(2021, 2));
        let out = apply_filters(&ds, &spec);

        assert_eq!(out.table.len(), 3);
        let rows = out.table.rows();
        assert!(rows.iter().all(|r| r.month() <= month(2021, 2)));
        assert!(out.notices.is_empty());
    }

    #[test]
    fn test_date_range_defaults_to_observed_bounds() {
        let out = apply_filters(&sample(), &FilterSpec::new());
        let stage = out.stage("month").unwrap();
        assert_eq!(
            stage.applied,
            Applied::DateRange {
                bounds: Some(Bounds::new(month(2021, 1), month(2021, 3)))
            }
        );
    }

    #[test]
    fn test_equality_keeps_only_selected_value() {
        let bronx = Selection::equals(Some("Bronx".into()));
        let spec = FilterSpec::new().categorical("borough", bronx);
        let out = apply_filters(&sample(), &spec);

        assert_eq!(boroughs(&out.table), vec!["Bronx", "Bronx"]);
    }

    #[test]
    fn test_option_sets_narrow_with_each_stage() {
        let spec = FilterSpec::new()
            .date_range(month(2021, 3), month(2021, 3))
            .categorical("borough", Selection::one_of(Some(vec!["Queens".into()])))
            .categorical("route_id", Selection::one_of(None));
        let out = apply_filters(&sample(), &spec);

        assert_eq!(
            out.stage("borough").unwrap().options,
            OptionSet::Values {
                values: vec!["Brooklyn".into(), "Queens".into()]
            }
        );
        assert_eq!(
            out.stage("route_id").unwrap().options,
            OptionSet::Values {
                values: vec!["Q2".into()]
            }
        );
    }

    #[test]
    fn test_unset_equality_uses_default_index() {
        let spec = FilterSpec::new().categorical(
            "borough",
            Selection::Equals {
                value: None,
                default_index: 1,
            },
        );
        let out = apply_filters(&sample(), &spec);
        assert_eq!(out.applied_values("borough"), ["Brooklyn".to_string()]);
    }

    #[test]
    fn test_default_index_is_clamped() {
        let spec = FilterSpec::new()
            .date_range(month(2021, 2), month(2021, 2))
            .categorical(
                "borough",
                Selection::Equals {
                    value: None,
                    default_index: 5,
                },
            );
        let out = apply_filters(&sample(), &spec);
        assert_eq!(out.applied_values("borough"), ["Bronx".to_string()]);
    }

    #[test]
    fn test_stale_equality_resets_to_first_option() {
        let spec = FilterSpec::new()
            .date_range(month(2021, 2), month(2021, 3))
            .categorical("borough", Selection::equals(Some("Staten Island".into())));
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.applied_values("borough"), ["Bronx".to_string()]);
        assert_eq!(
            out.notices,
            vec![Notice::StaleSelection {
                dimension: "borough".into(),
                requested: "Staten Island".into(),
                applied: "Bronx".into(),
            }]
        );
    }

    #[test]
    fn test_membership_drops_stale_values() {
        let spec = FilterSpec::new().categorical(
            "borough",
            Selection::one_of(Some(vec!["Queens".into(), "Manhattan".into()])),
        );
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.applied_values("borough"), ["Queens".to_string()]);
        assert!(matches!(
            out.notices.as_slice(),
            [Notice::StaleSelection { dimension, .. }] if dimension == "borough"
        ));
    }

    #[test]
    fn test_membership_explicitly_empty_yields_empty_result() {
        let none = Selection::one_of(Some(vec![]));
        let spec = FilterSpec::new().categorical("borough", none);
        let out = apply_filters(&sample(), &spec);

        assert!(out.table.is_empty());
        assert_eq!(
            out.notices,
            vec![Notice::EmptyResult {
                dimension: "borough".into()
            }]
        );
    }

    #[test]
    fn test_metric_range_defaults_to_first_numeric_column() {
        let spec = FilterSpec::new().metric(MetricRange::default());
        let out = apply_filters(&sample(), &spec);

        assert_eq!(
            out.stage(METRIC_DIMENSION).unwrap().applied,
            Applied::Metric {
                column: Some("total_mileage".into()),
                bounds: Some(Bounds::new(30.0, 100.0)),
            }
        );
        assert_eq!(out.table.len(), 5);
    }

    #[test]
    fn test_metric_range_is_inclusive() {
        let spec = FilterSpec::new().metric(MetricRange {
            column: Some("total_mileage".into()),
            range: RangeRequest::between(50.0, 80.0),
        });
        let out = apply_filters(&sample(), &spec);

        let kept: Vec<f64> = out
            .table
            .column("total_mileage")
            .filter_map(Value::as_number)
            .collect();
        assert_eq!(kept, vec![50.0, 80.0, 60.0]);
    }

    #[test]
    fn test_reversed_metric_range_is_swapped() {
        let spec = FilterSpec::new().metric(MetricRange {
            column: Some("total_mileage".into()),
            range: RangeRequest::between(100.0, 30.0),
        });
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.table.len(), 5);
        assert_eq!(
            out.notices,
            vec![Notice::ReversedRange {
                dimension: "total_mileage".into(),
                requested: "100 to 30".into(),
                applied: "30 to 100".into(),
            }]
        );
    }

    #[test]
    fn test_reversed_date_range_is_swapped() {
        let spec = FilterSpec::new().date_range(month(2021, 2), month(2021, 1));
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.table.len(), 3);
        assert!(matches!(out.notices[0], Notice::ReversedRange { .. }));
    }

    #[test]
    fn test_stale_bounds_are_clamped() {
        let spec = FilterSpec::new()
            .categorical("borough", Selection::equals(Some("Queens".into())))
            .metric(MetricRange {
                column: Some("total_mileage".into()),
                range: RangeRequest::between(10.0, 55.0),
            });
        let out = apply_filters(&sample(), &spec);

        assert_eq!(
            out.stage(METRIC_DIMENSION).unwrap().applied,
            Applied::Metric {
                column: Some("total_mileage".into()),
                bounds: Some(Bounds::new(50.0, 55.0)),
            }
        );
        assert_eq!(out.table.len(), 1);
        assert!(matches!(out.notices[0], Notice::StaleSelection { .. }));
    }

    #[test]
    fn test_disjoint_stale_bounds_reset_to_full_range() {
        let spec = FilterSpec::new().metric(MetricRange {
            column: Some("total_mileage".into()),
            range: RangeRequest::between(500.0, 900.0),
        });
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.table.len(), 5);
        assert_eq!(
            out.notices,
            vec![Notice::StaleSelection {
                dimension: "total_mileage".into(),
                requested: "500 to 900".into(),
                applied: "30 to 100".into(),
            }]
        );
    }

    #[test]
    fn test_open_side_takes_observed_bound() {
        let spec = FilterSpec::new().metric(MetricRange {
            column: Some("total_mileage".into()),
            range: RangeRequest {
                low: Some(60.0),
                high: None,
            },
        });
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.table.len(), 3);
        assert!(out.notices.is_empty());
    }

    #[test]
    fn test_one_sided_bound_past_observed_resets_without_swapping() {
        let spec = FilterSpec::new().metric(MetricRange {
            column: Some("total_mileage".into()),
            range: RangeRequest {
                low: Some(200.0),
                high: None,
            },
        });
        let out = apply_filters(&sample(), &spec);

        assert_eq!(out.table.len(), 5);
        assert!(matches!(
            out.notices.as_slice(),
            [Notice::StaleSelection { applied, .. }] if applied == "30 to 100"
        ));
    }

    #[test]
    fn test_unknown_metric_column_falls_back() {
        let spec = FilterSpec::new().metric(MetricRange {
            column: Some("borough".into()),
            range: RangeRequest::default(),
        });
        let out = apply_filters(&sample(), &spec);

        assert!(matches!(
            &out.notices[0],
            Notice::StaleSelection { applied, .. } if applied == "total_mileage"
        ));
    }

    #[test]
    fn test_empty_upstream_does_not_fail() {
        let spec = FilterSpec::new()
            .categorical("borough", Selection::one_of(Some(vec![])))
            .categorical("route_id", Selection::equals(Some("Bx1".into())))
            .metric(MetricRange {
                column: None,
                range: RangeRequest::between(1.0, 2.0),
            });
        let out = apply_filters(&sample(), &spec);

        assert!(out.table.is_empty());
        assert_eq!(
            out.stage("route_id").unwrap().options,
            OptionSet::Values { values: vec![] }
        );
        assert_eq!(
            out.stage(METRIC_DIMENSION).unwrap().options,
            OptionSet::Metric {
                columns: vec!["total_mileage".into(), "total_operating_time".into()],
                bounds: None,
            }
        );
        // only the stage that emptied the table is reported
        assert_eq!(out.notices.len(), 1);
    }

    #[test]
    fn test_filtering_is_idempotent_and_leaves_input_untouched() {
        let ds = sample();
        let before = ds.clone();
        let spec = FilterSpec::new()
            .categorical("borough", Selection::one_of(Some(vec!["Bronx".into(), "Queens".into()])))
            .metric(MetricRange {
                column: Some("total_operating_time".into()),
                range: RangeRequest::between(1.0, 9.0),
            });

        let first = apply_filters(&ds, &spec);
        let second = apply_filters(&ds, &spec);

        assert_eq!(first, second);
        assert_eq!(ds, before);
    }

    #[test]
    fn test_adding_constraints_never_grows_result() {
        let ds = sample();
        let loose = FilterSpec::new().date_range(month(2021, 1), month(2021, 3));
        let tight = loose
            .clone()
            .categorical("borough", Selection::one_of(Some(vec!["Bronx".into(), "Queens".into()])));
        let tighter = tight.clone().metric(MetricRange {
            column: Some("total_mileage".into()),
            range: RangeRequest::between(55.0, 100.0),
        });

        let a = apply_filters(&ds, &loose).table.len();
        let b = apply_filters(&ds, &tight).table.len();
        let c = apply_filters(&ds, &tighter).table.len();
        assert!(c <= b && b <= a);
        assert_eq!((a, b, c), (5, 4, 3));
    }

    #[test]
    fn test_result_rows_come_from_input_and_satisfy_constraints() {
        let ds = sample();
        let spec = FilterSpec::new()
            .date_range(month(2021, 1), month(2021, 2))
            .categorical("borough", Selection::equals(Some("Bronx".into())));
        let out = apply_filters(&ds, &spec);

        for row in out.table.rows() {
            assert!(ds.rows().contains(row));
            assert!(row.month() <= month(2021, 2));
            assert_eq!(row.get(1).as_text(), Some("Bronx"));
        }
    }
}
