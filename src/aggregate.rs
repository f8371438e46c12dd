//! Grouping and reduction of an already filtered record set into chart-ready series.
//!
//! Every function here is total: empty input gives an empty series, and every
//! percentage is guarded against a zero denominator.
//!
//! Ordering rules shared by all outputs:
//! - a `year` axis is ascending;
//! - any other category axis is descending by aggregated value, ties broken by label.

use crate::models::{DimValue, Dimension, EvaluationMode, MeasureSelector, Record, Reduction};
use crate::normalize::{DEFAULT_LABEL_MAX_CHARS, category_key, group_key, truncate_label};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::{Borrow, Cow};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Running sum and number of contributing records.
#[derive(Debug, Clone, Copy, Default)]
struct Acc {
    sum: f64,
    count: usize,
}

impl Acc {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn reduce(&self, reduction: Reduction) -> f64 {
        match reduction {
            Reduction::Sum => self.sum,
            Reduction::Average if self.count == 0 => 0.0,
            Reduction::Average => self.sum / self.count as f64,
        }
    }
}

fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// One group of a single-key aggregation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// Untruncated grouping key.
    pub key: DimValue,
    /// Display label (possibly truncated).
    pub label: String,
    pub value: f64,
    /// Records whose measure contributed to `value`.
    pub count: usize,
}

/// Output of [`group_by`]: one bucket per category, in axis order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedSeries {
    pub dimension: Dimension,
    pub buckets: Vec<Bucket>,
}

impl GroupedSeries {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn get(&self, key: impl Into<DimValue>) -> Option<f64> {
        let key = key.into();
        self.buckets.iter().find(|b| b.key == key).map(|b| b.value)
    }

    /// Sum over all buckets.
    pub fn total(&self) -> f64 {
        self.buckets.iter().map(|b| b.value).sum()
    }

    /// Keep the first `n` buckets (the largest ones on an entity axis).
    pub fn top(mut self, n: usize) -> Self {
        self.buckets.truncate(n);
        self
    }

    /// Re-label buckets with display labels cut to `max_chars`.
    pub fn with_label_limit(mut self, max_chars: usize) -> Self {
        for b in &mut self.buckets {
            b.label = truncate_label(&b.key.to_string(), max_chars).into_owned();
        }
        self
    }

    /// Key → value, keyed by the untruncated label.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        self.buckets
            .iter()
            .map(|b| (b.key.to_string(), b.value))
            .collect()
    }
}

fn sort_buckets(dimension: Dimension, buckets: &mut [Bucket]) {
    if dimension.is_temporal() {
        buckets.sort_by(|a, b| a.key.cmp(&b.key));
    } else {
        buckets.sort_by(|a, b| cmp_f64_desc(a.value, b.value).then_with(|| a.key.cmp(&b.key)));
    }
}

/// Group records by `dimension` and reduce `selector` per group.
///
/// Records without a valid category for `dimension` are skipped. With
/// [`Reduction::Sum`] an absent measure adds 0; with [`Reduction::Average`] the mean is
/// taken over the group's records whose measure is present.
pub fn group_by<R: Borrow<Record>>(
    records: &[R],
    dimension: Dimension,
    selector: MeasureSelector,
    reduction: Reduction,
) -> GroupedSeries {
    let mut groups: AHashMap<DimValue, Acc> = AHashMap::new();
    for r in records {
        let record: &Record = r.borrow();
        let Some(key) = group_key(record, dimension) else {
            continue;
        };
        groups.entry(key).or_default().add(selector.value(record));
    }
    let mut buckets: Vec<Bucket> = groups
        .into_iter()
        .map(|(key, acc)| Bucket {
            label: truncate_label(&key.to_string(), DEFAULT_LABEL_MAX_CHARS).into_owned(),
            key,
            value: acc.reduce(reduction),
            count: acc.count,
        })
        .collect();
    sort_buckets(dimension, &mut buckets);
    GroupedSeries { dimension, buckets }
}

/// One slice of a part-of-whole breakdown (pie chart).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareSlice {
    pub key: DimValue,
    pub label: String,
    pub value: f64,
    /// Percentage of the grand total; 0 when the total is 0.
    pub percent: f64,
}

/// Summed `selector` per category of `dimension`, with each category's share of the total.
pub fn breakdown<R: Borrow<Record>>(
    records: &[R],
    dimension: Dimension,
    selector: MeasureSelector,
) -> Vec<ShareSlice> {
    let series = group_by(records, dimension, selector, Reduction::Sum);
    let total = series.total();
    series
        .buckets
        .into_iter()
        .map(|b| ShareSlice {
            percent: if total != 0.0 { b.value / total * 100.0 } else { 0.0 },
            key: b.key,
            label: b.label,
            value: b.value,
        })
        .collect()
}

/// Column selection of a pivot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ColumnSet {
    /// Every distinct valid value of the column dimension in the data.
    #[default]
    FromData,
    /// Exactly these values, sorted, whether or not they have data. Values are
    /// normalized like grouping keys; placeholders are dropped.
    Pinned(Vec<String>),
}

impl ColumnSet {
    /// `Pinned(values)` when `values` is non-empty, otherwise `FromData`.
    pub fn pinned_or_data<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.iter().any(|v| !v.trim().is_empty()) {
            ColumnSet::Pinned(values)
        } else {
            ColumnSet::FromData
        }
    }
}

/// One row of a pivot: a row key and one value per column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotRow {
    pub key: DimValue,
    pub values: Vec<f64>,
}

impl PivotRow {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Wide "row per period, column per segment" grid for grouped and stacked charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotTable {
    pub row_dimension: Dimension,
    pub column_dimension: Dimension,
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn cell(&self, row: impl Into<DimValue>, column: &str) -> Option<f64> {
        let row = row.into();
        let idx = self.column_index(column)?;
        self.rows
            .iter()
            .find(|r| r.key == row)
            .map(|r| r.values[idx])
    }

    pub fn column_total(&self, column: &str) -> f64 {
        match self.column_index(column) {
            Some(idx) => self.rows.iter().map(|r| r.values[idx]).sum(),
            None => 0.0,
        }
    }

    /// Drop columns that are zero in every row.
    pub fn prune_empty_columns(mut self) -> Self {
        let keep: Vec<bool> = (0..self.columns.len())
            .map(|idx| self.rows.iter().any(|r| r.values[idx] != 0.0))
            .collect();
        let mut flags = keep.iter();
        self.columns.retain(|_| *flags.next().unwrap_or(&false));
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.values.retain(|_| *flags.next().unwrap_or(&false));
        }
        self
    }

    /// Each cell as a percentage of its row total (0 for an all-zero row).
    pub fn row_percentages(&self) -> PivotTable {
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let total = r.total();
                PivotRow {
                    key: r.key.clone(),
                    values: r
                        .values
                        .iter()
                        .map(|v| if total != 0.0 { v / total * 100.0 } else { 0.0 })
                        .collect(),
                }
            })
            .collect();
        PivotTable {
            row_dimension: self.row_dimension,
            column_dimension: self.column_dimension,
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Plain objects such as `{"year": "2024", "Steel": 12.5, "Carbon Fiber": 3.0}`,
    /// the shape charting components consume.
    pub fn to_json_rows(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|r| {
                let mut obj = Map::new();
                obj.insert(
                    self.row_dimension.as_str().to_string(),
                    Value::String(r.key.to_string()),
                );
                for (col, v) in self.columns.iter().zip(&r.values) {
                    obj.insert(col.clone(), Value::from(*v));
                }
                Value::Object(obj)
            })
            .collect()
    }
}

/// Two-key aggregation: one row per distinct `rows` value (ascending), one column per
/// segment of `columns`, zero-filled where no record matches.
///
/// Records whose column key is not among the selected columns contribute nothing.
pub fn pivot<R: Borrow<Record>>(
    records: &[R],
    rows: Dimension,
    columns: Dimension,
    selector: MeasureSelector,
    reduction: Reduction,
    column_set: &ColumnSet,
) -> PivotTable {
    let mut row_keys: BTreeSet<DimValue> = BTreeSet::new();
    let mut data_columns: BTreeSet<String> = BTreeSet::new();
    let mut cells: AHashMap<(DimValue, String), Acc> = AHashMap::new();

    for r in records {
        let record: &Record = r.borrow();
        let Some(row) = group_key(record, rows) else {
            continue;
        };
        row_keys.insert(row.clone());
        let Some(col) = group_key(record, columns) else {
            continue;
        };
        let col = col.to_string();
        data_columns.insert(col.clone());
        cells
            .entry((row, col))
            .or_default()
            .add(selector.value(record));
    }

    let column_names: Vec<String> = match column_set {
        ColumnSet::FromData => data_columns.into_iter().collect(),
        ColumnSet::Pinned(values) => values
            .iter()
            .filter_map(|v| category_key(columns, v).map(Cow::into_owned))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let table_rows = row_keys
        .into_iter()
        .map(|key| {
            let values = column_names
                .iter()
                .map(|col| {
                    cells
                        .get(&(key.clone(), col.clone()))
                        .map(|acc| acc.reduce(reduction))
                        .unwrap_or(0.0)
                })
                .collect();
            PivotRow { key, values }
        })
        .collect();

    PivotTable {
        row_dimension: rows,
        column_dimension: columns,
        columns: column_names,
        rows: table_rows,
    }
}

/// [`pivot`] with summed values, minus columns that are zero in every row.
pub fn stacked_share<R: Borrow<Record>>(
    records: &[R],
    rows: Dimension,
    columns: Dimension,
    selector: MeasureSelector,
    column_set: &ColumnSet,
) -> PivotTable {
    pivot(records, rows, columns, selector, Reduction::Sum, column_set).prune_empty_columns()
}

/// Several measures side by side per category of `dimension` (e.g. prevalence and
/// incidence per year). Columns are the given names, in the given order.
pub fn measure_series<R: Borrow<Record>>(
    records: &[R],
    dimension: Dimension,
    measures: &[(String, MeasureSelector)],
    reduction: Reduction,
) -> PivotTable {
    let mut groups: BTreeMap<DimValue, Vec<Acc>> = BTreeMap::new();
    for r in records {
        let record: &Record = r.borrow();
        let Some(key) = group_key(record, dimension) else {
            continue;
        };
        let accs = groups
            .entry(key)
            .or_insert_with(|| vec![Acc::default(); measures.len()]);
        for (acc, (_, selector)) in accs.iter_mut().zip(measures) {
            acc.add(selector.value(record));
        }
    }
    let mut rows: Vec<PivotRow> = groups
        .into_iter()
        .map(|(key, accs)| PivotRow {
            key,
            values: accs.iter().map(|a| a.reduce(reduction)).collect(),
        })
        .collect();
    if !dimension.is_temporal() {
        rows.sort_by(|a, b| cmp_f64_desc(a.total(), b.total()).then_with(|| a.key.cmp(&b.key)));
    }
    PivotTable {
        row_dimension: dimension,
        column_dimension: dimension,
        columns: measures.iter().map(|(name, _)| name.clone()).collect(),
        rows,
    }
}

/// Which number a share row plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePlot {
    #[default]
    Percentage,
    Raw,
}

impl From<EvaluationMode> for SharePlot {
    /// Value mode plots shares; volume mode plots raw units.
    fn from(mode: EvaluationMode) -> Self {
        match mode {
            EvaluationMode::ByValue => SharePlot::Percentage,
            EvaluationMode::ByVolume => SharePlot::Raw,
        }
    }
}

/// A member's contribution to its group within one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareRow {
    pub period: DimValue,
    pub group: String,
    pub member: String,
    /// Raw aggregated value of the member.
    pub value: f64,
    /// `100 * value / group total` of the same period; 0 on a zero total.
    pub percentage: f64,
    /// `percentage` or `value`, per [`SharePlot`].
    pub plotted: f64,
    /// `"<period> - <group>"`, the category axis label.
    pub label: String,
}

/// Share of each `member` within its `group`, per `period`.
///
/// Rows are ordered by period, then group, then member (all ascending).
pub fn nested_share<R: Borrow<Record>>(
    records: &[R],
    period: Dimension,
    group: Dimension,
    member: Dimension,
    selector: MeasureSelector,
    plot: SharePlot,
) -> Vec<ShareRow> {
    let mut members: BTreeMap<(DimValue, String), BTreeMap<String, f64>> = BTreeMap::new();
    for r in records {
        let record: &Record = r.borrow();
        let (Some(p), Some(g), Some(m)) = (
            group_key(record, period),
            group_key(record, group),
            group_key(record, member),
        ) else {
            continue;
        };
        *members
            .entry((p, g.to_string()))
            .or_default()
            .entry(m.to_string())
            .or_default() += selector.sum_value(record);
    }

    let mut out = Vec::new();
    for ((p, g), by_member) in members {
        let total: f64 = by_member.values().sum();
        for (m, value) in by_member {
            let percentage = if total != 0.0 { value / total * 100.0 } else { 0.0 };
            out.push(ShareRow {
                label: format!("{} - {}", p, g),
                period: p.clone(),
                group: g.clone(),
                member: m,
                value,
                percentage,
                plotted: match plot {
                    SharePlot::Percentage => percentage,
                    SharePlot::Raw => value,
                },
            });
        }
    }
    out
}

/// Country shares within their region, per year, for the given evaluation mode.
pub fn region_country_share<R: Borrow<Record>>(
    records: &[R],
    mode: EvaluationMode,
) -> Vec<ShareRow> {
    nested_share(
        records,
        Dimension::Year,
        Dimension::Region,
        Dimension::Country,
        mode.selector(),
        mode.into(),
    )
}

/// One cell of a flattened cross tabulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossCell {
    pub outer: String,
    pub inner: String,
    pub value: f64,
}

/// Summed `selector` per (`outer`, `inner`) pair, flattened.
///
/// Outer groups are ordered by their total, descending; with `top_outer` only the
/// largest N outer groups are kept. Inner groups follow the same rule within each outer.
pub fn cross_tab<R: Borrow<Record>>(
    records: &[R],
    outer: Dimension,
    inner: Dimension,
    selector: MeasureSelector,
    top_outer: Option<usize>,
) -> Vec<CrossCell> {
    let mut matrix: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for r in records {
        let record: &Record = r.borrow();
        let (Some(o), Some(i)) = (group_key(record, outer), group_key(record, inner)) else {
            continue;
        };
        *matrix
            .entry(o.to_string())
            .or_default()
            .entry(i.to_string())
            .or_default() += selector.sum_value(record);
    }

    let mut outers: Vec<(String, f64, BTreeMap<String, f64>)> = matrix
        .into_iter()
        .map(|(o, inners)| {
            let total = inners.values().sum();
            (o, total, inners)
        })
        .collect();
    outers.sort_by(|a, b| cmp_f64_desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(n) = top_outer {
        outers.truncate(n);
    }

    let mut out = Vec::new();
    for (o, _, inners) in outers {
        let mut cells: Vec<(String, f64)> = inners.into_iter().collect();
        cells.sort_by(|a, b| cmp_f64_desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
        out.extend(cells.into_iter().map(|(i, value)| CrossCell {
            outer: o.clone(),
            inner: i,
            value,
        }));
    }
    out
}

/// A point of a scatter plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub label: Option<String>,
}

/// The first `limit` records that have both coordinates, as points labelled by
/// `label`.
pub fn scatter<R: Borrow<Record>>(
    records: &[R],
    x: MeasureSelector,
    y: MeasureSelector,
    label: Dimension,
    limit: usize,
) -> Vec<ScatterPoint> {
    records
        .iter()
        .filter_map(|r| {
            let record: &Record = r.borrow();
            Some(ScatterPoint {
                x: x.value(record)?,
                y: y.value(record)?,
                label: group_key(record, label).map(|k| k.to_string()),
            })
        })
        .take(limit)
        .collect()
}
