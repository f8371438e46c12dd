//! Scalar KPIs over a filtered record set, plus per-group descriptive statistics.

use crate::aggregate::group_by;
use crate::filter::unique_values;
use crate::models::{DimValue, Dimension, EvaluationMode, MeasureSelector, Record, Reduction};
use crate::normalize::{clean_label, group_key};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// A KPI reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kpi {
    /// Sum of the measure; absent values add 0.
    Total { measure: MeasureSelector },
    /// Mean over the records whose measure is present.
    Mean { measure: MeasureSelector },
    Count,
    /// Records whose `dimension` contains `needle`, case-insensitively.
    CountMatching { dimension: Dimension, needle: String },
    /// Percentage of records whose `dimension` equals `value` (trimmed, case-insensitive).
    ShareEqual { dimension: Dimension, value: String },
    Min { measure: MeasureSelector },
    Max { measure: MeasureSelector },
    Range { measure: MeasureSelector },
    /// `label` of the record with the largest measure (first one on ties).
    ArgMax { measure: MeasureSelector, label: Dimension },
    ArgMin { measure: MeasureSelector, label: Dimension },
    /// Category of `dimension` with the largest aggregated measure.
    TopGroup {
        dimension: Dimension,
        measure: MeasureSelector,
        #[serde(default)]
        reduction: Reduction,
    },
    DistinctCount { dimension: Dimension },
    /// Total of the measure divided by the number of distinct `dimension` values.
    PerGroup { measure: MeasureSelector, dimension: Dimension },
}

impl Kpi {
    /// Resolve evaluation-mode placeholders in the KPI's measure.
    pub fn resolve(&self, mode: EvaluationMode) -> Kpi {
        let mut kpi = self.clone();
        match &mut kpi {
            Kpi::Total { measure }
            | Kpi::Mean { measure }
            | Kpi::Min { measure }
            | Kpi::Max { measure }
            | Kpi::Range { measure }
            | Kpi::ArgMax { measure, .. }
            | Kpi::ArgMin { measure, .. }
            | Kpi::TopGroup { measure, .. }
            | Kpi::PerGroup { measure, .. } => *measure = measure.resolve(mode),
            Kpi::Count
            | Kpi::CountMatching { .. }
            | Kpi::ShareEqual { .. }
            | Kpi::DistinctCount { .. } => {}
        }
        kpi
    }
}

/// Result of one KPI. `NoData` serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiValue {
    Number(f64),
    Label(String),
    Range { min: f64, max: f64 },
    NoData,
}

impl KpiValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            KpiValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            KpiValue::Label(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, KpiValue::NoData)
    }
}

/// Named KPIs, evaluated in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiSpec {
    pub kpis: Vec<(String, Kpi)>,
}

impl KpiSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: impl Into<String>, kpi: Kpi) -> Self {
        self.kpis.push((id.into(), kpi));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiEntry {
    pub id: String,
    pub value: KpiValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KpiResult {
    pub entries: Vec<KpiEntry>,
}

impl KpiResult {
    pub fn get(&self, id: &str) -> Option<&KpiValue> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.value)
    }
}

/// Evaluate every KPI of `spec` over `records`.
pub fn summarize<R: Borrow<Record>>(records: &[R], spec: &KpiSpec) -> KpiResult {
    KpiResult {
        entries: spec
            .kpis
            .iter()
            .map(|(id, kpi)| KpiEntry {
                id: id.clone(),
                value: evaluate(records, kpi),
            })
            .collect(),
    }
}

fn present_values<'a, R: Borrow<Record>>(
    records: &'a [R],
    measure: &'a MeasureSelector,
) -> impl Iterator<Item = f64> + 'a {
    records.iter().filter_map(move |r| {
        let record: &Record = r.borrow();
        measure.value(record)
    })
}

fn extremum<R: Borrow<Record>>(
    records: &[R],
    measure: &MeasureSelector,
    label: Dimension,
    largest: bool,
) -> KpiValue {
    let mut best: Option<(f64, &Record)> = None;
    for r in records {
        let record: &Record = r.borrow();
        let Some(v) = measure.value(record) else {
            continue;
        };
        let better = match best {
            None => true,
            Some((b, _)) if largest => v > b,
            Some((b, _)) => v < b,
        };
        if better {
            best = Some((v, record));
        }
    }
    best.and_then(|(_, record)| group_key(record, label))
        .map(|k| KpiValue::Label(k.to_string()))
        .unwrap_or(KpiValue::NoData)
}

/// Evaluate a single KPI. Every reduction returns [`KpiValue::NoData`] on empty input.
pub fn evaluate<R: Borrow<Record>>(records: &[R], kpi: &Kpi) -> KpiValue {
    if records.is_empty() {
        return KpiValue::NoData;
    }
    let n = records.len();
    match kpi {
        Kpi::Total { measure } => KpiValue::Number(
            records
                .iter()
                .map(|r| measure.sum_value(r.borrow()))
                .sum(),
        ),
        Kpi::Mean { measure } => {
            let (sum, count) =
                present_values(records, measure).fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                KpiValue::NoData
            } else {
                KpiValue::Number(sum / count as f64)
            }
        }
        Kpi::Count => KpiValue::Number(n as f64),
        Kpi::CountMatching { dimension, needle } => {
            let needle = needle.to_lowercase();
            let hits = records
                .iter()
                .filter(|r| {
                    let record: &Record = (*r).borrow();
                    record
                        .text(*dimension)
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
                })
                .count();
            KpiValue::Number(hits as f64)
        }
        Kpi::ShareEqual { dimension, value } => {
            let wanted = value.trim();
            let hits = records
                .iter()
                .filter(|r| {
                    let record: &Record = (*r).borrow();
                    record
                        .text(*dimension)
                        .and_then(|t| clean_label(*dimension, t))
                        .is_some_and(|t| t.eq_ignore_ascii_case(wanted))
                })
                .count();
            KpiValue::Number(hits as f64 / n as f64 * 100.0)
        }
        Kpi::Min { measure } => present_values(records, measure)
            .reduce(f64::min)
            .map_or(KpiValue::NoData, KpiValue::Number),
        Kpi::Max { measure } => present_values(records, measure)
            .reduce(f64::max)
            .map_or(KpiValue::NoData, KpiValue::Number),
        Kpi::Range { measure } => present_values(records, measure)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .map_or(KpiValue::NoData, |(min, max)| KpiValue::Range { min, max }),
        Kpi::ArgMax { measure, label } => extremum(records, measure, *label, true),
        Kpi::ArgMin { measure, label } => extremum(records, measure, *label, false),
        Kpi::TopGroup {
            dimension,
            measure,
            reduction,
        } => group_by(records, *dimension, *measure, *reduction)
            .buckets
            .into_iter()
            .reduce(|best, b| {
                if b.value > best.value || (b.value == best.value && b.key < best.key) {
                    b
                } else {
                    best
                }
            })
            .map_or(KpiValue::NoData, |b| KpiValue::Label(b.key.to_string())),
        Kpi::DistinctCount { dimension } => {
            KpiValue::Number(unique_values(records, *dimension).len() as f64)
        }
        Kpi::PerGroup { measure, dimension } => {
            let groups = unique_values(records, *dimension).len();
            if groups == 0 {
                return KpiValue::NoData;
            }
            let total: f64 = records
                .iter()
                .map(|r| measure.sum_value(r.borrow()))
                .sum();
            KpiValue::Number(total / groups as f64)
        }
    }
}

/// Summary statistics for a group.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub key: DimValue,
    pub count: usize,
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
}

/// Compute descriptive statistics of `measure` per category of `dimension`, ordered by key.
pub fn grouped_summary<R: Borrow<Record>>(
    records: &[R],
    dimension: Dimension,
    measure: MeasureSelector,
) -> Vec<Summary> {
    let mut groups: BTreeMap<DimValue, (Vec<f64>, usize)> = BTreeMap::new();
    for r in records {
        let record: &Record = r.borrow();
        let Some(key) = group_key(record, dimension) else {
            continue;
        };
        let entry = groups.entry(key).or_default();
        match measure.value(record) {
            Some(v) => entry.0.push(v),
            None => entry.1 += 1,
        }
    }

    let mut out = Vec::new();
    for (key, (mut vals, missing)) in groups {
        vals.sort_by(f64::total_cmp);
        let count = vals.len();
        let min = vals.first().copied();
        let max = vals.last().copied();
        let mean = if count > 0 {
            Some(vals.iter().sum::<f64>() / count as f64)
        } else {
            None
        };
        let median = if count == 0 {
            None
        } else if count % 2 == 1 {
            Some(vals[count / 2])
        } else {
            Some((vals[count / 2 - 1] + vals[count / 2]) / 2.0)
        };
        out.push(Summary {
            key,
            count,
            missing,
            min,
            max,
            mean,
            median,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Measure;

    fn rec(disease: &str, prevalence: Option<f64>) -> Record {
        let mut r = Record::new().with_text(Dimension::Disease, disease);
        r.prevalence = prevalence;
        r
    }

    #[test]
    fn summary_counts_missing_per_group() {
        let recs = vec![
            rec("Asthma", Some(3.0)),
            rec("Asthma", Some(1.0)),
            rec("Asthma", None),
            rec("Gout", None),
        ];
        let s = grouped_summary(
            &recs,
            Dimension::Disease,
            MeasureSelector::field(Measure::Prevalence),
        );
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].key, DimValue::from("Asthma"));
        assert_eq!(s[0].count, 2);
        assert_eq!(s[0].missing, 1);
        assert_eq!(s[0].median, Some(2.0));
        assert_eq!(s[1].count, 0);
        assert_eq!(s[1].mean, None);
    }

    #[test]
    fn mean_ignores_absent_measures() {
        let recs = vec![rec("A", Some(4.0)), rec("B", None), rec("C", Some(2.0))];
        let v = evaluate(
            &recs,
            &Kpi::Mean {
                measure: MeasureSelector::field(Measure::Prevalence),
            },
        );
        assert_eq!(v, KpiValue::Number(3.0));
    }
}
