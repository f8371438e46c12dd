//! Filter evaluation: conjunctive set-membership predicates over record dimensions,
//! plus derivation of the option lists the dropdowns are built from.

use crate::error::{EngineError, Result};
use crate::models::{DimValue, Dimension, FieldRef, Record};
use crate::normalize::clean_label;
use ahash::AHashSet;
use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// Admissible values of one dimension. Empty means "no constraint".
///
/// Labels are stored trimmed; years are stored as integers so membership tests never
/// allocate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueSet {
    years: AHashSet<i32>,
    labels: AHashSet<String>,
}

impl ValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; blank labels are ignored. Returns whether the set changed.
    pub fn insert(&mut self, value: DimValue) -> bool {
        match value {
            DimValue::Year(y) => self.years.insert(y),
            DimValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    false
                } else {
                    self.labels.insert(s.to_string())
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty() && self.labels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.years.len() + self.labels.len()
    }

    pub fn contains_field(&self, field: FieldRef<'_>) -> bool {
        match field {
            FieldRef::Year(y) => self.years.contains(&y),
            FieldRef::Text(s) => self.labels.contains(s),
        }
    }

    pub fn contains(&self, value: &DimValue) -> bool {
        match value {
            DimValue::Year(y) => self.years.contains(y),
            DimValue::Text(s) => self.labels.contains(s.trim()),
        }
    }

    /// Members in sorted order.
    pub fn values(&self) -> Vec<DimValue> {
        let mut out: Vec<DimValue> = self
            .years
            .iter()
            .copied()
            .map(DimValue::Year)
            .chain(self.labels.iter().cloned().map(DimValue::Text))
            .collect();
        out.sort();
        out
    }

    /// Text members in sorted order (years rendered as text).
    pub fn labels(&self) -> Vec<String> {
        self.values().iter().map(|v| v.to_string()).collect()
    }
}

impl FromIterator<DimValue> for ValueSet {
    fn from_iter<I: IntoIterator<Item = DimValue>>(iter: I) -> Self {
        let mut set = ValueSet::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

/// Mapping from dimension to its admissible values, applied conjunctively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    constraints: BTreeMap<Dimension, ValueSet>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: constrain `dimension` to `values` (replacing any previous constraint).
    ///
    /// Values are converted with [`DimValue::for_dimension`]; unlike [`insert_raw`]
    /// this does not fail, so text that is not a year never matches on `year`.
    ///
    /// [`insert_raw`]: FilterSpec::insert_raw
    pub fn with<I, V>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DimValue>,
    {
        let set: ValueSet = values
            .into_iter()
            .map(|v| Into::<DimValue>::into(v).for_dimension(dimension))
            .collect();
        self.set(dimension, set);
        self
    }

    pub fn set(&mut self, dimension: Dimension, values: ValueSet) {
        self.constraints.insert(dimension, values);
    }

    pub fn clear(&mut self, dimension: Dimension) {
        self.constraints.remove(&dimension);
    }

    /// Add a raw textual value, parsing it as an integer for `year`.
    pub fn insert_raw(&mut self, dimension: Dimension, raw: &str) -> Result<()> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(());
        }
        let value = if dimension.is_temporal() {
            raw.parse::<i32>()
                .map(DimValue::Year)
                .map_err(|_| EngineError::InvalidFilterValue {
                    dimension,
                    value: raw.to_string(),
                })?
        } else {
            DimValue::Text(raw.to_string())
        };
        self.constraints.entry(dimension).or_default().insert(value);
        Ok(())
    }

    /// Build a spec from `(dimension name, values)` pairs, rejecting unknown names.
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut spec = FilterSpec::new();
        for (name, values) in pairs {
            let dimension: Dimension = name.as_ref().parse()?;
            spec.constraints.entry(dimension).or_default();
            for v in values {
                spec.insert_raw(dimension, v.as_ref())?;
            }
        }
        Ok(spec)
    }

    /// Parse a command-line clause such as `region=Europe,Asia` or `year=2024`.
    pub fn parse_clause(&mut self, clause: &str) -> Result<()> {
        let (name, values) = clause
            .split_once('=')
            .ok_or_else(|| EngineError::MalformedClause(clause.to_string()))?;
        let dimension: Dimension = name.parse()?;
        self.constraints.entry(dimension).or_default();
        for v in values.split([',', ';']) {
            self.insert_raw(dimension, v)?;
        }
        Ok(())
    }

    pub fn get(&self, dimension: Dimension) -> Option<&ValueSet> {
        self.constraints.get(&dimension)
    }

    /// Selected values of a dimension, sorted; empty when unconstrained.
    pub fn selected(&self, dimension: Dimension) -> Vec<DimValue> {
        self.get(dimension).map(ValueSet::values).unwrap_or_default()
    }

    /// Constraints that actually restrict rows (non-empty sets).
    pub fn active(&self) -> impl Iterator<Item = (Dimension, &ValueSet)> {
        self.constraints
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(d, set)| (*d, set))
    }

    /// Every dimension named by the filter, constrained or not.
    pub fn dimensions(&self) -> impl Iterator<Item = Dimension> + '_ {
        self.constraints.keys().copied()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.active().next().is_none()
    }

    /// Fail if the filter names a dimension outside `allowed`.
    pub fn restrict_to(&self, allowed: &[Dimension]) -> Result<()> {
        match self.dimensions().find(|d| !allowed.contains(d)) {
            Some(d) => Err(EngineError::DimensionNotFilterable(d)),
            None => Ok(()),
        }
    }

    /// Whether `record` satisfies every non-empty constraint.
    pub fn matches(&self, record: &Record) -> bool {
        self.active().all(|(dimension, set)| {
            match record.field(dimension) {
                Some(FieldRef::Year(y)) => set.contains_field(FieldRef::Year(y)),
                Some(FieldRef::Text(raw)) => clean_label(dimension, raw)
                    .is_some_and(|label| set.contains_field(FieldRef::Text(label))),
                None => false,
            }
        })
    }
}

/// Keep the records that satisfy `spec`, preserving order. The input is untouched; an
/// unconstrained spec returns a copy of every record.
pub fn apply_filters<R>(records: &[R], spec: &FilterSpec) -> Vec<R>
where
    R: Borrow<Record> + Clone,
{
    if spec.is_unconstrained() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| {
            let record: &Record = (*r).borrow();
            spec.matches(record)
        })
        .cloned()
        .collect()
}

/// Distinct valid values of `dimension`: trimmed, placeholders dropped, sorted
/// (numerically for `year`, lexicographically otherwise).
pub fn unique_values<R: Borrow<Record>>(records: &[R], dimension: Dimension) -> Vec<DimValue> {
    let mut seen: BTreeSet<DimValue> = BTreeSet::new();
    for r in records {
        let record: &Record = r.borrow();
        match record.field(dimension) {
            Some(FieldRef::Year(y)) => {
                seen.insert(DimValue::Year(y));
            }
            Some(FieldRef::Text(raw)) => {
                if let Some(label) = clean_label(dimension, raw) {
                    seen.insert(DimValue::Text(label.to_string()));
                }
            }
            None => {}
        }
    }
    seen.into_iter().collect()
}

/// Options of `child` among records whose `parent` value is selected; all records count
/// when nothing is selected. Drives dropdowns such as channel-by-channel-type.
pub fn dependent_options<R: Borrow<Record>>(
    records: &[R],
    parent: Dimension,
    selected: &ValueSet,
    child: Dimension,
) -> Vec<DimValue> {
    if selected.is_empty() {
        return unique_values(records, child);
    }
    let scoped = FilterSpec::new().with(parent, selected.values());
    let subset: Vec<&Record> = records
        .iter()
        .map(|r| -> &Record { r.borrow() })
        .filter(|r| scoped.matches(r))
        .collect();
    unique_values(&subset, child)
}

/// Stable sort of a record table by the raw text of `dimension` (years numerically).
/// Records without the field sort first in ascending order.
pub fn sort_records<R: Borrow<Record>>(records: &mut [R], dimension: Dimension, descending: bool) {
    records.sort_by(|a, b| {
        let (a, b): (&Record, &Record) = (a.borrow(), b.borrow());
        let ord = match (a.field(dimension), b.field(dimension)) {
            (Some(FieldRef::Year(x)), Some(FieldRef::Year(y))) => x.cmp(&y),
            (Some(FieldRef::Text(x)), Some(FieldRef::Text(y))) => x.trim().cmp(y.trim()),
            (x, y) => x.is_some().cmp(&y.is_some()),
        };
        if descending { ord.reverse() } else { ord }
    });
}

/// One page of a record table; `page` is 1-based. Out-of-range pages are empty.
pub fn paginate<R>(records: &[R], page: usize, per_page: usize) -> &[R] {
    if page == 0 || per_page == 0 {
        return &[];
    }
    let start = (page - 1).saturating_mul(per_page).min(records.len());
    let end = start.saturating_add(per_page).min(records.len());
    &records[start..end]
}

/// Number of pages needed for `len` rows.
pub fn page_count(len: usize, per_page: usize) -> usize {
    if per_page == 0 { 0 } else { len.div_ceil(per_page) }
}

/// Option lists for several dimensions at once.
pub fn filter_options<R: Borrow<Record>>(
    records: &[R],
    dimensions: &[Dimension],
) -> BTreeMap<Dimension, Vec<DimValue>> {
    dimensions
        .iter()
        .map(|d| (*d, unique_values(records, *d)))
        .collect()
}
