//! A dashboard session: one immutable record store evaluated against a page
//! configuration for whatever filter state the caller holds.

use crate::aggregate::{
    ColumnSet, CrossCell, GroupedSeries, PivotTable, ScatterPoint, ShareRow, ShareSlice,
    breakdown, cross_tab, group_by, measure_series, nested_share, pivot, scatter, stacked_share,
};
use crate::config::{
    ChartKind, ChartShape, ChartSpec, ColumnSource, DefaultRule, EngineConfig, Fallback,
    PageConfig,
};
use crate::error::Result;
use crate::filter::{FilterSpec, ValueSet, dependent_options, filter_options, unique_values};
use crate::models::{Dataset, DimValue, Dimension, EvaluationMode, Record};
use crate::normalize::{group_key, truncate_label};
use crate::stats::{KpiValue, summarize};
use log::{debug, trace};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Immutable, cheaply clonable record collection tagged with its domain.
#[derive(Debug, Clone)]
pub struct RecordStore {
    dataset: Dataset,
    records: Arc<[Record]>,
}

impl RecordStore {
    pub fn new(dataset: Dataset, records: Vec<Record>) -> Self {
        Self {
            dataset,
            records: records.into(),
        }
    }

    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Borrowed view of the records matching `spec`, in store order.
    pub fn select(&self, spec: &FilterSpec) -> Vec<&Record> {
        self.records.iter().filter(|r| spec.matches(r)).collect()
    }
}

/// What the user has selected: filter sets plus the evaluation switch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub spec: FilterSpec,
    pub evaluation: EvaluationMode,
}

impl FilterState {
    pub fn new(spec: FilterSpec, evaluation: EvaluationMode) -> Self {
        Self { spec, evaluation }
    }

    /// Initial state of `page`: its default rules applied to the options present in
    /// `store`; dimensions without a rule start unconstrained.
    pub fn with_defaults(store: &RecordStore, page: &PageConfig) -> Self {
        let mut spec = FilterSpec::new();
        for default in &page.defaults {
            let options = unique_values(store.records(), default.dimension);
            let chosen: ValueSet = default_selection(&options, &default.rule)
                .into_iter()
                .collect();
            debug!(
                "default selection for {}: {} of {} options",
                default.dimension,
                chosen.len(),
                options.len()
            );
            spec.set(default.dimension, chosen);
        }
        Self {
            spec,
            evaluation: EvaluationMode::default(),
        }
    }
}

/// Apply a default rule to the available options (sorted, as from [`unique_values`]).
pub fn default_selection(options: &[DimValue], rule: &DefaultRule) -> Vec<DimValue> {
    match rule {
        DefaultRule::All => options.to_vec(),
        DefaultRule::Prefer { values, fallback } => {
            let preferred: Vec<DimValue> = options
                .iter()
                .filter(|o| {
                    let text = o.to_string();
                    values.iter().any(|v| v.trim() == text)
                })
                .cloned()
                .collect();
            if !preferred.is_empty() {
                return preferred;
            }
            match *fallback {
                Fallback::Nothing => Vec::new(),
                Fallback::First(n) => options.iter().take(n).cloned().collect(),
                Fallback::Last(n) => options[options.len().saturating_sub(n)..].to_vec(),
            }
        }
    }
}

/// Output of one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChartData {
    Grouped(GroupedSeries),
    Breakdown(Vec<ShareSlice>),
    Pivot(PivotTable),
    Shares(Vec<ShareRow>),
    CrossTab(Vec<CrossCell>),
    Scatter(Vec<ScatterPoint>),
    /// The chart's scope value is not selected.
    Hidden,
}

impl ChartData {
    pub fn is_hidden(&self) -> bool {
        matches!(self, ChartData::Hidden)
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Grouped(s) => s.is_empty(),
            ChartData::Breakdown(v) => v.is_empty(),
            ChartData::Pivot(t) => t.is_empty() || t.columns.is_empty(),
            ChartData::Shares(v) => v.is_empty(),
            ChartData::CrossTab(v) => v.is_empty(),
            ChartData::Scatter(v) => v.is_empty(),
            ChartData::Hidden => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartOutput {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    pub data: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiOutput {
    pub id: String,
    pub title: String,
    pub value: KpiValue,
    /// Formatted for display.
    pub display: String,
}

/// Everything a page shows for one filter state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub page: String,
    pub dataset: Dataset,
    pub evaluation: EvaluationMode,
    pub axis_label: &'static str,
    pub total_records: usize,
    pub filtered_count: usize,
    /// Dropdown options per filter; dependent filters only list options compatible
    /// with their parent's selection.
    pub options: BTreeMap<Dimension, Vec<DimValue>>,
    pub charts: Vec<ChartOutput>,
    pub kpis: Vec<KpiOutput>,
}

impl Snapshot {
    pub fn chart(&self, id: &str) -> Option<&ChartOutput> {
        self.charts.iter().find(|c| c.id == id)
    }

    pub fn kpi(&self, id: &str) -> Option<&KpiOutput> {
        self.kpis.iter().find(|k| k.id == id)
    }
}

/// One page over one store. Recomputes on every new filter state and keeps the last
/// snapshot, keyed on (filter spec, evaluation mode).
#[derive(Debug)]
pub struct Dashboard {
    store: RecordStore,
    page: PageConfig,
    config: EngineConfig,
    cache: Option<(FilterState, Snapshot)>,
}

impl Dashboard {
    /// Validates the page before accepting it.
    pub fn new(store: RecordStore, page: PageConfig, config: EngineConfig) -> Result<Self> {
        page.validate()?;
        if store.dataset() != page.dataset {
            debug!(
                "page '{}' expects {} data, store holds {}",
                page.name,
                page.dataset,
                store.dataset()
            );
        }
        Ok(Self {
            store,
            page,
            config,
            cache: None,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn page(&self) -> &PageConfig {
        &self.page
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn default_state(&self) -> FilterState {
        FilterState::with_defaults(&self.store, &self.page)
    }

    /// Filtered records (owned), e.g. for export.
    pub fn filtered(&self, state: &FilterState) -> Result<Vec<Record>> {
        state.spec.restrict_to(&self.page.filters)?;
        Ok(self
            .store
            .select(&state.spec)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Dropdown options for `state`.
    pub fn options(&self, state: &FilterState) -> BTreeMap<Dimension, Vec<DimValue>> {
        let records = self.store.records();
        let mut options = filter_options(records, &self.page.filters);
        for dep in &self.page.dependent {
            let selected = state.spec.get(dep.parent).cloned().unwrap_or_default();
            options.insert(
                dep.child,
                dependent_options(records, dep.parent, &selected, dep.child),
            );
        }
        options
    }

    pub fn snapshot(&mut self, state: &FilterState) -> Result<&Snapshot> {
        let entry = match self.cache.take() {
            Some((cached, snap)) if cached == *state => {
                trace!("snapshot cache hit for page '{}'", self.page.name);
                (cached, snap)
            }
            _ => (state.clone(), self.compute(state)?),
        };
        Ok(&self.cache.insert(entry).1)
    }

    fn compute(&self, state: &FilterState) -> Result<Snapshot> {
        state.spec.restrict_to(&self.page.filters)?;
        let filtered = self.store.select(&state.spec);
        debug!(
            "page '{}': {} of {} records match, evaluation {:?}",
            self.page.name,
            filtered.len(),
            self.store.len(),
            state.evaluation
        );

        let charts = self
            .page
            .charts
            .iter()
            .map(|chart| ChartOutput {
                id: chart.id.clone(),
                title: chart.title.clone(),
                kind: chart.kind,
                data: render_chart(&filtered, chart, state, &self.config),
            })
            .collect();

        let formatter = self.config.formatter();
        let results = summarize(&filtered, &self.page.kpi_spec(state.evaluation));
        let kpis = self
            .page
            .kpis
            .iter()
            .zip(results.entries)
            .map(|(card, entry)| KpiOutput {
                id: card.id.clone(),
                title: card.title.clone(),
                display: formatter.format_kpi(&entry.value, card.format_for(state.evaluation)),
                value: entry.value,
            })
            .collect();

        Ok(Snapshot {
            page: self.page.name.clone(),
            dataset: self.store.dataset(),
            evaluation: state.evaluation,
            axis_label: state.evaluation.axis_label(),
            total_records: self.store.len(),
            filtered_count: filtered.len(),
            options: self.options(state),
            charts,
            kpis,
        })
    }
}

fn column_set(source: &ColumnSource, columns: Dimension, state: &FilterState) -> ColumnSet {
    match source {
        ColumnSource::Data => ColumnSet::FromData,
        ColumnSource::Filter => ColumnSet::pinned_or_data(
            state.spec.get(columns).map(ValueSet::labels).unwrap_or_default(),
        ),
        ColumnSource::Fixed(values) => ColumnSet::Pinned(values.clone()),
    }
}

/// Evaluate one chart over the already filtered records.
pub fn render_chart(
    records: &[&Record],
    chart: &ChartSpec,
    state: &FilterState,
    config: &EngineConfig,
) -> ChartData {
    let scoped: Vec<&Record>;
    let records = match &chart.within {
        Some(scope) => {
            let selected = state
                .spec
                .get(scope.dimension)
                .is_some_and(|set| set.contains(&scope.selection()));
            let Some(key) = scope.key().filter(|_| selected) else {
                return ChartData::Hidden;
            };
            scoped = records
                .iter()
                .copied()
                .filter(|r| group_key(r, scope.dimension).as_ref() == Some(&key))
                .collect();
            &scoped[..]
        }
        None => records,
    };
    let limit = chart.label_max_chars.unwrap_or(config.label_max_chars);
    let mode = state.evaluation;

    match &chart.shape {
        ChartShape::Grouped {
            dimension,
            measure,
            reduction,
            top,
        } => {
            let series = group_by(records, *dimension, measure.resolve(mode), *reduction)
                .with_label_limit(limit);
            ChartData::Grouped(match top {
                Some(n) => series.top(*n),
                None => series,
            })
        }
        ChartShape::Breakdown { dimension, measure } => ChartData::Breakdown(
            breakdown(records, *dimension, measure.resolve(mode))
                .into_iter()
                .map(|mut slice| {
                    slice.label = truncate_label(&slice.key.to_string(), limit).into_owned();
                    slice
                })
                .collect(),
        ),
        ChartShape::Pivot {
            rows,
            columns,
            measure,
            reduction,
            column_source,
        } => ChartData::Pivot(pivot(
            records,
            *rows,
            *columns,
            measure.resolve(mode),
            *reduction,
            &column_set(column_source, *columns, state),
        )),
        ChartShape::StackedShare {
            rows,
            columns,
            measure,
            column_source,
            percent,
        } => {
            let table = stacked_share(
                records,
                *rows,
                *columns,
                measure.resolve(mode),
                &column_set(column_source, *columns, state),
            );
            ChartData::Pivot(if *percent {
                table.row_percentages()
            } else {
                table
            })
        }
        ChartShape::NestedShare {
            period,
            group,
            member,
            measure,
            plot,
        } => ChartData::Shares(nested_share(
            records,
            *period,
            *group,
            *member,
            measure.resolve(mode),
            plot.unwrap_or(mode.into()),
        )),
        ChartShape::CrossTab {
            outer,
            inner,
            measure,
            top_outer,
        } => ChartData::CrossTab(cross_tab(
            records,
            *outer,
            *inner,
            measure.resolve(mode),
            *top_outer,
        )),
        ChartShape::Scatter {
            x,
            y,
            label,
            limit: points,
        } => ChartData::Scatter(scatter(
            records,
            x.resolve(mode),
            y.resolve(mode),
            *label,
            *points,
        )),
        ChartShape::Series {
            dimension,
            measures,
            reduction,
        } => {
            let resolved: Vec<_> = measures
                .iter()
                .map(|(name, m)| (name.clone(), m.resolve(mode)))
                .collect();
            ChartData::Pivot(measure_series(records, *dimension, &resolved, *reduction))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn years(ys: &[i32]) -> Vec<DimValue> {
        ys.iter().copied().map(DimValue::Year).collect()
    }

    #[test]
    fn prefer_rule_uses_present_values_then_fallback() {
        let rule = DefaultRule::Prefer {
            values: vec!["2024".into(), "2025".into()],
            fallback: Fallback::Last(1),
        };
        assert_eq!(
            default_selection(&years(&[2023, 2024, 2025]), &rule),
            years(&[2024, 2025])
        );
        assert_eq!(default_selection(&years(&[2023, 2025]), &rule), years(&[2025]));
        assert_eq!(default_selection(&years(&[2020, 2021]), &rule), years(&[2021]));
        assert!(default_selection(&[], &rule).is_empty());
    }

    #[test]
    fn first_n_fallback_and_all() {
        let opts: Vec<DimValue> = ["Brazil", "Chile", "Peru"]
            .into_iter()
            .map(DimValue::from)
            .collect();
        let rule = DefaultRule::Prefer {
            values: vec!["USA".into(), "Canada".into()],
            fallback: Fallback::First(2),
        };
        assert_eq!(default_selection(&opts, &rule), opts[..2].to_vec());
        assert_eq!(default_selection(&opts, &DefaultRule::All), opts);
    }
}
