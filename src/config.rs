//! Declarative dashboard pages and engine settings.
//!
//! A page lists the dimensions it filters on, the charts it renders and the KPI cards it
//! shows. Pages are plain serde data: they load from JSON, and the pages of the demo
//! product ship as built-in presets (see [`PageConfig::preset`]).

use crate::aggregate::SharePlot;
use crate::error::{EngineError, Result};
use crate::format::{Formatter, KpiFormat};
use crate::models::{
    Dataset, DimValue, Dimension, EvaluationMode, Measure, MeasureSelector, Reduction,
};
use crate::normalize::{DEFAULT_LABEL_MAX_CHARS, category_key};
use crate::stats::{Kpi, KpiSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Engine-wide presentation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Display labels longer than this are truncated with `...`.
    pub label_max_chars: usize,
    /// Text shown for KPIs without data.
    pub placeholder: String,
    /// Number formatting locale tag, see [`crate::format::map_locale`].
    pub locale: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            label_max_chars: DEFAULT_LABEL_MAX_CHARS,
            placeholder: "N/A".to_string(),
            locale: "en".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn formatter(&self) -> Formatter {
        Formatter::new(self.locale.clone(), self.placeholder.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Scatter,
    Stacked,
}

/// Where a pivot takes its columns from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    /// Distinct values present in the filtered data.
    #[default]
    Data,
    /// The current filter selection of the column dimension (data values if none).
    Filter,
    /// A fixed list of values.
    Fixed(Vec<String>),
}

/// The aggregation behind a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ChartShape {
    Grouped {
        dimension: Dimension,
        measure: MeasureSelector,
        #[serde(default)]
        reduction: Reduction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top: Option<usize>,
    },
    Breakdown {
        dimension: Dimension,
        measure: MeasureSelector,
    },
    Pivot {
        rows: Dimension,
        columns: Dimension,
        measure: MeasureSelector,
        #[serde(default)]
        reduction: Reduction,
        #[serde(default)]
        column_source: ColumnSource,
    },
    StackedShare {
        rows: Dimension,
        columns: Dimension,
        measure: MeasureSelector,
        #[serde(default)]
        column_source: ColumnSource,
        /// Report cells as percentages of their row total.
        #[serde(default)]
        percent: bool,
    },
    NestedShare {
        period: Dimension,
        group: Dimension,
        member: Dimension,
        measure: MeasureSelector,
        /// Defaults to the evaluation mode's choice.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plot: Option<SharePlot>,
    },
    CrossTab {
        outer: Dimension,
        inner: Dimension,
        measure: MeasureSelector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top_outer: Option<usize>,
    },
    Scatter {
        x: MeasureSelector,
        y: MeasureSelector,
        label: Dimension,
        limit: usize,
    },
    /// Several measures side by side per category.
    Series {
        dimension: Dimension,
        measures: Vec<(String, MeasureSelector)>,
        #[serde(default)]
        reduction: Reduction,
    },
}

impl ChartShape {
    /// The dimension whose filter selection pins the columns, if any.
    pub fn pinned_dimension(&self) -> Option<Dimension> {
        match self {
            ChartShape::Pivot {
                columns,
                column_source: ColumnSource::Filter,
                ..
            }
            | ChartShape::StackedShare {
                columns,
                column_source: ColumnSource::Filter,
                ..
            } => Some(*columns),
            _ => None,
        }
    }
}

/// Restricts a chart to the records where `dimension == value`. The chart is only
/// rendered while `value` is selected in the filter of `dimension`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub dimension: Dimension,
    pub value: String,
}

impl Scope {
    /// The value as the filter of `dimension` holds it.
    pub fn selection(&self) -> DimValue {
        DimValue::from(self.value.trim()).for_dimension(self.dimension)
    }

    /// Grouping key the scoped records must have; `None` when the value is blank, a
    /// placeholder, or not a year on `year`.
    pub fn key(&self) -> Option<DimValue> {
        match self.selection() {
            DimValue::Year(y) => Some(DimValue::Year(y)),
            DimValue::Text(_) if self.dimension.is_temporal() => None,
            DimValue::Text(s) => {
                category_key(self.dimension, &s).map(|k| DimValue::Text(k.into_owned()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub id: String,
    pub title: String,
    pub kind: ChartKind,
    #[serde(flatten)]
    pub shape: ChartShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<Scope>,
    /// Overrides [`EngineConfig::label_max_chars`] for this chart.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_max_chars: Option<usize>,
}

impl ChartSpec {
    pub fn new(id: &str, title: &str, kind: ChartKind, shape: ChartShape) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            shape,
            within: None,
            label_max_chars: None,
        }
    }

    pub fn within(mut self, dimension: Dimension, value: &str) -> Self {
        self.within = Some(Scope {
            dimension,
            value: value.to_string(),
        });
        self
    }

    pub fn label_max_chars(mut self, max: usize) -> Self {
        self.label_max_chars = Some(max);
        self
    }
}

/// A KPI with its display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiCard {
    pub id: String,
    pub title: String,
    pub kpi: Kpi,
    #[serde(default)]
    pub format: KpiFormat,
    /// Used instead of `format` in volume mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_format: Option<KpiFormat>,
}

impl KpiCard {
    pub fn new(id: &str, title: &str, kpi: Kpi, format: KpiFormat) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kpi,
            format,
            volume_format: None,
        }
    }

    pub fn format_for(&self, mode: EvaluationMode) -> &KpiFormat {
        match (mode, &self.volume_format) {
            (EvaluationMode::ByVolume, Some(f)) => f,
            _ => &self.format,
        }
    }
}

/// What to take when the preferred defaults are not all in the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    #[default]
    Nothing,
    First(usize),
    Last(usize),
}

/// Initial selection of one filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DefaultRule {
    /// Select every option.
    All,
    /// Select `values` that exist in the data; with none of them present, use `fallback`.
    Prefer {
        values: Vec<String>,
        #[serde(default)]
        fallback: Fallback,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterDefault {
    pub dimension: Dimension,
    #[serde(flatten)]
    pub rule: DefaultRule,
}

/// A dropdown whose options depend on another filter's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentFilter {
    pub parent: Dimension,
    pub child: Dimension,
}

/// One dashboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub dataset: Dataset,
    pub filters: Vec<Dimension>,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    #[serde(default)]
    pub kpis: Vec<KpiCard>,
    #[serde(default)]
    pub defaults: Vec<FilterDefault>,
    #[serde(default)]
    pub dependent: Vec<DependentFilter>,
}

impl PageConfig {
    /// Names of the built-in presets.
    pub const PRESETS: [&'static str; 8] = [
        "epidemiology",
        "pricing",
        "cagr",
        "procurement",
        "fdf",
        "brand-demographic",
        "market-analysis",
        "customer-intelligence",
    ];

    pub fn preset(name: &str) -> Result<Self> {
        let page = match name.trim().to_ascii_lowercase().as_str() {
            "epidemiology" => presets::epidemiology(),
            "pricing" => presets::pricing(),
            "cagr" => presets::cagr(),
            "procurement" => presets::procurement(),
            "fdf" => presets::fdf(),
            "brand-demographic" => presets::brand_demographic(),
            "market-analysis" => presets::market_analysis(),
            "customer-intelligence" => presets::customer_intelligence(),
            other => return Err(EngineError::UnknownPage(other.to_string())),
        };
        Ok(page)
    }

    /// Parse and validate a page from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let page: PageConfig = serde_json::from_str(text)?;
        page.validate()?;
        Ok(page)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn invalid(&self, reason: String) -> EngineError {
        EngineError::InvalidPage {
            page: self.name.clone(),
            reason,
        }
    }

    /// Check internal consistency: unique ids, and every dimension a chart pins to, a
    /// scope names, or a default/dependent rule targets is one of the page's filters.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("page name is empty".to_string()));
        }
        let filterable = |d: Dimension| self.filters.contains(&d);

        let mut ids = BTreeSet::new();
        for chart in &self.charts {
            if !ids.insert(chart.id.as_str()) {
                return Err(self.invalid(format!("duplicate chart id '{}'", chart.id)));
            }
            if let Some(d) = chart.shape.pinned_dimension().filter(|d| !filterable(*d)) {
                return Err(self.invalid(format!(
                    "chart '{}' pins columns to '{}', which is not a filter of this page",
                    chart.id, d
                )));
            }
            if let Some(scope) = chart.within.as_ref().filter(|s| !filterable(s.dimension)) {
                return Err(self.invalid(format!(
                    "chart '{}' is scoped to '{}', which is not a filter of this page",
                    chart.id, scope.dimension
                )));
            }
            if let Some(scope) = chart.within.as_ref().filter(|s| s.key().is_none()) {
                return Err(self.invalid(format!(
                    "chart '{}' is scoped to '{}', which is not a valid {} value",
                    chart.id, scope.value, scope.dimension
                )));
            }
            if let ChartShape::Scatter { limit: 0, .. } = chart.shape {
                return Err(self.invalid(format!("scatter chart '{}' has limit 0", chart.id)));
            }
        }

        let mut kpi_ids = BTreeSet::new();
        for card in &self.kpis {
            if !kpi_ids.insert(card.id.as_str()) {
                return Err(self.invalid(format!("duplicate KPI id '{}'", card.id)));
            }
        }

        for default in &self.defaults {
            if !filterable(default.dimension) {
                return Err(self.invalid(format!(
                    "default selection for '{}', which is not a filter of this page",
                    default.dimension
                )));
            }
        }
        for dep in &self.dependent {
            if !filterable(dep.parent) || !filterable(dep.child) {
                return Err(self.invalid(format!(
                    "dependent filter '{}' -> '{}' names a dimension that is not a filter",
                    dep.parent, dep.child
                )));
            }
        }
        Ok(())
    }

    /// KPI cards as a spec, with evaluation placeholders resolved for `mode`.
    pub fn kpi_spec(&self, mode: EvaluationMode) -> KpiSpec {
        self.kpis
            .iter()
            .fold(KpiSpec::new(), |spec, card| {
                spec.with(card.id.clone(), card.kpi.resolve(mode))
            })
    }

    pub fn chart(&self, id: &str) -> Option<&ChartSpec> {
        self.charts.iter().find(|c| c.id == id)
    }
}

mod presets {
    use super::*;

    const GEO: [Dimension; 5] = [
        Dimension::Year,
        Dimension::Market,
        Dimension::Region,
        Dimension::IncomeType,
        Dimension::Country,
    ];

    fn field(m: Measure) -> MeasureSelector {
        MeasureSelector::field(m)
    }

    fn qty() -> MeasureSelector {
        MeasureSelector::Fallback {
            primary: Measure::Qty,
            secondary: Measure::VolumeUnits,
        }
    }

    fn revenue() -> MeasureSelector {
        MeasureSelector::revenue_or_market_value()
    }

    fn grouped(dimension: Dimension, measure: MeasureSelector, reduction: Reduction) -> ChartShape {
        ChartShape::Grouped {
            dimension,
            measure,
            reduction,
            top: None,
        }
    }

    fn breakdown(dimension: Dimension, measure: MeasureSelector) -> ChartShape {
        ChartShape::Breakdown { dimension, measure }
    }

    fn geo_with(extra: &[Dimension]) -> Vec<Dimension> {
        GEO.iter().chain(extra).copied().collect()
    }

    fn millions() -> KpiFormat {
        KpiFormat::Scaled {
            divisor: 1.0e6,
            decimals: 2,
            suffix: "M".to_string(),
        }
    }

    fn page(name: &str, title: &str, dataset: Dataset, filters: Vec<Dimension>) -> PageConfig {
        PageConfig {
            name: name.to_string(),
            title: title.to_string(),
            dataset,
            filters,
            charts: Vec::new(),
            kpis: Vec::new(),
            defaults: Vec::new(),
            dependent: Vec::new(),
        }
    }

    pub(super) fn epidemiology() -> PageConfig {
        let prevalence = field(Measure::Prevalence);
        let incidence = field(Measure::Incidence);
        let mut p = page(
            "epidemiology",
            "Epidemiology Analysis",
            Dataset::Epidemiology,
            vec![
                Dimension::Year,
                Dimension::Disease,
                Dimension::Region,
                Dimension::IncomeType,
                Dimension::Country,
            ],
        );
        p.charts = vec![
            ChartSpec::new(
                "prevalence-by-disease",
                "Prevalence by Disease",
                ChartKind::Bar,
                grouped(Dimension::Disease, prevalence, Reduction::Sum),
            ),
            ChartSpec::new(
                "incidence-by-region",
                "Incidence by Region",
                ChartKind::Bar,
                grouped(Dimension::Region, incidence, Reduction::Sum),
            ),
            ChartSpec::new(
                "trend",
                "Prevalence and Incidence Trend",
                ChartKind::Line,
                ChartShape::Series {
                    dimension: Dimension::Year,
                    measures: vec![
                        ("prevalence".to_string(), prevalence),
                        ("incidence".to_string(), incidence),
                    ],
                    reduction: Reduction::Sum,
                },
            ),
            ChartSpec::new(
                "prevalence-share",
                "Disease Share by Prevalence",
                ChartKind::Pie,
                breakdown(Dimension::Disease, prevalence),
            ),
            ChartSpec::new(
                "incidence-share",
                "Disease Share by Incidence",
                ChartKind::Pie,
                breakdown(Dimension::Disease, incidence),
            ),
        ];
        p.kpis = vec![
            KpiCard::new(
                "total-prevalence",
                "Total Prevalence",
                Kpi::Total { measure: prevalence },
                KpiFormat::Compact { decimals: 1 },
            ),
            KpiCard::new(
                "total-incidence",
                "Total Incidence",
                Kpi::Total { measure: incidence },
                KpiFormat::Compact { decimals: 1 },
            ),
            KpiCard::new(
                "top-disease",
                "Top Disease",
                Kpi::TopGroup {
                    dimension: Dimension::Disease,
                    measure: prevalence,
                    reduction: Reduction::Sum,
                },
                KpiFormat::Plain,
            ),
            KpiCard::new(
                "avg-incidence",
                "Avg Incidence Rate",
                Kpi::Mean { measure: incidence },
                KpiFormat::Compact { decimals: 1 },
            ),
        ];
        p
    }

    pub(super) fn pricing() -> PageConfig {
        let price = field(Measure::Price);
        let mut p = page(
            "pricing",
            "Pricing Analysis",
            Dataset::Market,
            geo_with(&[Dimension::Brand, Dimension::PriceClass]),
        );
        p.charts = vec![
            ChartSpec::new(
                "price-by-brand",
                "Average Price by Brand (Top 10)",
                ChartKind::Bar,
                ChartShape::Grouped {
                    dimension: Dimension::Brand,
                    measure: price,
                    reduction: Reduction::Average,
                    top: Some(10),
                },
            ),
            ChartSpec::new(
                "price-by-class",
                "Average Price by Price Class",
                ChartKind::Bar,
                grouped(Dimension::PriceClass, price, Reduction::Average),
            ),
            ChartSpec::new(
                "price-trend",
                "Average Price Trend",
                ChartKind::Line,
                grouped(Dimension::Year, price, Reduction::Average),
            ),
        ];
        p.kpis = vec![
            KpiCard::new(
                "volume",
                "Volume (Units Million)",
                Kpi::Total {
                    measure: field(Measure::VolumeUnits),
                },
                millions(),
            ),
            KpiCard::new(
                "avg-price",
                "Average Price (US$)",
                Kpi::Mean { measure: price },
                KpiFormat::currency("$"),
            ),
            KpiCard::new(
                "top-brand",
                "Most Expensive Brand",
                Kpi::TopGroup {
                    dimension: Dimension::Brand,
                    measure: price,
                    reduction: Reduction::Average,
                },
                KpiFormat::Plain,
            ),
            KpiCard::new(
                "price-range",
                "Price Range",
                Kpi::Range { measure: price },
                KpiFormat::Currency {
                    symbol: "$".to_string(),
                    decimals: 0,
                },
            ),
        ];
        p
    }

    pub(super) fn cagr() -> PageConfig {
        let cagr = field(Measure::Cagr);
        let pct = KpiFormat::Percent { decimals: 2 };
        let mut p = page(
            "cagr",
            "CAGR Analysis",
            Dataset::Market,
            geo_with(&[Dimension::Segment, Dimension::Gender]),
        );
        p.charts = vec![
            ChartSpec::new(
                "cagr-by-market",
                "CAGR by Market",
                ChartKind::Bar,
                grouped(Dimension::Market, cagr, Reduction::Average),
            ),
            ChartSpec::new(
                "cagr-by-region",
                "CAGR by Region",
                ChartKind::Pie,
                grouped(Dimension::Region, cagr, Reduction::Average),
            ),
            ChartSpec::new(
                "volume-vs-cagr",
                "Volume vs CAGR",
                ChartKind::Scatter,
                ChartShape::Scatter {
                    x: field(Measure::VolumeUnits),
                    y: cagr,
                    label: Dimension::Market,
                    limit: 100,
                },
            ),
        ];
        p.kpis = vec![
            KpiCard::new(
                "market-size",
                "Market Size (US$ Million)",
                Kpi::Total {
                    measure: field(Measure::MarketValueUsd),
                },
                KpiFormat::thousands_as_millions(),
            ),
            KpiCard::new("avg-cagr", "Avg CAGR %", Kpi::Mean { measure: cagr }, pct.clone()),
            KpiCard::new(
                "top-segment",
                "Highest Growth Segment",
                Kpi::TopGroup {
                    dimension: Dimension::Segment,
                    measure: cagr,
                    reduction: Reduction::Average,
                },
                KpiFormat::Plain,
            ),
            KpiCard::new("max-cagr", "Max CAGR", Kpi::Max { measure: cagr }, pct),
        ];
        p
    }

    pub(super) fn procurement() -> PageConfig {
        let mut p = page(
            "procurement",
            "Procurement Analysis",
            Dataset::Market,
            geo_with(&[Dimension::PublicPrivate, Dimension::Brand]),
        );
        p.charts = vec![
            ChartSpec::new(
                "qty-by-procurement",
                "Quantity by Procurement Type",
                ChartKind::Bar,
                grouped(Dimension::Procurement, qty(), Reduction::Sum),
            ),
            ChartSpec::new(
                "public-private",
                "Public vs Private",
                ChartKind::Pie,
                breakdown(Dimension::PublicPrivate, qty()),
            ),
            ChartSpec::new(
                "public-private-trend",
                "Public vs Private by Year",
                ChartKind::Stacked,
                ChartShape::Pivot {
                    rows: Dimension::Year,
                    columns: Dimension::PublicPrivate,
                    measure: qty(),
                    reduction: Reduction::Sum,
                    column_source: ColumnSource::Fixed(vec![
                        "Public".to_string(),
                        "Private".to_string(),
                    ]),
                },
            ),
            ChartSpec::new(
                "qty-by-brand",
                "Quantity Share by Brand",
                ChartKind::Pie,
                breakdown(Dimension::Brand, qty()),
            ),
        ];
        p.kpis = vec![
            KpiCard::new(
                "total-qty",
                "Total Quantity",
                Kpi::Total { measure: qty() },
                KpiFormat::number(0),
            ),
            KpiCard::new(
                "public-pct",
                "Public Procurement %",
                Kpi::ShareEqual {
                    dimension: Dimension::PublicPrivate,
                    value: "Public".to_string(),
                },
                KpiFormat::percent(),
            ),
            KpiCard::new(
                "private-pct",
                "Private Procurement %",
                Kpi::ShareEqual {
                    dimension: Dimension::PublicPrivate,
                    value: "Private".to_string(),
                },
                KpiFormat::percent(),
            ),
            KpiCard::new(
                "top-procurement",
                "Top Procurement Type",
                Kpi::TopGroup {
                    dimension: Dimension::Procurement,
                    measure: qty(),
                    reduction: Reduction::Sum,
                },
                KpiFormat::Plain,
            ),
        ];
        p
    }

    pub(super) fn fdf() -> PageConfig {
        let mut p = page(
            "fdf",
            "FDF Analysis",
            Dataset::Market,
            geo_with(&[Dimension::Brand, Dimension::Fdf, Dimension::Roa]),
        );
        p.charts = vec![
            ChartSpec::new(
                "revenue-by-fdf",
                "Revenue by Formulation",
                ChartKind::Bar,
                grouped(Dimension::Fdf, revenue(), Reduction::Sum),
            ),
            ChartSpec::new(
                "revenue-by-roa",
                "Revenue by ROA",
                ChartKind::Pie,
                breakdown(Dimension::Roa, revenue()),
            ),
            ChartSpec::new(
                "fdf-roa",
                "Formulation x ROA",
                ChartKind::Stacked,
                ChartShape::CrossTab {
                    outer: Dimension::Fdf,
                    inner: Dimension::Roa,
                    measure: revenue(),
                    top_outer: None,
                },
            ),
            ChartSpec::new(
                "revenue-by-brand",
                "Revenue Share by Brand",
                ChartKind::Pie,
                breakdown(Dimension::Brand, revenue()),
            ),
        ];
        p.kpis = vec![
            KpiCard::new(
                "total-market-value",
                "Total Market Value (US$ Million)",
                Kpi::Total {
                    measure: MeasureSelector::Fallback {
                        primary: Measure::MarketValueUsd,
                        secondary: Measure::Revenue,
                    },
                },
                KpiFormat::thousands_as_millions(),
            ),
            KpiCard::new(
                "total-quantity",
                "Total Quantity (Units Million)",
                Kpi::Total {
                    measure: MeasureSelector::Fallback {
                        primary: Measure::VolumeUnits,
                        secondary: Measure::Qty,
                    },
                },
                millions(),
            ),
            KpiCard::new(
                "revenue-per-fdf",
                "Revenue per FDF (US$ Million)",
                Kpi::PerGroup {
                    measure: revenue(),
                    dimension: Dimension::Fdf,
                },
                KpiFormat::thousands_as_millions(),
            ),
            KpiCard::new(
                "top-fdf",
                "Top Formulation",
                Kpi::TopGroup {
                    dimension: Dimension::Fdf,
                    measure: revenue(),
                    reduction: Reduction::Sum,
                },
                KpiFormat::Plain,
            ),
        ];
        p
    }

    pub(super) fn brand_demographic() -> PageConfig {
        let mut p = page(
            "brand-demographic",
            "Brand-Demographic",
            Dataset::Market,
            geo_with(&[Dimension::AgeGroup, Dimension::Gender, Dimension::Brand]),
        );
        p.charts = vec![
            ChartSpec::new(
                "revenue-by-brand",
                "Revenue by Brand",
                ChartKind::Bar,
                grouped(Dimension::Brand, revenue(), Reduction::Sum),
            ),
            ChartSpec::new(
                "revenue-by-gender",
                "Revenue by Gender",
                ChartKind::Bar,
                grouped(Dimension::Gender, revenue(), Reduction::Sum),
            ),
            ChartSpec::new(
                "brand-age",
                "Top 10 Brands by Age Group",
                ChartKind::Stacked,
                ChartShape::CrossTab {
                    outer: Dimension::Brand,
                    inner: Dimension::AgeGroup,
                    measure: revenue(),
                    top_outer: Some(10),
                },
            ),
            ChartSpec::new(
                "brand-share",
                "Revenue Share by Brand",
                ChartKind::Pie,
                breakdown(Dimension::Brand, revenue()),
            ),
        ];
        p.kpis = vec![
            KpiCard::new(
                "total-market-value",
                "Total Market Value (US$ Million)",
                Kpi::Total {
                    measure: field(Measure::MarketValueUsd),
                },
                KpiFormat::thousands_as_millions(),
            ),
            KpiCard::new(
                "total-revenue",
                "Total Revenue",
                Kpi::Total { measure: revenue() },
                KpiFormat::thousands_as_millions(),
            ),
            KpiCard::new(
                "top-brand",
                "Top Performing Brand",
                Kpi::TopGroup {
                    dimension: Dimension::Brand,
                    measure: revenue(),
                    reduction: Reduction::Sum,
                },
                KpiFormat::Plain,
            ),
            KpiCard::new(
                "top-age-group",
                "Top Age Group",
                Kpi::TopGroup {
                    dimension: Dimension::AgeGroup,
                    measure: revenue(),
                    reduction: Reduction::Sum,
                },
                KpiFormat::Plain,
            ),
        ];
        p
    }

    pub(super) fn market_analysis() -> PageConfig {
        const SEGMENTS: [(&str, &str, Dimension); 5] = [
            ("product-type", "Product Type", Dimension::ProductType),
            ("blade-material", "Blade Material", Dimension::BladeMaterial),
            ("handle-length", "Handle Length", Dimension::HandleLength),
            ("application", "Application", Dimension::Application),
            ("end-user", "End User", Dimension::EndUser),
        ];
        let eval = MeasureSelector::Evaluation;
        let mut p = page(
            "market-analysis",
            "Market Analysis",
            Dataset::Market,
            vec![
                Dimension::Year,
                Dimension::Country,
                Dimension::ProductType,
                Dimension::BladeMaterial,
                Dimension::HandleLength,
                Dimension::Application,
                Dimension::EndUser,
                Dimension::DistributionChannelType,
                Dimension::DistributionChannel,
            ],
        );

        let by_year = |id: &str, title: &str, columns: Dimension, source: ColumnSource| {
            ChartSpec::new(
                id,
                title,
                ChartKind::Bar,
                ChartShape::Pivot {
                    rows: Dimension::Year,
                    columns,
                    measure: eval,
                    reduction: Reduction::Sum,
                    column_source: source,
                },
            )
        };
        let stacked = |id: &str, title: &str, columns: Dimension, source: ColumnSource| {
            ChartSpec::new(
                id,
                title,
                ChartKind::Stacked,
                ChartShape::StackedShare {
                    rows: Dimension::Year,
                    columns,
                    measure: eval,
                    column_source: source,
                    percent: false,
                },
            )
        };

        for (id, title, dim) in SEGMENTS {
            p.charts
                .push(by_year(id, &format!("{} by Year", title), dim, ColumnSource::Filter));
        }
        p.charts.push(by_year(
            "country",
            "Country by Year",
            Dimension::Country,
            ColumnSource::Filter,
        ));
        p.charts.push(ChartSpec::new(
            "region-country-share",
            "Country Share within Region",
            ChartKind::Bar,
            ChartShape::NestedShare {
                period: Dimension::Year,
                group: Dimension::Region,
                member: Dimension::Country,
                measure: eval,
                plot: None,
            },
        ));
        for (id, title, dim) in &SEGMENTS[1..] {
            p.charts.push(stacked(
                &format!("{}-share", id),
                &format!("{} Share", title),
                *dim,
                ColumnSource::Filter,
            ));
        }
        p.charts.push(stacked(
            "channel-type-share",
            "Distribution Channel Type Share",
            Dimension::DistributionChannelType,
            ColumnSource::Filter,
        ));
        for channel in ["Offline", "Online"] {
            p.charts.push(
                stacked(
                    &format!("{}-channel-share", channel.to_ascii_lowercase()),
                    &format!("{} Channel Share", channel),
                    Dimension::DistributionChannel,
                    ColumnSource::Data,
                )
                .within(Dimension::DistributionChannelType, channel),
            );
        }

        p.kpis = vec![KpiCard {
            volume_format: Some(KpiFormat::Scaled {
                divisor: 1.0e3,
                decimals: 1,
                suffix: "K Units".to_string(),
            }),
            ..KpiCard::new(
                "total-value",
                "Total Market Size",
                Kpi::Total { measure: eval },
                KpiFormat::Scaled {
                    divisor: 1.0,
                    decimals: 1,
                    suffix: "M".to_string(),
                },
            )
        }];

        p.defaults = vec![
            FilterDefault {
                dimension: Dimension::Year,
                rule: DefaultRule::Prefer {
                    values: vec!["2024".to_string(), "2025".to_string()],
                    fallback: Fallback::Last(1),
                },
            },
            FilterDefault {
                dimension: Dimension::Country,
                rule: DefaultRule::Prefer {
                    values: vec!["USA".to_string(), "Canada".to_string()],
                    fallback: Fallback::First(2),
                },
            },
        ];
        p.defaults.extend(SEGMENTS.iter().map(|(_, _, d)| FilterDefault {
            dimension: *d,
            rule: DefaultRule::All,
        }));
        p.dependent = vec![DependentFilter {
            parent: Dimension::DistributionChannelType,
            child: Dimension::DistributionChannel,
        }];
        p
    }

    pub(super) fn customer_intelligence() -> PageConfig {
        let mut p = page(
            "customer-intelligence",
            "Customer Intelligence",
            Dataset::CustomerIntelligence,
            vec![
                Dimension::Region,
                Dimension::IndustrySector,
                Dimension::TypeOfShovelRequired,
                Dimension::QualityPreference,
                Dimension::PriceSensitivity,
                Dimension::LeadPotential,
            ],
        );
        p.charts = vec![
            ChartSpec::new(
                "region-industry",
                "Customers by Region and Industry",
                ChartKind::Stacked,
                ChartShape::Pivot {
                    rows: Dimension::Region,
                    columns: Dimension::IndustrySector,
                    measure: MeasureSelector::Count,
                    reduction: Reduction::Sum,
                    column_source: ColumnSource::Data,
                },
            ),
            ChartSpec::new(
                "customers-by-region",
                "Customers by Region",
                ChartKind::Bar,
                grouped(Dimension::Region, MeasureSelector::Count, Reduction::Sum),
            ),
            ChartSpec::new(
                "customers-by-industry",
                "Customers by Industry",
                ChartKind::Bar,
                grouped(Dimension::IndustrySector, MeasureSelector::Count, Reduction::Sum),
            )
            .label_max_chars(50),
            ChartSpec::new(
                "volume-by-shovel-type",
                "Demand by Shovel Type (Units/Year)",
                ChartKind::Bar,
                grouped(
                    Dimension::TypeOfShovelRequired,
                    MeasureSelector::VolumeRange,
                    Reduction::Sum,
                ),
            ),
            ChartSpec::new(
                "lead-potential",
                "Lead Potential",
                ChartKind::Pie,
                grouped(Dimension::LeadPotential, MeasureSelector::Count, Reduction::Sum),
            ),
        ];
        p.kpis = vec![
            KpiCard::new("total-customers", "Total Customers", Kpi::Count, KpiFormat::number(0)),
            KpiCard::new(
                "hot-leads",
                "Hot Leads",
                Kpi::CountMatching {
                    dimension: Dimension::LeadPotential,
                    needle: "hot".to_string(),
                },
                KpiFormat::number(0),
            ),
            KpiCard::new(
                "warm-leads",
                "Warm Leads",
                Kpi::CountMatching {
                    dimension: Dimension::LeadPotential,
                    needle: "warm".to_string(),
                },
                KpiFormat::number(0),
            ),
            KpiCard::new(
                "avg-volume",
                "Avg Demand/Year (Units)",
                Kpi::Mean {
                    measure: MeasureSelector::VolumeRange,
                },
                KpiFormat::number(0),
            ),
        ];
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_validates() {
        for name in PageConfig::PRESETS {
            let page = PageConfig::preset(name).unwrap();
            assert_eq!(page.name, name);
            page.validate().unwrap();
        }
    }

    #[test]
    fn pinning_to_a_foreign_dimension_is_rejected() {
        let mut page = PageConfig::preset("pricing").unwrap();
        page.charts.push(ChartSpec::new(
            "bad",
            "Bad",
            ChartKind::Bar,
            ChartShape::Pivot {
                rows: Dimension::Year,
                columns: Dimension::Segment,
                measure: MeasureSelector::field(Measure::Price),
                reduction: Reduction::Sum,
                column_source: ColumnSource::Filter,
            },
        ));
        assert!(matches!(page.validate(), Err(EngineError::InvalidPage { .. })));
    }

    #[test]
    fn unknown_preset() {
        assert!(matches!(
            PageConfig::preset("nope"),
            Err(EngineError::UnknownPage(_))
        ));
    }

    #[test]
    fn page_json_roundtrip_keeps_shape() {
        let page = PageConfig::preset("market-analysis").unwrap();
        let text = page.to_json().unwrap();
        let back = PageConfig::from_json(&text).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn engine_config_defaults_fill_missing_keys() {
        let cfg = EngineConfig::from_json(r#"{"locale":"de"}"#).unwrap();
        assert_eq!(cfg.label_max_chars, 40);
        assert_eq!(cfg.placeholder, "N/A");
        assert_eq!(cfg.locale, "de");
    }
}
