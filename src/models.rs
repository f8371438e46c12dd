use crate::error::EngineError;
use crate::normalize::parse_volume_range;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Domain a record store was loaded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dataset {
    #[default]
    Market,
    Epidemiology,
    CustomerIntelligence,
}

impl Dataset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dataset::Market => "market",
            Dataset::Epidemiology => "epidemiology",
            Dataset::CustomerIntelligence => "customer-intelligence",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical record attribute used for filtering and grouping.
///
/// Wire names are the camelCase field names of [`Record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Dimension {
    Year,
    Country,
    Region,
    Market,
    Segment,
    Disease,
    Brand,
    ProductType,
    BladeMaterial,
    HandleLength,
    Application,
    EndUser,
    DistributionChannelType,
    DistributionChannel,
    Gender,
    AgeGroup,
    IncomeType,
    PriceClass,
    PublicPrivate,
    Fdf,
    Roa,
    Procurement,
    CompanyName,
    IndustrySector,
    TypeOfShovelRequired,
    QualityPreference,
    PriceSensitivity,
    LeadPotential,
    EstimatedVolumeRequirement,
}

impl Dimension {
    /// Every dimension, in canonical schema order.
    pub const ALL: [Dimension; 29] = [
        Dimension::Year,
        Dimension::Country,
        Dimension::Region,
        Dimension::Market,
        Dimension::Segment,
        Dimension::Disease,
        Dimension::Brand,
        Dimension::ProductType,
        Dimension::BladeMaterial,
        Dimension::HandleLength,
        Dimension::Application,
        Dimension::EndUser,
        Dimension::DistributionChannelType,
        Dimension::DistributionChannel,
        Dimension::Gender,
        Dimension::AgeGroup,
        Dimension::IncomeType,
        Dimension::PriceClass,
        Dimension::PublicPrivate,
        Dimension::Fdf,
        Dimension::Roa,
        Dimension::Procurement,
        Dimension::CompanyName,
        Dimension::IndustrySector,
        Dimension::TypeOfShovelRequired,
        Dimension::QualityPreference,
        Dimension::PriceSensitivity,
        Dimension::LeadPotential,
        Dimension::EstimatedVolumeRequirement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Year => "year",
            Dimension::Country => "country",
            Dimension::Region => "region",
            Dimension::Market => "market",
            Dimension::Segment => "segment",
            Dimension::Disease => "disease",
            Dimension::Brand => "brand",
            Dimension::ProductType => "productType",
            Dimension::BladeMaterial => "bladeMaterial",
            Dimension::HandleLength => "handleLength",
            Dimension::Application => "application",
            Dimension::EndUser => "endUser",
            Dimension::DistributionChannelType => "distributionChannelType",
            Dimension::DistributionChannel => "distributionChannel",
            Dimension::Gender => "gender",
            Dimension::AgeGroup => "ageGroup",
            Dimension::IncomeType => "incomeType",
            Dimension::PriceClass => "priceClass",
            Dimension::PublicPrivate => "publicPrivate",
            Dimension::Fdf => "fdf",
            Dimension::Roa => "roa",
            Dimension::Procurement => "procurement",
            Dimension::CompanyName => "companyName",
            Dimension::IndustrySector => "industrySector",
            Dimension::TypeOfShovelRequired => "typeOfShovelRequired",
            Dimension::QualityPreference => "qualityPreference",
            Dimension::PriceSensitivity => "priceSensitivity",
            Dimension::LeadPotential => "leadPotential",
            Dimension::EstimatedVolumeRequirement => "estimatedVolumeRequirement",
        }
    }

    /// `year` is the only integer-valued dimension and the only time axis.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Dimension::Year)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = EngineError;

    /// Accepts the camelCase wire name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Dimension::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::UnknownDimension(wanted.to_string()))
    }
}

/// Numeric record attribute that is summed or averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    MarketValueUsd,
    VolumeUnits,
    Revenue,
    Price,
    Cagr,
    Prevalence,
    Incidence,
    Qty,
}

impl Measure {
    pub const ALL: [Measure; 8] = [
        Measure::MarketValueUsd,
        Measure::VolumeUnits,
        Measure::Revenue,
        Measure::Price,
        Measure::Cagr,
        Measure::Prevalence,
        Measure::Incidence,
        Measure::Qty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Measure::MarketValueUsd => "marketValueUsd",
            Measure::VolumeUnits => "volumeUnits",
            Measure::Revenue => "revenue",
            Measure::Price => "price",
            Measure::Cagr => "cagr",
            Measure::Prevalence => "prevalence",
            Measure::Incidence => "incidence",
            Measure::Qty => "qty",
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Measure {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Measure::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EngineError::UnknownMeasure(wanted.to_string()))
    }
}

/// Any record column: used to flatten records into tabular exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Dimension(Dimension),
    Measure(Measure),
}

impl Field {
    /// Dimensions first, then measures.
    pub fn all() -> impl Iterator<Item = Field> {
        Dimension::ALL
            .into_iter()
            .map(Field::Dimension)
            .chain(Measure::ALL.into_iter().map(Field::Measure))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Dimension(d) => d.as_str(),
            Field::Measure(m) => m.as_str(),
        }
    }
}

/// Owned dimension value: the key type of filter sets, option lists and groups.
///
/// Within one dimension every value has the same variant, so the derived ordering sorts
/// years numerically and labels lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimValue {
    Year(i32),
    Text(String),
}

impl DimValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DimValue::Text(s) => Some(s),
            DimValue::Year(_) => None,
        }
    }

    pub fn as_year(&self) -> Option<i32> {
        match self {
            DimValue::Year(y) => Some(*y),
            DimValue::Text(_) => None,
        }
    }

    /// The value in the variant `dimension` stores: year-like text becomes a year on
    /// `year`, and years become text on label dimensions. Text that is not a year is
    /// kept as is, so it never matches a year.
    pub fn for_dimension(self, dimension: Dimension) -> DimValue {
        if dimension.is_temporal() {
            match self.as_text().and_then(|s| s.trim().parse::<i32>().ok()) {
                Some(y) => DimValue::Year(y),
                None => self,
            }
        } else {
            match self.as_year() {
                Some(y) => DimValue::Text(y.to_string()),
                None => self,
            }
        }
    }
}

impl fmt::Display for DimValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimValue::Year(y) => write!(f, "{}", y),
            DimValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i32> for DimValue {
    fn from(y: i32) -> Self {
        DimValue::Year(y)
    }
}

impl From<&str> for DimValue {
    fn from(s: &str) -> Self {
        DimValue::Text(s.to_string())
    }
}

impl From<String> for DimValue {
    fn from(s: String) -> Self {
        DimValue::Text(s)
    }
}

/// Borrowed view of one dimension field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    Year(i32),
    Text(&'a str),
}

/// One observation of a demo dataset (one row = one record).
///
/// A single superset schema: every page reads the fields it needs and every field is
/// optional. Absent dimensions are excluded from grouping; absent measures contribute 0
/// to sums.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blade_material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_channel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution_channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_private: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fdf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roa: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procurement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry_sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_of_shovel_required: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_preference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_sensitivity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_potential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_volume_requirement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_value_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_units: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cagr: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prevalence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    fn text_slot(&self, dimension: Dimension) -> Option<&Option<String>> {
        let slot = match dimension {
            Dimension::Year => return None,
            Dimension::Country => &self.country,
            Dimension::Region => &self.region,
            Dimension::Market => &self.market,
            Dimension::Segment => &self.segment,
            Dimension::Disease => &self.disease,
            Dimension::Brand => &self.brand,
            Dimension::ProductType => &self.product_type,
            Dimension::BladeMaterial => &self.blade_material,
            Dimension::HandleLength => &self.handle_length,
            Dimension::Application => &self.application,
            Dimension::EndUser => &self.end_user,
            Dimension::DistributionChannelType => &self.distribution_channel_type,
            Dimension::DistributionChannel => &self.distribution_channel,
            Dimension::Gender => &self.gender,
            Dimension::AgeGroup => &self.age_group,
            Dimension::IncomeType => &self.income_type,
            Dimension::PriceClass => &self.price_class,
            Dimension::PublicPrivate => &self.public_private,
            Dimension::Fdf => &self.fdf,
            Dimension::Roa => &self.roa,
            Dimension::Procurement => &self.procurement,
            Dimension::CompanyName => &self.company_name,
            Dimension::IndustrySector => &self.industry_sector,
            Dimension::TypeOfShovelRequired => &self.type_of_shovel_required,
            Dimension::QualityPreference => &self.quality_preference,
            Dimension::PriceSensitivity => &self.price_sensitivity,
            Dimension::LeadPotential => &self.lead_potential,
            Dimension::EstimatedVolumeRequirement => &self.estimated_volume_requirement,
        };
        Some(slot)
    }

    fn text_slot_mut(&mut self, dimension: Dimension) -> Option<&mut Option<String>> {
        let slot = match dimension {
            Dimension::Year => return None,
            Dimension::Country => &mut self.country,
            Dimension::Region => &mut self.region,
            Dimension::Market => &mut self.market,
            Dimension::Segment => &mut self.segment,
            Dimension::Disease => &mut self.disease,
            Dimension::Brand => &mut self.brand,
            Dimension::ProductType => &mut self.product_type,
            Dimension::BladeMaterial => &mut self.blade_material,
            Dimension::HandleLength => &mut self.handle_length,
            Dimension::Application => &mut self.application,
            Dimension::EndUser => &mut self.end_user,
            Dimension::DistributionChannelType => &mut self.distribution_channel_type,
            Dimension::DistributionChannel => &mut self.distribution_channel,
            Dimension::Gender => &mut self.gender,
            Dimension::AgeGroup => &mut self.age_group,
            Dimension::IncomeType => &mut self.income_type,
            Dimension::PriceClass => &mut self.price_class,
            Dimension::PublicPrivate => &mut self.public_private,
            Dimension::Fdf => &mut self.fdf,
            Dimension::Roa => &mut self.roa,
            Dimension::Procurement => &mut self.procurement,
            Dimension::CompanyName => &mut self.company_name,
            Dimension::IndustrySector => &mut self.industry_sector,
            Dimension::TypeOfShovelRequired => &mut self.type_of_shovel_required,
            Dimension::QualityPreference => &mut self.quality_preference,
            Dimension::PriceSensitivity => &mut self.price_sensitivity,
            Dimension::LeadPotential => &mut self.lead_potential,
            Dimension::EstimatedVolumeRequirement => &mut self.estimated_volume_requirement,
        };
        Some(slot)
    }

    fn measure_slot_mut(&mut self, measure: Measure) -> &mut Option<f64> {
        match measure {
            Measure::MarketValueUsd => &mut self.market_value_usd,
            Measure::VolumeUnits => &mut self.volume_units,
            Measure::Revenue => &mut self.revenue,
            Measure::Price => &mut self.price,
            Measure::Cagr => &mut self.cagr,
            Measure::Prevalence => &mut self.prevalence,
            Measure::Incidence => &mut self.incidence,
            Measure::Qty => &mut self.qty,
        }
    }

    /// Raw (untrimmed) dimension field, `None` when absent.
    pub fn field(&self, dimension: Dimension) -> Option<FieldRef<'_>> {
        match dimension {
            Dimension::Year => self.year.map(FieldRef::Year),
            other => self
                .text_slot(other)
                .and_then(|s| s.as_deref())
                .map(FieldRef::Text),
        }
    }

    /// Raw text of a string dimension. Always `None` for `year`.
    pub fn text(&self, dimension: Dimension) -> Option<&str> {
        self.text_slot(dimension).and_then(|s| s.as_deref())
    }

    fn measure_raw(&self, measure: Measure) -> Option<f64> {
        match measure {
            Measure::MarketValueUsd => self.market_value_usd,
            Measure::VolumeUnits => self.volume_units,
            Measure::Revenue => self.revenue,
            Measure::Price => self.price,
            Measure::Cagr => self.cagr,
            Measure::Prevalence => self.prevalence,
            Measure::Incidence => self.incidence,
            Measure::Qty => self.qty,
        }
    }

    /// Measure value; non-finite values count as absent.
    pub fn measure(&self, measure: Measure) -> Option<f64> {
        self.measure_raw(measure).filter(|x| x.is_finite())
    }

    /// Set a dimension from text. For `year` the text must parse as an integer,
    /// otherwise the field is cleared.
    pub fn set_text(&mut self, dimension: Dimension, value: impl Into<String>) {
        let value = value.into();
        match self.text_slot_mut(dimension) {
            Some(slot) => *slot = Some(value),
            None => self.year = value.trim().parse().ok(),
        }
    }

    pub fn set_measure(&mut self, measure: Measure, value: f64) {
        *self.measure_slot_mut(measure) = Some(value);
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_text(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.set_text(dimension, value);
        self
    }

    pub fn with_measure(mut self, measure: Measure, value: f64) -> Self {
        self.set_measure(measure, value);
        self
    }

    /// Cell text for tabular export; `None` when the field is absent.
    pub fn cell(&self, field: Field) -> Option<String> {
        match field {
            Field::Dimension(Dimension::Year) => self.year.map(|y| y.to_string()),
            Field::Dimension(d) => self.text(d).map(str::to_string),
            Field::Measure(m) => self.measure_raw(m).map(|v| v.to_string()),
        }
    }
}

/// Market evaluation switch: selects the measure evaluation-driven charts read.
/// It never filters rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvaluationMode {
    #[default]
    ByValue,
    ByVolume,
}

impl EvaluationMode {
    /// `ByValue` reads market value in US$ thousands and reports US$ million.
    pub fn selector(self) -> MeasureSelector {
        match self {
            EvaluationMode::ByValue => MeasureSelector::Scaled {
                measure: Measure::MarketValueUsd,
                factor: 1.0e-3,
            },
            EvaluationMode::ByVolume => MeasureSelector::Field {
                measure: Measure::VolumeUnits,
            },
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            EvaluationMode::ByValue => "Market Size (US$ Million)",
            EvaluationMode::ByVolume => "Market Volume (Units)",
        }
    }
}

impl FromStr for EvaluationMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "value" | "by-value" | "by value" | "by_value" => Ok(EvaluationMode::ByValue),
            "volume" | "by-volume" | "by volume" | "by_volume" => Ok(EvaluationMode::ByVolume),
            other => Err(EngineError::UnknownEvaluationMode(other.to_string())),
        }
    }
}

/// How a record maps to the number being aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MeasureSelector {
    /// A single measure field.
    Field { measure: Measure },
    /// `primary` when present and non-zero, otherwise `secondary`.
    Fallback { primary: Measure, secondary: Measure },
    /// A measure multiplied by a constant (unit conversion).
    Scaled { measure: Measure, factor: f64 },
    /// Every record contributes 1.
    Count,
    /// Representative volume parsed from `estimatedVolumeRequirement`.
    VolumeRange,
    /// Placeholder resolved against the session's [`EvaluationMode`].
    Evaluation,
}

impl MeasureSelector {
    pub fn field(measure: Measure) -> Self {
        MeasureSelector::Field { measure }
    }

    /// Revenue, falling back to market value.
    pub fn revenue_or_market_value() -> Self {
        MeasureSelector::Fallback {
            primary: Measure::Revenue,
            secondary: Measure::MarketValueUsd,
        }
    }

    /// Replace [`MeasureSelector::Evaluation`] with the concrete selector of `mode`.
    pub fn resolve(self, mode: EvaluationMode) -> Self {
        match self {
            MeasureSelector::Evaluation => mode.selector(),
            other => other,
        }
    }

    /// The record's value, `None` when the underlying measure is absent.
    pub fn value(&self, record: &Record) -> Option<f64> {
        match *self {
            MeasureSelector::Field { measure } => record.measure(measure),
            MeasureSelector::Fallback { primary, secondary } => {
                match (record.measure(primary), record.measure(secondary)) {
                    (Some(p), _) if p != 0.0 => Some(p),
                    (_, Some(s)) => Some(s),
                    (p, None) => p,
                }
            }
            MeasureSelector::Scaled { measure, factor } => {
                record.measure(measure).map(|v| v * factor)
            }
            MeasureSelector::Count => Some(1.0),
            MeasureSelector::VolumeRange => Some(parse_volume_range(
                record
                    .text(Dimension::EstimatedVolumeRequirement)
                    .unwrap_or(""),
            )),
            MeasureSelector::Evaluation => EvaluationMode::default().selector().value(record),
        }
    }

    /// Contribution to a sum: absent counts as 0.
    pub fn sum_value(&self, record: &Record) -> f64 {
        self.value(record).unwrap_or(0.0)
    }
}

impl FromStr for MeasureSelector {
    type Err = EngineError;

    /// `count`, `volumeRange`, `evaluation`, a measure name, or `primary|secondary`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "count" => return Ok(MeasureSelector::Count),
            "volumerange" | "volume-range" => return Ok(MeasureSelector::VolumeRange),
            "evaluation" => return Ok(MeasureSelector::Evaluation),
            _ => {}
        }
        if let Some((a, b)) = s.split_once('|') {
            return Ok(MeasureSelector::Fallback {
                primary: a.parse()?,
                secondary: b.parse()?,
            });
        }
        Ok(MeasureSelector::Field { measure: s.parse()? })
    }
}

/// How the values of one group are reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    #[default]
    Sum,
    /// Sum divided by the number of records in the group whose measure is present.
    Average,
}

impl FromStr for Reduction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Reduction::Sum),
            "average" | "avg" | "mean" => Ok(Reduction::Average),
            other => Err(EngineError::UnknownReduction(other.to_string())),
        }
    }
}
