//! Presentation formatting of numbers and KPI values.

use crate::stats::KpiValue;
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

/// Map a user-provided locale tag to a `num_format::Locale` and its decimal separator char.
///
/// Supported tags (case-insensitive): `en`, `us`, `en_US`, `de`, `de_DE`, `german`,
/// `fr`, `es`, `it`, `pt`, `nl`. Defaults to English.
pub fn map_locale(tag: &str) -> (&'static Locale, char) {
    match tag.to_lowercase().as_str() {
        "de" | "de_de" | "german" => (&Locale::de, ','),
        "fr" | "fr_fr" => (&Locale::fr, ','),
        "es" | "es_es" => (&Locale::es, ','),
        "it" | "it_it" => (&Locale::it, ','),
        "pt" | "pt_pt" | "pt_br" => (&Locale::pt, ','),
        "nl" | "nl_nl" => (&Locale::nl, ','),
        _ => (&Locale::en, '.'), // default
    }
}

/// Format `value` with thousands separators and exactly `decimals` fraction digits.
///
/// ```
/// use market_lens::format::format_number;
/// assert_eq!(format_number(1234567.891, 2, "en"), "1,234,567.89");
/// assert_eq!(format_number(-1500.0, 0, "de"), "-1.500");
/// ```
pub fn format_number(value: f64, decimals: usize, locale_tag: &str) -> String {
    let (locale, dec_sep) = map_locale(locale_tag);
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let grouped = int_part
        .parse::<u64>()
        .map(|n| n.to_formatted_string(locale))
        .unwrap_or_else(|_| int_part.to_string());
    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::with_capacity(grouped.len() + decimals + 2);
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push(dec_sep);
        out.push_str(frac);
    }
    out
}

/// Pick a display scale and its suffix for a magnitude, e.g. `(1e6, "M")`.
pub fn choose_scale(max_abs: f64) -> (f64, &'static str) {
    if max_abs >= 1.0e12 {
        (1.0e12, "T")
    } else if max_abs >= 1.0e9 {
        (1.0e9, "B")
    } else if max_abs >= 1.0e6 {
        (1.0e6, "M")
    } else if max_abs >= 1.0e3 {
        (1.0e3, "K")
    } else {
        (1.0, "")
    }
}

/// How a KPI card renders its value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KpiFormat {
    /// Grouped digits with fixed decimals.
    Number {
        #[serde(default)]
        decimals: usize,
    },
    /// `value / divisor` followed by `suffix`, e.g. US$ thousands shown as `"1,234.5M"`.
    Scaled {
        divisor: f64,
        #[serde(default = "one_decimal")]
        decimals: usize,
        suffix: String,
    },
    /// Value already in percent, e.g. `"42.5%"`.
    Percent {
        #[serde(default = "one_decimal")]
        decimals: usize,
    },
    /// Currency prefix, e.g. `"$1,250.00"`.
    Currency {
        symbol: String,
        #[serde(default = "two_decimals")]
        decimals: usize,
    },
    /// Auto-scaled to K/M/B/T by magnitude, e.g. `"2.5M"`.
    Compact {
        #[serde(default = "one_decimal")]
        decimals: usize,
    },
    /// Labels as they are, numbers with no decimals.
    #[default]
    Plain,
}

fn one_decimal() -> usize {
    1
}

fn two_decimals() -> usize {
    2
}

impl KpiFormat {
    pub fn number(decimals: usize) -> Self {
        KpiFormat::Number { decimals }
    }

    pub fn percent() -> Self {
        KpiFormat::Percent { decimals: 1 }
    }

    pub fn currency(symbol: &str) -> Self {
        KpiFormat::Currency {
            symbol: symbol.to_string(),
            decimals: 2,
        }
    }

    /// US$ thousands shown in millions.
    pub fn thousands_as_millions() -> Self {
        KpiFormat::Scaled {
            divisor: 1.0e3,
            decimals: 1,
            suffix: "M".to_string(),
        }
    }

    fn number_text(&self, value: f64, locale: &str) -> String {
        match self {
            KpiFormat::Number { decimals } => format_number(value, *decimals, locale),
            KpiFormat::Scaled {
                divisor,
                decimals,
                suffix,
            } => {
                let scaled = if *divisor != 0.0 { value / divisor } else { value };
                format!("{}{}", format_number(scaled, *decimals, locale), suffix)
            }
            KpiFormat::Percent { decimals } => {
                format!("{}%", format_number(value, *decimals, locale))
            }
            KpiFormat::Currency { symbol, decimals } => {
                format!("{}{}", symbol, format_number(value, *decimals, locale))
            }
            KpiFormat::Compact { decimals } => {
                let (scale, suffix) = choose_scale(value.abs());
                format!("{}{}", format_number(value / scale, *decimals, locale), suffix)
            }
            KpiFormat::Plain => format_number(value, 0, locale),
        }
    }
}

/// Renders KPI values for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Formatter {
    pub locale: String,
    /// Shown for [`KpiValue::NoData`].
    pub placeholder: String,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            locale: "en".to_string(),
            placeholder: "N/A".to_string(),
        }
    }
}

impl Formatter {
    pub fn new(locale: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            placeholder: placeholder.into(),
        }
    }

    pub fn format_kpi(&self, value: &KpiValue, format: &KpiFormat) -> String {
        match value {
            KpiValue::NoData => self.placeholder.clone(),
            KpiValue::Label(s) => s.clone(),
            KpiValue::Number(n) => format.number_text(*n, &self.locale),
            KpiValue::Range { min, max } => format!(
                "{} - {}",
                format.number_text(*min, &self.locale),
                format.number_text(*max, &self.locale)
            ),
        }
    }
}
