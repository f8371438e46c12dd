use market_lens::dashboard::ChartData;
use market_lens::{
    Dashboard, Dataset, DimValue, Dimension, EngineConfig, EngineError, EvaluationMode,
    FilterState, KpiValue, Measure, PageConfig, Record, RecordStore, ValueSet,
};

fn sale(
    year: i32,
    country: &str,
    product: &str,
    channel_type: &str,
    channel: &str,
    mv: f64,
    units: f64,
) -> Record {
    Record::new()
        .with_year(year)
        .with_text(Dimension::Region, "North America")
        .with_text(Dimension::Country, country)
        .with_text(Dimension::ProductType, product)
        .with_text(Dimension::DistributionChannelType, channel_type)
        .with_text(Dimension::DistributionChannel, channel)
        .with_measure(Measure::MarketValueUsd, mv)
        .with_measure(Measure::VolumeUnits, units)
}

fn store() -> RecordStore {
    RecordStore::new(
        Dataset::Market,
        vec![
            sale(2023, "USA", "Shovel", "Offline", "Hardware Store", 100.0, 10.0),
            sale(2024, "USA", "Shovel", "Offline", "Hardware Store", 1000.0, 500.0),
            sale(2024, "Canada", "Spade", "Online", "Marketplace", 2000.0, 500.0),
            sale(2025, "USA", "Spade", "Online", "Brand Site", 500.0, 500.0),
            sale(2025, "Mexico", "Shovel", "Offline", "Hardware Store", 300.0, 30.0),
        ],
    )
}

fn market_analysis() -> Dashboard {
    let page = PageConfig::preset("market-analysis").unwrap();
    Dashboard::new(store(), page, EngineConfig::default()).unwrap()
}

fn only(values: &[&str]) -> ValueSet {
    values.iter().map(|v| DimValue::from(*v)).collect()
}

#[test]
fn defaults_prefer_recent_years_and_north_american_countries() {
    let dash = market_analysis();
    let state = dash.default_state();
    assert_eq!(
        state.spec.selected(Dimension::Year),
        vec![DimValue::Year(2024), DimValue::Year(2025)]
    );
    assert_eq!(
        state.spec.selected(Dimension::Country),
        vec![DimValue::from("Canada"), DimValue::from("USA")]
    );
    assert_eq!(
        state.spec.selected(Dimension::ProductType),
        vec![DimValue::from("Shovel"), DimValue::from("Spade")]
    );
    // segments absent from the data stay unconstrained
    assert!(state.spec.selected(Dimension::BladeMaterial).is_empty());
    assert_eq!(state.evaluation, EvaluationMode::ByValue);
}

#[test]
fn default_snapshot_charts_and_kpis() {
    let mut dash = market_analysis();
    let state = dash.default_state();
    let snap = dash.snapshot(&state).unwrap();

    assert_eq!(snap.total_records, 5);
    assert_eq!(snap.filtered_count, 3);
    assert_eq!(snap.axis_label, "Market Size (US$ Million)");

    let ChartData::Pivot(country) = &snap.chart("country").unwrap().data else {
        panic!("country chart is a pivot");
    };
    assert_eq!(country.columns, vec!["Canada", "USA"]);
    assert_eq!(country.cell(2024, "Canada"), Some(2.0));
    assert_eq!(country.cell(2025, "Canada"), Some(0.0));

    let ChartData::Shares(shares) = &snap.chart("region-country-share").unwrap().data else {
        panic!("region share chart holds share rows");
    };
    let usa_2024 = shares
        .iter()
        .find(|r| r.period == DimValue::Year(2024) && r.member == "USA")
        .unwrap();
    assert_eq!(format!("{:.1}", usa_2024.plotted), "33.3");

    let total = snap.kpi("total-value").unwrap();
    assert_eq!(total.value, KpiValue::Number(3.5));
    assert_eq!(total.display, "3.5M");
}

#[test]
fn volume_mode_switches_measure_and_format() {
    let mut dash = market_analysis();
    let mut state = dash.default_state();
    state.evaluation = EvaluationMode::ByVolume;
    let snap = dash.snapshot(&state).unwrap();
    assert_eq!(snap.axis_label, "Market Volume (Units)");
    assert_eq!(snap.kpi("total-value").unwrap().display, "1.5K Units");
}

#[test]
fn scoped_channel_charts_follow_the_channel_type_selection() {
    let mut dash = market_analysis();
    let mut state = dash.default_state();
    {
        let snap = dash.snapshot(&state).unwrap();
        assert!(snap.chart("offline-channel-share").unwrap().data.is_hidden());
        assert!(snap.chart("online-channel-share").unwrap().data.is_hidden());
        assert_eq!(snap.options[&Dimension::DistributionChannel].len(), 3);
    }

    state
        .spec
        .set(Dimension::DistributionChannelType, only(&["Offline"]));
    let snap = dash.snapshot(&state).unwrap();
    assert!(snap.chart("online-channel-share").unwrap().data.is_hidden());
    let ChartData::Pivot(offline) = &snap.chart("offline-channel-share").unwrap().data else {
        panic!("offline chart is visible");
    };
    assert_eq!(offline.columns, vec!["Hardware Store"]);
    assert_eq!(
        snap.options[&Dimension::DistributionChannel],
        vec![DimValue::from("Hardware Store")]
    );
}

#[test]
fn snapshots_are_reused_for_an_unchanged_state() {
    let mut dash = market_analysis();
    let state = dash.default_state();
    let first = dash.snapshot(&state).unwrap().clone();
    let again = dash.snapshot(&state).unwrap().clone();
    assert_eq!(first, again);

    let mut other = state.clone();
    other.spec.set(Dimension::Country, only(&["USA"]));
    let narrowed = dash.snapshot(&other).unwrap();
    assert_eq!(narrowed.filtered_count, 2);
    assert_ne!(narrowed.filtered_count, first.filtered_count);
}

#[test]
fn filters_outside_the_page_are_rejected() {
    let mut dash = market_analysis();
    let mut state = FilterState::default();
    state.spec.set(Dimension::Brand, only(&["Acme"]));
    assert!(matches!(
        dash.snapshot(&state),
        Err(EngineError::DimensionNotFilterable(Dimension::Brand))
    ));
    assert!(dash.filtered(&state).is_err());
}

#[test]
fn every_preset_renders_on_an_empty_store() {
    for name in PageConfig::PRESETS {
        let page = PageConfig::preset(name).unwrap();
        let dataset = page.dataset;
        let mut dash =
            Dashboard::new(RecordStore::new(dataset, Vec::new()), page, EngineConfig::default())
                .unwrap();
        let state = dash.default_state();
        let snap = dash.snapshot(&state).unwrap();
        assert_eq!(snap.filtered_count, 0, "{name}");
        assert!(snap.charts.iter().all(|c| c.data.is_empty()), "{name}");
        assert!(snap.kpis.iter().all(|k| k.display == "N/A"), "{name}");
    }
}

#[test]
fn custom_page_from_json() {
    let json = r#"{
        "name": "brand-prices",
        "filters": ["year", "brand"],
        "charts": [{
            "id": "avg-price",
            "title": "Average Price",
            "kind": "bar",
            "shape": "grouped",
            "dimension": "brand",
            "measure": {"kind": "field", "measure": "price"},
            "reduction": "average"
        }],
        "kpis": [{
            "id": "max-price",
            "title": "Max Price",
            "kpi": {"kind": "max", "measure": {"kind": "field", "measure": "price"}},
            "format": {"kind": "currency", "symbol": "$"}
        }]
    }"#;
    let page = PageConfig::from_json(json).unwrap();
    let records = vec![
        Record::new()
            .with_year(2024)
            .with_text(Dimension::Brand, "Acme")
            .with_measure(Measure::Price, 10.0),
        Record::new()
            .with_year(2024)
            .with_text(Dimension::Brand, "Acme")
            .with_measure(Measure::Price, 1250.0),
    ];
    let config = EngineConfig::from_json(r#"{"placeholder": "-"}"#).unwrap();
    let mut dash =
        Dashboard::new(RecordStore::new(Dataset::Market, records), page, config).unwrap();
    let snap = dash.snapshot(&FilterState::default()).unwrap();

    let ChartData::Grouped(series) = &snap.chart("avg-price").unwrap().data else {
        panic!("grouped chart");
    };
    assert_eq!(series.get("Acme"), Some(630.0));
    assert_eq!(snap.kpi("max-price").unwrap().display, "$1,250.00");

    let mut empty = FilterState::default();
    empty.spec.set(Dimension::Brand, only(&["Nobody"]));
    assert_eq!(dash.snapshot(&empty).unwrap().kpi("max-price").unwrap().display, "-");
}

const YEAR_SCOPED_PAGE: &str = r#"{
    "name": "country-2024",
    "filters": ["year", "country"],
    "charts": [{
        "id": "by-country-2024",
        "title": "Countries in 2024",
        "kind": "bar",
        "shape": "grouped",
        "dimension": "country",
        "measure": {"kind": "field", "measure": "marketValueUsd"},
        "reduction": "sum",
        "within": {"dimension": "year", "value": "2024"}
    }]
}"#;

#[test]
fn year_scoped_chart_renders_while_the_year_is_selected() {
    let page = PageConfig::from_json(YEAR_SCOPED_PAGE).unwrap();
    let mut dash = Dashboard::new(store(), page, EngineConfig::default()).unwrap();

    let mut state = FilterState::default();
    let years: ValueSet = [DimValue::Year(2024), DimValue::Year(2025)].into_iter().collect();
    state.spec.set(Dimension::Year, years);
    let snap = dash.snapshot(&state).unwrap();
    let ChartData::Grouped(series) = &snap.chart("by-country-2024").unwrap().data else {
        panic!("year-scoped chart is visible");
    };
    assert_eq!(series.len(), 2);
    assert_eq!(series.get("Canada"), Some(2000.0));
    assert_eq!(series.get("USA"), Some(1000.0));
    assert_eq!(series.get("Mexico"), None);

    state.spec.set(Dimension::Year, [DimValue::Year(2025)].into_iter().collect());
    let snap = dash.snapshot(&state).unwrap();
    assert!(snap.chart("by-country-2024").unwrap().data.is_hidden());
}

#[test]
fn scope_values_that_cannot_match_are_rejected() {
    for value in ["soon", "undefined", " "] {
        let json =
            YEAR_SCOPED_PAGE.replace(r#""value": "2024""#, &format!(r#""value": "{value}""#));
        assert!(
            matches!(PageConfig::from_json(&json), Err(EngineError::InvalidPage { .. })),
            "{value:?}"
        );
    }
}
