use market_lens::aggregate::{
    ColumnSet, SharePlot, breakdown, cross_tab, group_by, nested_share, pivot,
    region_country_share, scatter, stacked_share,
};
use market_lens::{
    DimValue, Dimension, EvaluationMode, FilterSpec, Measure, MeasureSelector, Record,
    Reduction, apply_filters,
};
use std::collections::BTreeMap;

fn market(year: i32, region: &str, country: &str, material: &str, mv: f64, units: f64) -> Record {
    Record::new()
        .with_year(year)
        .with_text(Dimension::Region, region)
        .with_text(Dimension::Country, country)
        .with_text(Dimension::BladeMaterial, material)
        .with_measure(Measure::MarketValueUsd, mv)
        .with_measure(Measure::VolumeUnits, units)
}

fn sample() -> Vec<Record> {
    vec![
        market(2024, "North America", "USA", "Steel", 1000.0, 10.0),
        market(2024, "North America", "Canada", "Steel", 2000.0, 30.0),
        market(2024, "Europe", "Germany", "Carbon Fiber", 500.0, 5.0),
        market(2025, "North America", "USA", "Steel", 1500.0, 20.0),
        market(2025, "Europe", "Germany", "Steel", 700.0, 7.0),
        market(2025, "undefined", "France", "Steel", 300.0, 3.0),
    ]
}

fn mv() -> MeasureSelector {
    MeasureSelector::field(Measure::MarketValueUsd)
}

#[test]
fn group_sums_conserve_the_total_of_valid_records() {
    let recs = sample();
    let by_region = group_by(&recs, Dimension::Region, mv(), Reduction::Sum);
    let valid: f64 = recs
        .iter()
        .filter(|r| r.region.as_deref() != Some("undefined"))
        .filter_map(|r| r.market_value_usd)
        .sum();
    assert!((by_region.total() - valid).abs() < 1e-9);

    // entity axes are ordered by value, descending
    let keys: Vec<String> = by_region.buckets.iter().map(|b| b.key.to_string()).collect();
    assert_eq!(keys, vec!["North America", "Europe"]);
}

#[test]
fn year_axis_is_chronological() {
    let recs = sample();
    let by_year = group_by(&recs, Dimension::Year, mv(), Reduction::Sum);
    let keys: Vec<DimValue> = by_year.buckets.iter().map(|b| b.key.clone()).collect();
    assert_eq!(keys, vec![DimValue::Year(2024), DimValue::Year(2025)]);
    assert_eq!(by_year.get(2024), Some(3500.0));
}

#[test]
fn average_ignores_absent_measures() {
    let recs = vec![
        Record::new()
            .with_text(Dimension::Brand, "Acme")
            .with_measure(Measure::Price, 10.0),
        Record::new()
            .with_text(Dimension::Brand, "Acme")
            .with_measure(Measure::Price, 20.0),
        Record::new().with_text(Dimension::Brand, "Acme"),
    ];
    let avg = group_by(
        &recs,
        Dimension::Brand,
        MeasureSelector::field(Measure::Price),
        Reduction::Average,
    );
    assert_eq!(avg.get("Acme"), Some(15.0));
    assert_eq!(avg.buckets[0].count, 2);
}

#[test]
fn breakdown_percentages_add_up() {
    let recs = sample();
    let slices = breakdown(&recs, Dimension::BladeMaterial, mv());
    let total: f64 = slices.iter().map(|s| s.percent).sum();
    assert!((total - 100.0).abs() < 1e-9);
    assert_eq!(slices[0].key, DimValue::from("Steel"));
}

#[test]
fn pinned_pivot_zero_fills_missing_cells() {
    let recs = sample();
    let table = pivot(
        &recs,
        Dimension::Year,
        Dimension::BladeMaterial,
        mv(),
        Reduction::Sum,
        &ColumnSet::Pinned(vec!["Steel".into(), " Titanium ".into(), "Carbon Fiber".into()]),
    );
    assert_eq!(table.columns, vec!["Carbon Fiber", "Steel", "Titanium"]);
    assert_eq!(table.cell(2024, "Steel"), Some(3000.0));
    assert_eq!(table.cell(2025, "Carbon Fiber"), Some(0.0));
    assert_eq!(table.cell(2025, "Titanium"), Some(0.0));
    assert_eq!(table.column_total("Steel"), 5500.0);
}

#[test]
fn pivot_excludes_unselected_columns() {
    let recs = sample();
    let table = pivot(
        &recs,
        Dimension::Year,
        Dimension::BladeMaterial,
        mv(),
        Reduction::Sum,
        &ColumnSet::Pinned(vec!["Carbon Fiber".into()]),
    );
    assert_eq!(table.columns, vec!["Carbon Fiber"]);
    assert_eq!(table.rows.iter().map(|r| r.total()).sum::<f64>(), 500.0);
}

#[test]
fn stacked_share_drops_all_zero_columns() {
    let recs = sample();
    let table = stacked_share(
        &recs,
        Dimension::Year,
        Dimension::BladeMaterial,
        mv(),
        &ColumnSet::pinned_or_data(["Steel", "Titanium"]),
    );
    assert_eq!(table.columns, vec!["Steel"]);

    let pct = table.row_percentages();
    assert_eq!(pct.cell(2024, "Steel"), Some(100.0));

    let json = table.to_json_rows();
    assert_eq!(json[0]["year"], "2024");
    assert_eq!(json[0]["Steel"], 3000.0);
}

#[test]
fn region_shares_close_to_one_hundred() {
    let recs = sample();
    let rows = region_country_share(&recs, EvaluationMode::ByValue);

    let na_2024: Vec<_> = rows
        .iter()
        .filter(|r| r.period == DimValue::Year(2024) && r.group == "North America")
        .collect();
    assert_eq!(na_2024.len(), 2);
    let canada = na_2024.iter().find(|r| r.member == "Canada").unwrap();
    let usa = na_2024.iter().find(|r| r.member == "USA").unwrap();
    assert!((usa.percentage - 100.0 / 3.0).abs() < 1e-9);
    assert!((canada.percentage - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(format!("{:.1}", usa.percentage), "33.3");
    assert_eq!(format!("{:.1}", canada.percentage), "66.7");
    assert_eq!(usa.label, "2024 - North America");
    // value mode reports US$ million
    assert!((usa.value - 1.0).abs() < 1e-9);

    for period in [2024, 2025] {
        for region in ["North America", "Europe"] {
            let sum: f64 = rows
                .iter()
                .filter(|r| r.period == DimValue::Year(period) && r.group == region)
                .map(|r| r.percentage)
                .sum();
            assert!((sum - 100.0).abs() < 1e-9, "{period} {region}: {sum}");
        }
    }
    // invalid regions are skipped
    assert!(rows.iter().all(|r| r.member != "France"));
}

#[test]
fn volume_mode_plots_raw_units() {
    let recs = sample();
    let rows = region_country_share(&recs, EvaluationMode::ByVolume);
    let usa = rows
        .iter()
        .find(|r| r.period == DimValue::Year(2024) && r.member == "USA")
        .unwrap();
    assert_eq!(usa.value, 10.0);
    assert_eq!(usa.plotted, 10.0);
    assert!((usa.percentage - 25.0).abs() < 1e-9);
}

#[test]
fn zero_group_total_yields_zero_percent() {
    let recs = vec![
        market(2024, "Asia", "Japan", "Steel", 0.0, 0.0),
        market(2024, "Asia", "Korea", "Steel", 0.0, 0.0),
    ];
    let rows = nested_share(
        &recs,
        Dimension::Year,
        Dimension::Region,
        Dimension::Country,
        mv(),
        SharePlot::Percentage,
    );
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.percentage == 0.0 && r.plotted == 0.0));
}

#[test]
fn cross_tab_keeps_the_largest_outer_groups() {
    let recs = sample();
    let cells = cross_tab(&recs, Dimension::Country, Dimension::BladeMaterial, mv(), Some(2));
    let outers: Vec<&str> = cells.iter().map(|c| c.outer.as_str()).collect();
    assert_eq!(outers, vec!["USA", "Canada"]);
    assert_eq!(cells[0].value, 2500.0);
}

#[test]
fn scatter_keeps_records_with_both_coordinates() {
    let mut recs = sample();
    recs.push(Record::new().with_measure(Measure::VolumeUnits, 1.0));
    let points = scatter(
        &recs,
        MeasureSelector::field(Measure::VolumeUnits),
        mv(),
        Dimension::Country,
        3,
    );
    assert_eq!(points.len(), 3);
    assert_eq!(points[0].label.as_deref(), Some("USA"));

    let all = scatter(
        &recs,
        MeasureSelector::field(Measure::VolumeUnits),
        mv(),
        Dimension::Country,
        100,
    );
    assert_eq!(all.len(), 6);
}

#[test]
fn three_record_scenario_end_to_end() {
    let recs = vec![
        Record::new()
            .with_year(2024)
            .with_text(Dimension::Country, "USA")
            .with_text(Dimension::Region, "NA")
            .with_measure(Measure::MarketValueUsd, 1000.0),
        Record::new()
            .with_year(2024)
            .with_text(Dimension::Country, "Canada")
            .with_text(Dimension::Region, "NA")
            .with_measure(Measure::MarketValueUsd, 2000.0),
        Record::new()
            .with_year(2025)
            .with_text(Dimension::Country, "USA")
            .with_text(Dimension::Region, "NA")
            .with_measure(Measure::MarketValueUsd, 500.0),
    ];
    let subset = apply_filters(&recs, &FilterSpec::new().with(Dimension::Year, [2024]));
    assert_eq!(subset.len(), 2);

    let by_country = group_by(&subset, Dimension::Country, mv(), Reduction::Sum);
    let expected: BTreeMap<String, f64> =
        [("USA".to_string(), 1000.0), ("Canada".to_string(), 2000.0)].into();
    assert_eq!(by_country.to_map(), expected);

    let shares = region_country_share(&subset, EvaluationMode::ByValue);
    let pct = |country: &str| {
        shares
            .iter()
            .find(|r| r.group == "NA" && r.member == country)
            .map(|r| format!("{:.1}", r.percentage))
    };
    assert_eq!(pct("USA").as_deref(), Some("33.3"));
    assert_eq!(pct("Canada").as_deref(), Some("66.7"));
}

#[test]
fn lead_label_variants_merge_into_one_group() {
    let recs: Vec<Record> = [
        "Hot - scale & centralized sourcing",
        "HOT (large buyer)",
        "hot",
        "Warm - steady procurement",
    ]
    .into_iter()
    .map(|lead| Record::new().with_text(Dimension::LeadPotential, lead))
    .collect();
    let leads = group_by(&recs, Dimension::LeadPotential, MeasureSelector::Count, Reduction::Sum);
    assert_eq!(leads.len(), 2);
    assert_eq!(leads.get("Hot"), Some(3.0));
    assert_eq!(leads.get("Warm"), Some(1.0));
}

#[test]
fn long_labels_sharing_a_prefix_stay_separate() {
    let a = "Excavator shovel/bucket attachments for heavy equipment";
    let b = "Excavator shovel/bucket attachments for light equipment";
    let recs = vec![
        Record::new().with_text(Dimension::IndustrySector, a),
        Record::new().with_text(Dimension::IndustrySector, b),
        Record::new().with_text(Dimension::IndustrySector, b),
    ];
    let series = group_by(&recs, Dimension::IndustrySector, MeasureSelector::Count, Reduction::Sum);
    assert_eq!(series.len(), 2);
    assert_eq!(series.buckets[0].label, series.buckets[1].label);
    assert!(series.buckets[0].label.ends_with("..."));
    assert_eq!(series.get(b), Some(2.0));
    assert_eq!(series.get(a), Some(1.0));
}

#[test]
fn pinned_columns_are_normalized_like_group_keys() {
    let recs = vec![
        Record::new()
            .with_year(2024)
            .with_text(Dimension::LeadPotential, "Hot - scale & centralized sourcing"),
        Record::new()
            .with_year(2024)
            .with_text(Dimension::LeadPotential, "hot"),
    ];
    let table = pivot(
        &recs,
        Dimension::Year,
        Dimension::LeadPotential,
        MeasureSelector::Count,
        Reduction::Sum,
        &ColumnSet::Pinned(vec!["HOT (large buyer)".into(), "undefined".into()]),
    );
    assert_eq!(table.columns, vec!["Hot"]);
    assert_eq!(table.cell(2024, "Hot"), Some(2.0));
}
