use market_lens::storage::{load_records, read_csv, save_records, to_csv_string};
use market_lens::{Dimension, FilterSpec, apply_filters, unique_values};
use tempfile::tempdir;

const CSV: &str = "\
year, region ,country,marketValueUsd,volumeUnits
2024,North America, USA ,1000,10
2024,123,456,5,1
2025,Europe,Germany,,7
";

#[test]
fn csv_cells_are_cleaned_on_use_not_on_load() {
    let recs = read_csv(CSV.as_bytes()).unwrap();
    assert_eq!(recs.len(), 3);
    // raw text is kept as loaded
    assert_eq!(recs[0].country.as_deref(), Some(" USA "));
    assert_eq!(recs[2].market_value_usd, None);

    assert_eq!(unique_values(&recs, Dimension::Region).len(), 2);
    let usa = apply_filters(&recs, &FilterSpec::new().with(Dimension::Country, ["USA"]));
    assert_eq!(usa.len(), 1);
}

#[test]
fn exported_subset_reloads_identically() {
    let recs = read_csv(CSV.as_bytes()).unwrap();
    let subset = apply_filters(&recs, &FilterSpec::new().with(Dimension::Year, [2025]));

    let dir = tempdir().unwrap();
    for name in ["subset.csv", "subset.json"] {
        let path = dir.path().join(name);
        save_records(&subset, &path).unwrap();
        assert_eq!(load_records(&path).unwrap(), subset, "{name}");
    }

    let text = to_csv_string(&subset).unwrap();
    assert!(text.starts_with(r#""year","country","region","volumeUnits""#));
}
