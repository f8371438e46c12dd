use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use market_lens::aggregate::{self, ColumnSet};
use market_lens::filter::{self, FilterSpec};
use market_lens::{
    Dashboard, Dimension, EngineConfig, EvaluationMode, FilterState, MeasureSelector,
    PageConfig, Record, RecordStore, Reduction, stats, storage,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "market-lens",
    version,
    about = "Filter, aggregate & summarize market-research demo datasets"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the distinct values of dimensions (the dropdown options).
    Options(OptionsArgs),
    /// Filter records and print or save them.
    Filter(FilterArgs),
    /// Aggregate filtered records into a chart series (JSON).
    Chart(ChartArgs),
    /// Evaluate the KPI cards of a page.
    Kpi(KpiArgs),
    /// Print descriptive statistics of a measure per group.
    Stats(StatsArgs),
    /// Evaluate a whole page and print the snapshot (JSON).
    Dashboard(DashboardArgs),
    /// List built-in page presets, or print one as JSON.
    Pages(PagesArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum Evaluation {
    #[default]
    Value,
    Volume,
}

impl From<Evaluation> for EvaluationMode {
    fn from(e: Evaluation) -> Self {
        match e {
            Evaluation::Value => EvaluationMode::ByValue,
            Evaluation::Volume => EvaluationMode::ByVolume,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default)]
enum Shape {
    #[default]
    Grouped,
    Breakdown,
    Pivot,
    Stacked,
    RegionShare,
    CrossTab,
}

#[derive(Args, Debug)]
struct Input {
    /// Records file (.json array or .csv with camelCase headers).
    #[arg(short, long)]
    data: PathBuf,
    /// Filter clause <dimension>=<value>[,<value>...]; repeat for several dimensions.
    #[arg(short = 'w', long = "where")]
    filters: Vec<String>,
}

impl Input {
    fn load(&self) -> Result<Vec<Record>> {
        storage::load_records(&self.data)
            .with_context(|| format!("failed to load {}", self.data.display()))
    }

    fn spec(&self) -> Result<FilterSpec> {
        let mut spec = FilterSpec::new();
        for clause in &self.filters {
            spec.parse_clause(clause)?;
        }
        Ok(spec)
    }

    fn filtered(&self) -> Result<Vec<Record>> {
        let records = self.load()?;
        Ok(filter::apply_filters(&records, &self.spec()?))
    }
}

#[derive(Args, Debug)]
struct OptionsArgs {
    #[command(flatten)]
    input: Input,
    /// Dimensions to list (default: every dimension present in the data).
    dimensions: Vec<String>,
}

#[derive(Args, Debug)]
struct FilterArgs {
    #[command(flatten)]
    input: Input,
    /// Save to file instead of printing CSV to stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format. If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Sort by this dimension.
    #[arg(long)]
    sort: Option<String>,
    #[arg(long, default_value_t = false)]
    desc: bool,
    /// 1-based page of the result table.
    #[arg(long)]
    page: Option<usize>,
    #[arg(long, default_value_t = 20)]
    per_page: usize,
}

#[derive(Args, Debug)]
struct ChartArgs {
    #[command(flatten)]
    input: Input,
    #[arg(long, value_enum, default_value_t)]
    shape: Shape,
    /// Grouping (row) dimension.
    #[arg(long, default_value = "year")]
    by: String,
    /// Column / inner dimension for pivot, stacked and cross-tab shapes.
    #[arg(long)]
    columns: Option<String>,
    /// Measure: a measure name, `a|b` fallback, `count`, `volumeRange` or `evaluation`.
    #[arg(long, default_value = "evaluation")]
    measure: String,
    #[arg(long, default_value = "sum")]
    reduction: String,
    #[arg(long, value_enum, default_value_t)]
    evaluation: Evaluation,
    /// Keep only the first N groups.
    #[arg(long)]
    top: Option<usize>,
    /// Pin pivot columns to these values (comma separated).
    #[arg(long)]
    pin: Option<String>,
}

#[derive(Args, Debug)]
struct KpiArgs {
    #[command(flatten)]
    input: Input,
    /// Page preset whose KPI cards are evaluated.
    #[arg(long)]
    page: String,
    #[arg(long, value_enum, default_value_t)]
    evaluation: Evaluation,
    /// Print raw values as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct StatsArgs {
    #[command(flatten)]
    input: Input,
    #[arg(long)]
    by: String,
    #[arg(long)]
    measure: String,
}

#[derive(Args, Debug)]
struct DashboardArgs {
    #[command(flatten)]
    input: Input,
    /// Built-in page preset.
    #[arg(long, conflicts_with = "page_file")]
    page: Option<String>,
    /// Page configuration file (JSON).
    #[arg(long)]
    page_file: Option<PathBuf>,
    /// Engine configuration file (JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t)]
    evaluation: Evaluation,
    /// Start from the page's default selections; --where clauses override them.
    #[arg(long, default_value_t = false)]
    defaults: bool,
}

#[derive(Args, Debug)]
struct PagesArgs {
    /// Print this preset as JSON.
    #[arg(long)]
    show: Option<String>,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Options(args) => cmd_options(args),
        Command::Filter(args) => cmd_filter(args),
        Command::Chart(args) => cmd_chart(args),
        Command::Kpi(args) => cmd_kpi(args),
        Command::Stats(args) => cmd_stats(args),
        Command::Dashboard(args) => cmd_dashboard(args),
        Command::Pages(args) => cmd_pages(args),
    }
}

fn cmd_options(args: OptionsArgs) -> Result<()> {
    let records = args.input.filtered()?;
    let dims: Vec<Dimension> = if args.dimensions.is_empty() {
        Dimension::ALL
            .into_iter()
            .filter(|d| records.iter().any(|r| r.field(*d).is_some()))
            .collect()
    } else {
        args.dimensions
            .iter()
            .map(|d| d.parse())
            .collect::<market_lens::Result<_>>()?
    };
    for (dim, values) in filter::filter_options(&records, &dims) {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        println!("{}: {}", dim, values.join(", "));
    }
    Ok(())
}

fn cmd_filter(args: FilterArgs) -> Result<()> {
    let mut records = args.input.filtered()?;
    if let Some(dim) = &args.sort {
        filter::sort_records(&mut records, dim.parse()?, args.desc);
    }
    let rows: &[Record] = match args.page {
        Some(page) => {
            eprintln!(
                "Page {} of {}",
                page,
                filter::page_count(records.len(), args.per_page)
            );
            filter::paginate(&records, page, args.per_page)
        }
        None => &records,
    };

    match args.out.as_ref() {
        Some(path) => {
            match args.format {
                Some(OutFormat::Csv) => storage::save_csv(rows, path)?,
                Some(OutFormat::Json) => storage::save_json(rows, path)?,
                None => storage::save_records(rows, path)?,
            }
            eprintln!("Saved {} rows to {}", rows.len(), path.display());
        }
        None => match args.format {
            Some(OutFormat::Json) => print_json(&rows)?,
            _ => print!("{}", storage::to_csv_string(rows)?),
        },
    }
    Ok(())
}

fn cmd_chart(args: ChartArgs) -> Result<()> {
    let records = args.input.filtered()?;
    let mode: EvaluationMode = args.evaluation.into();
    let by: Dimension = args.by.parse()?;
    let measure = args.measure.parse::<MeasureSelector>()?.resolve(mode);
    let reduction: Reduction = args.reduction.parse()?;
    let columns = || -> Result<Dimension> {
        let name = args
            .columns
            .as_deref()
            .context("--columns is required for this shape")?;
        Ok(name.parse()?)
    };
    let column_set =
        ColumnSet::pinned_or_data(args.pin.as_deref().map(parse_list).unwrap_or_default());

    match args.shape {
        Shape::Grouped => {
            let series = aggregate::group_by(&records, by, measure, reduction);
            print_json(&match args.top {
                Some(n) => series.top(n),
                None => series,
            })
        }
        Shape::Breakdown => print_json(&aggregate::breakdown(&records, by, measure)),
        Shape::Pivot => {
            let table = aggregate::pivot(&records, by, columns()?, measure, reduction, &column_set);
            print_json(&table.to_json_rows())
        }
        Shape::Stacked => {
            let table = aggregate::stacked_share(&records, by, columns()?, measure, &column_set);
            print_json(&table.to_json_rows())
        }
        Shape::RegionShare => print_json(&aggregate::region_country_share(&records, mode)),
        Shape::CrossTab => print_json(&aggregate::cross_tab(
            &records,
            by,
            columns()?,
            measure,
            args.top,
        )),
    }
}

fn cmd_kpi(args: KpiArgs) -> Result<()> {
    let page = PageConfig::preset(&args.page)?;
    let records = args.input.filtered()?;
    let mode: EvaluationMode = args.evaluation.into();
    let result = stats::summarize(&records, &page.kpi_spec(mode));
    if args.json {
        return print_json(&result);
    }
    let formatter = EngineConfig::default().formatter();
    for (card, entry) in page.kpis.iter().zip(&result.entries) {
        println!(
            "{}: {}",
            card.title,
            formatter.format_kpi(&entry.value, card.format_for(mode))
        );
    }
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> Result<()> {
    let records = args.input.filtered()?;
    let by: Dimension = args.by.parse()?;
    let measure: MeasureSelector = args.measure.parse()?;
    for s in stats::grouped_summary(&records, by, measure) {
        println!(
            "{}  count={} missing={}  min={} max={} mean={} median={}",
            s.key,
            s.count,
            s.missing,
            fmt_opt(s.min),
            fmt_opt(s.max),
            fmt_opt(s.mean),
            fmt_opt(s.median)
        );
    }
    Ok(())
}

fn cmd_dashboard(args: DashboardArgs) -> Result<()> {
    let page = match (&args.page, &args.page_file) {
        (_, Some(path)) => PageConfig::load(path)
            .with_context(|| format!("failed to load page {}", path.display()))?,
        (Some(name), None) => PageConfig::preset(name)?,
        (None, None) => anyhow::bail!("either --page or --page-file is required"),
    };
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let store = RecordStore::new(page.dataset, args.input.load()?);
    let mut dashboard = Dashboard::new(store, page, config)?;

    let mut state = if args.defaults {
        dashboard.default_state()
    } else {
        FilterState::default()
    };
    state.evaluation = args.evaluation.into();
    let overrides = args.input.spec()?;
    for (dim, values) in overrides.active() {
        state.spec.set(dim, values.clone());
    }

    print_json(dashboard.snapshot(&state)?)
}

fn cmd_pages(args: PagesArgs) -> Result<()> {
    match args.show {
        Some(name) => println!("{}", PageConfig::preset(&name)?.to_json()?),
        None => {
            for name in PageConfig::PRESETS {
                let page = PageConfig::preset(name)?;
                println!(
                    "{:<22} {:<22} {} charts, {} KPIs",
                    name,
                    page.dataset.as_str(),
                    page.charts.len(),
                    page.kpis.len()
                );
            }
        }
    }
    Ok(())
}
