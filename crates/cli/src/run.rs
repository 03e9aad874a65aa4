//! `stockmerge run` and `stockmerge validate`.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use stockmerge_io::layout::{arrange, GroupBy};
use stockmerge_io::{read_table, write_table, OutputFormat, WriteResult};
use stockmerge_recon::columns::ColumnOverrides;
use stockmerge_recon::config::{validate_sheet_name, LocationSource, DEFAULT_OUTPUT};
use stockmerge_recon::load::{load_location, load_products, PRODUCTS_SOURCE};
use stockmerge_recon::matcher::{record_key, ProductKeys};
use stockmerge_recon::model::{JoinSummary, Table};
use stockmerge_recon::{
    DuplicatePolicy, InputError, JobConfig, JoinInput, JoinOptions, KeyStrategy, Location, Placement,
    Separator,
};

use crate::{CliError, RunArgs};

/// Log target for `--debug-keys` output, enabled on its own.
pub const KEYS_LOG_TARGET: &str = "stockmerge::keys";

/// Everything one run needs, after the job file and flags are merged.
#[derive(Debug)]
struct Plan {
    name: Option<String>,
    products: Option<PathBuf>,
    product_overrides: ColumnOverrides,
    locations: BTreeMap<Location, (PathBuf, ColumnOverrides)>,
    options: JoinOptions,
    placement: Placement,
    group_by: Option<GroupBy>,
    separator: Separator,
    sheet_name: String,
    output: PathBuf,
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let job = read_job(&config_path)?;
    let locations = job.resolved_locations().map_err(|e| CliError::job(e.to_string()))?;

    let names: Vec<&str> = locations.keys().map(|l| l.name()).collect();
    println!(
        "{}: ok ({} location(s): {})",
        job.name.as_deref().unwrap_or("job"),
        names.len(),
        if names.is_empty() { "none".to_string() } else { names.join(", ") },
    );
    if job.products.is_none() {
        eprintln!("note: no product list set; pass --products when running");
    }
    Ok(())
}

pub fn cmd_run(args: RunArgs, quiet: bool) -> Result<(), CliError> {
    let (job, base_dir) = match &args.config {
        Some(path) => {
            let job = read_job(path)?;
            let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            (job, base)
        }
        None => (JobConfig::default(), PathBuf::from(".")),
    };

    let plan = build_plan(&args, job, &base_dir)?;
    tracing::info!(
        products = ?plan.products,
        locations = plan.locations.len(),
        strategy = %plan.options.strategy,
        "starting join"
    );

    // Load inputs
    let products = match &plan.products {
        Some(path) => {
            let table = read_input(path, PRODUCTS_SOURCE)?;
            Some(load_products(&table, &plan.product_overrides)?)
        }
        None => None,
    };

    let mut inventories = BTreeMap::new();
    for (location, (path, overrides)) in &plan.locations {
        let table = read_input(path, location.name())?;
        let inventory = load_location(*location, &table, overrides, plan.options.strategy)?;
        tracing::debug!("{location}: {} stock rows from {}", inventory.records.len(), path.display());
        inventories.insert(*location, inventory);
    }

    let input = JoinInput { products, locations: inventories };
    if let Some(limit) = args.debug_keys {
        log_sample_keys(&input, plan.options.strategy, limit);
    }

    // Join + render
    let result = stockmerge_recon::run(&input, &plan.options)?;
    let table = result.to_table(plan.placement);
    let arranged = arrange(&table, plan.group_by.as_ref(), plan.separator)
        .map_err(|e| CliError::input(e).with_hint("--group-by takes a product list column name or \"auto\""))?;

    let written = if args.dry_run {
        None
    } else {
        let written = write_table(&plan.output, &arranged, &plan.sheet_name).map_err(CliError::output)?;
        Some(written)
    };

    if args.json {
        let report = RunReport::new(&plan, &result.summary, &result.warnings, written.as_ref(), args.dry_run);
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::unexpected(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    }

    if !quiet {
        print_summary(&plan, &result.summary, result.warnings.len(), written.as_ref());
    }

    Ok(())
}

/// Show the keys the join will compare, to explain unexpected misses.
fn log_sample_keys(input: &JoinInput, strategy: KeyStrategy, limit: usize) {
    if let Some(products) = &input.products {
        let keys: Vec<String> = products
            .records
            .iter()
            .take(limit)
            .map(|r| ProductKeys::for_product(r, strategy).primary)
            .collect();
        tracing::debug!(target: KEYS_LOG_TARGET, "{PRODUCTS_SOURCE}: first keys {:?}", keys);
    }
    for (location, inventory) in &input.locations {
        let keys: Vec<String> = inventory.records.iter().take(limit).map(|r| record_key(r, strategy)).collect();
        tracing::debug!(target: KEYS_LOG_TARGET, "{location}: first keys {:?}", keys);
    }
}

fn read_job(path: &Path) -> Result<JobConfig, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::args(format!("cannot read job file {}: {e}", path.display())))?;
    // Every problem inside the file is a job error, including location names
    JobConfig::from_toml(&text).map_err(|e| CliError::job(format!("{}: {e}", path.display())))
}

fn read_input(path: &Path, source: &str) -> Result<Table, CliError> {
    read_table(path, None).map_err(|message| {
        CliError::from(InputError::Unreadable { source: source.to_string(), message })
    })
}

fn build_plan(args: &RunArgs, job: JobConfig, base_dir: &Path) -> Result<Plan, CliError> {
    let mut product_overrides = job.product_overrides();

    let mut locations: BTreeMap<Location, (PathBuf, ColumnOverrides)> = BTreeMap::new();
    for (location, source) in job.resolved_locations().map_err(|e| CliError::job(e.to_string()))? {
        let overrides = job.location_overrides(&source);
        locations.insert(location, (base_dir.join(source.file()), overrides));
    }

    // --location replaces the job file's entry for that location
    let mut flagged = BTreeSet::new();
    for spec in &args.locations {
        let (name, file) = spec
            .split_once('=')
            .filter(|(n, f)| !n.trim().is_empty() && !f.trim().is_empty())
            .ok_or_else(|| {
                CliError::args(format!("invalid --location '{spec}'"))
                    .with_hint("use NAME=FILE, e.g. --location Ecom=ecom.xlsx")
            })?;
        let location: Location = name.parse()?;
        if !flagged.insert(location) {
            return Err(InputError::DuplicateLocation(location.to_string()).into());
        }
        let file = file.trim();
        let overrides = job.location_overrides(&LocationSource::Path(file.to_string()));
        locations.insert(location, (PathBuf::from(file), overrides));
    }

    if let Some(ref key) = args.key_column {
        product_overrides.key = Some(key.clone());
        for (_, overrides) in locations.values_mut() {
            overrides.key = Some(key.clone());
        }
    }
    if let Some(ref stock) = args.stock_column {
        for (_, overrides) in locations.values_mut() {
            overrides.stock = Some(stock.clone());
        }
    }
    if let Some(ref sku) = args.sku_column {
        product_overrides.sku = Some(sku.clone());
        for (_, overrides) in locations.values_mut() {
            overrides.sku = Some(sku.clone());
        }
    }

    let sheet_name = match &args.sheet {
        Some(sheet) => {
            validate_sheet_name(sheet).map_err(|e| CliError::args(e.to_string()))?;
            sheet.clone()
        }
        None => job.sheet_name().to_string(),
    };

    let output = args
        .output
        .clone()
        .or_else(|| job.output.as_ref().map(|o| base_dir.join(o)))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    // Fail before reading any input if the report cannot be produced
    OutputFormat::from_path(&output).map_err(CliError::args)?;

    Ok(Plan {
        products: args.products.clone().or_else(|| job.products.as_ref().map(|p| base_dir.join(p))),
        product_overrides,
        locations,
        options: JoinOptions {
            strategy: args.strategy.unwrap_or(job.matching.strategy),
            duplicates: args.duplicates.unwrap_or(job.matching.duplicates),
        },
        placement: args.placement.unwrap_or(job.layout.placement),
        group_by: args.group_by.as_deref().or(job.layout.group_by.as_deref()).map(GroupBy::parse),
        separator: args.separator.unwrap_or(job.layout.separator),
        sheet_name,
        output,
        name: job.name,
    })
}

fn print_summary(plan: &Plan, summary: &JoinSummary, warnings: usize, written: Option<&WriteResult>) {
    eprintln!(
        "{} products: {} matched ({:.1}%), {} not found in any location",
        summary.total_rows, summary.matched_rows, summary.match_rate, summary.unmatched_rows,
    );
    for (location, matched) in &summary.matched_by_location {
        eprintln!("  {:<8} {} matched", location.name(), matched);
    }
    if warnings > 0 {
        eprintln!("{warnings} warning(s)");
    }
    match written {
        Some(w) => eprintln!("wrote {} rows to {}", w.rows_written, plan.output.display()),
        None => eprintln!("dry run: {} not written", plan.output.display()),
    }
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunReport<'a> {
    meta: ReportMeta,
    summary: &'a JoinSummary,
    inputs: ReportInputs,
    output: Option<ReportOutput>,
    warnings: &'a [String],
}

#[derive(Serialize)]
struct ReportMeta {
    name: Option<String>,
    version: &'static str,
    run_at: String,
    strategy: KeyStrategy,
    duplicates: DuplicatePolicy,
    dry_run: bool,
}

#[derive(Serialize)]
struct ReportInputs {
    products: Option<String>,
    locations: BTreeMap<Location, String>,
}

#[derive(Serialize)]
struct ReportOutput {
    path: String,
    format: &'static str,
    sheet_name: String,
    rows: usize,
    bytes: usize,
    groups_colored: usize,
}

impl<'a> RunReport<'a> {
    fn new(
        plan: &Plan,
        summary: &'a JoinSummary,
        warnings: &'a [String],
        written: Option<&WriteResult>,
        dry_run: bool,
    ) -> Self {
        RunReport {
            meta: ReportMeta {
                name: plan.name.clone(),
                version: env!("CARGO_PKG_VERSION"),
                run_at: chrono::Utc::now().to_rfc3339(),
                strategy: plan.options.strategy,
                duplicates: plan.options.duplicates,
                dry_run,
            },
            summary,
            inputs: ReportInputs {
                products: plan.products.as_ref().map(|p| p.display().to_string()),
                locations: plan
                    .locations
                    .iter()
                    .map(|(l, (path, _))| (*l, path.display().to_string()))
                    .collect(),
            },
            output: written.map(|w| ReportOutput {
                path: plan.output.display().to_string(),
                format: match w.format {
                    OutputFormat::Xlsx => "xlsx",
                    OutputFormat::Csv => "csv",
                    OutputFormat::Tsv => "tsv",
                },
                sheet_name: plan.sheet_name.clone(),
                rows: w.rows_written,
                bytes: w.bytes_written,
                groups_colored: w.groups_colored,
            }),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(toml: &str) -> JobConfig {
        JobConfig::from_toml(toml).unwrap()
    }

    #[test]
    fn job_paths_resolve_against_job_dir() {
        let job = job(r#"
products = "products.csv"
output = "out/report.xlsx"

[locations]
Wari = "wari.csv"
"#);
        let plan = build_plan(&RunArgs::default(), job, Path::new("/jobs")).unwrap();
        assert_eq!(plan.products, Some(PathBuf::from("/jobs/products.csv")));
        assert_eq!(plan.output, PathBuf::from("/jobs/out/report.xlsx"));
        assert_eq!(plan.locations[&Location::Wari].0, PathBuf::from("/jobs/wari.csv"));
        assert_eq!(plan.sheet_name, "Stock");
    }

    #[test]
    fn flags_override_job() {
        let job = job(r#"
products = "products.csv"

[match]
strategy = "title_size"
stock_column = "Qty"

[locations]
Wari = { file = "wari.csv", key_column = "Code" }

[layout]
group_by = "auto"
"#);
        let args = RunArgs {
            locations: vec!["wari=today/wari.xlsx".into(), "Ecom=ecom.csv".into()],
            key_column: Some("SKU".into()),
            strategy: Some(KeyStrategy::Identifier),
            group_by: Some("Phone".into()),
            ..RunArgs::default()
        };
        let plan = build_plan(&args, job, Path::new("/jobs")).unwrap();

        let (wari_path, wari) = &plan.locations[&Location::Wari];
        assert_eq!(wari_path, &PathBuf::from("today/wari.xlsx"));
        assert_eq!(wari.key.as_deref(), Some("SKU"));
        assert_eq!(wari.stock.as_deref(), Some("Qty"));
        assert_eq!(plan.product_overrides.key.as_deref(), Some("SKU"));
        assert_eq!(plan.options.strategy, KeyStrategy::Identifier);
        assert_eq!(plan.group_by, Some(GroupBy::Column("Phone".into())));
        assert_eq!(plan.output, PathBuf::from(DEFAULT_OUTPUT));
    }

    #[test]
    fn sku_flag_reaches_every_file() {
        let job = job(r#"
[locations]
Ecom = { file = "ecom.csv", sku_column = "Ref" }
Sylhet = "sylhet.csv"
"#);
        let args = RunArgs { sku_column: Some("Variant SKU".into()), ..RunArgs::default() };
        let plan = build_plan(&args, job, Path::new(".")).unwrap();
        assert_eq!(plan.product_overrides.sku.as_deref(), Some("Variant SKU"));
        for (_, overrides) in plan.locations.values() {
            assert_eq!(overrides.sku.as_deref(), Some("Variant SKU"));
        }
    }

    #[test]
    fn duplicate_location_flag_is_usage_error() {
        let args = RunArgs {
            locations: vec!["Ecom=a.csv".into(), "ECOM=b.csv".into()],
            ..RunArgs::default()
        };
        let err = build_plan(&args, JobConfig::default(), Path::new(".")).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
    }

    #[test]
    fn malformed_location_flag() {
        for spec in ["Ecom", "=a.csv", "Ecom="] {
            let args = RunArgs { locations: vec![spec.into()], ..RunArgs::default() };
            let err = build_plan(&args, JobConfig::default(), Path::new(".")).unwrap_err();
            assert!(err.hint.is_some(), "{spec}");
        }
    }

    #[test]
    fn unsupported_output_fails_early() {
        let args = RunArgs { output: Some("report.pdf".into()), ..RunArgs::default() };
        let err = build_plan(&args, JobConfig::default(), Path::new(".")).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
    }

    #[test]
    fn bad_sheet_flag() {
        let args = RunArgs { sheet: Some("a:b".into()), ..RunArgs::default() };
        assert!(build_plan(&args, JobConfig::default(), Path::new(".")).is_err());
    }
}
