//! Writes a [`Report`] to an output directory and previews it on the console.
//!
//! Every table is written even when it has no rows, so the output set is the
//! same shape for every run. Nulls become empty cells.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;

use crate::{
    aggregate::{GroupRow, GroupSummary, MonthlyRow, ProductRank},
    clean::CanonicalRecord,
    describe::{CategoricalSummary, NumericSummary},
    dictionary::DictionaryRow,
    io_utils,
    pipeline::Report,
    schema::{CanonicalField, DerivedField},
    table,
};

pub const CLEAN_FILE: &str = "sales_clean.csv";
pub const NUMERIC_FILE: &str = "desc_numeric.csv";
pub const CATEGORICAL_FILE: &str = "desc_categorical.csv";
pub const MONTHLY_FILE: &str = "monthly_sales.csv";
pub const TOP_PRODUCTS_FILE: &str = "top10_products.csv";
pub const KPI_FILE: &str = "kpi_summary.json";
pub const DICTIONARY_FILE: &str = "data_dictionary.csv";
pub const README_FILE: &str = "README.md";

const PREVIEW_ROWS: usize = 5;

pub fn group_file_name(summary: &GroupSummary) -> String {
    format!("group_by_{}.csv", summary.dimension.slug())
}

/// A row type that can be written as one CSV line.
trait Tabular {
    fn headers() -> Vec<String>;
    fn cells(&self) -> Vec<String>;
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

impl Tabular for CanonicalRecord {
    fn headers() -> Vec<String> {
        CanonicalField::ALL
            .iter()
            .map(|field| field.as_str())
            .chain(DerivedField::ALL.iter().map(|field| field.as_str()))
            .map(str::to_string)
            .collect()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            opt(self.order_id.as_ref()),
            self.order_date.to_string(),
            self.ship_date.to_string(),
            opt(self.ship_mode.as_ref()),
            opt(self.region.as_ref()),
            opt(self.state.as_ref()),
            opt(self.category.as_ref()),
            opt(self.sub_category.as_ref()),
            opt(self.product_name.as_ref()),
            self.sales.to_string(),
            opt(self.profit),
            opt(self.quantity),
            opt(self.discount),
            self.shipping_delay_days.to_string(),
            opt(self.profit_margin),
            self.order_year.to_string(),
            self.order_year_month.to_string(),
        ]
    }
}

impl Tabular for NumericSummary {
    fn headers() -> Vec<String> {
        ["column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"]
            .map(String::from)
            .to_vec()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.column.clone(),
            self.count.to_string(),
            opt(self.mean),
            opt(self.std_dev),
            opt(self.min),
            opt(self.q25),
            opt(self.median),
            opt(self.q75),
            opt(self.max),
        ]
    }
}

impl Tabular for CategoricalSummary {
    fn headers() -> Vec<String> {
        ["column", "count", "distinct", "mode", "mode_frequency"]
            .map(String::from)
            .to_vec()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.column.clone(),
            self.count.to_string(),
            self.distinct.to_string(),
            opt(self.mode.as_ref()),
            self.mode_frequency.to_string(),
        ]
    }
}

impl Tabular for GroupRow {
    fn headers() -> Vec<String> {
        ["key", "total_sales", "total_profit", "margin", "row_count"]
            .map(String::from)
            .to_vec()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.key.clone(),
            self.total_sales.to_string(),
            opt(self.total_profit),
            opt(self.margin),
            self.row_count.to_string(),
        ]
    }
}

impl Tabular for MonthlyRow {
    fn headers() -> Vec<String> {
        ["year_month", "total_sales", "total_profit", "row_count"]
            .map(String::from)
            .to_vec()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.year_month.to_string(),
            self.total_sales.to_string(),
            opt(self.total_profit),
            self.row_count.to_string(),
        ]
    }
}

impl Tabular for ProductRank {
    fn headers() -> Vec<String> {
        [
            "rank",
            "product_name",
            "total_sales",
            "total_profit",
            "margin",
            "row_count",
        ]
        .map(String::from)
        .to_vec()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.rank.to_string(),
            self.product_name.clone(),
            self.total_sales.to_string(),
            opt(self.total_profit),
            opt(self.margin),
            self.row_count.to_string(),
        ]
    }
}

impl Tabular for DictionaryRow {
    fn headers() -> Vec<String> {
        ["column", "semantic_type", "role", "required", "description"]
            .map(String::from)
            .to_vec()
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.column.clone(),
            self.semantic_type.clone(),
            self.role.clone(),
            self.required.to_string(),
            self.description.clone(),
        ]
    }
}

fn write_csv(path: &Path, headers: &[String], rows: &[Vec<String>]) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path)?;
    writer
        .write_record(headers)
        .with_context(|| format!("Writing header to {path:?}"))?;
    for row in rows {
        writer
            .write_record(row)
            .with_context(|| format!("Writing row to {path:?}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("Flushing {path:?}"))?;
    Ok(())
}

fn write_rows<T: Tabular>(path: &Path, rows: &[T]) -> Result<()> {
    let cells = rows.iter().map(Tabular::cells).collect::<Vec<_>>();
    write_csv(path, &T::headers(), &cells)
}

/// Group files name their key column after the dimension, e.g. `region`.
fn group_headers(summary: &GroupSummary) -> Vec<String> {
    let mut headers = GroupRow::headers();
    headers[0] = summary.dimension.field().as_str().to_string();
    headers
}

fn write_group(path: &Path, summary: &GroupSummary) -> Result<()> {
    let cells = summary.rows.iter().map(Tabular::cells).collect::<Vec<_>>();
    write_csv(path, &group_headers(summary), &cells)
}

fn render_readme(report: &Report, files: &[String]) -> String {
    let kpi = &report.kpi;
    let mut out = String::new();
    let _ = writeln!(out, "# Sales digest\n");
    let _ = writeln!(out, "- Input: `{}`", kpi.input_file);
    if let Some(sha) = &kpi.input_sha256 {
        let _ = writeln!(out, "- SHA-256: `{sha}`");
    }
    let _ = writeln!(out, "- Run id: `{}`", kpi.run_id);
    let _ = writeln!(out, "- Generated at: {}", kpi.generated_at.to_rfc3339());
    let _ = writeln!(
        out,
        "- Rows: {} read, {} kept, {} dropped",
        kpi.input_rows, kpi.surviving_rows, kpi.dropped_rows
    );
    for (reason, count) in report.context.drops() {
        let _ = writeln!(out, "  - {reason}: {count}");
    }
    for (anomaly, count) in report.context.anomalies() {
        let _ = writeln!(out, "- Nulled {}: {count}", anomaly.key());
    }
    if report.context.parse_failure_total() > 0 {
        let _ = writeln!(
            out,
            "- Unparseable values nulled: {}",
            report.context.parse_failure_total()
        );
    }
    let _ = writeln!(out, "\n## Files\n");
    for file in files {
        let _ = writeln!(out, "- `{file}`");
    }
    out
}

/// Writes the full output set into `dir`, creating it when needed.
pub fn write_report(report: &Report, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Creating output directory {dir:?}"))?;
    let mut files: Vec<String> = Vec::new();
    let mut target = |name: &str| {
        files.push(name.to_string());
        dir.join(name)
    };

    write_rows(&target(CLEAN_FILE), report.cleaned.records())?;
    write_rows(&target(NUMERIC_FILE), &report.numeric)?;
    write_rows(&target(CATEGORICAL_FILE), &report.categorical)?;
    for summary in &report.groups {
        write_group(&target(&group_file_name(summary)), summary)?;
    }
    write_rows(&target(MONTHLY_FILE), &report.monthly)?;
    write_rows(&target(TOP_PRODUCTS_FILE), &report.top_products)?;

    let kpi_path = target(KPI_FILE);
    let json = serde_json::to_string_pretty(&report.kpi).context("Serializing KPI summary")?;
    fs::write(&kpi_path, json).with_context(|| format!("Writing {kpi_path:?}"))?;

    write_rows(&target(DICTIONARY_FILE), &report.dictionary)?;

    let readme_path = target(README_FILE);
    let readme = render_readme(report, &files);
    fs::write(&readme_path, readme).with_context(|| format!("Writing {readme_path:?}"))?;

    info!("Wrote {} file(s) to {dir:?}", files.len());
    Ok(files.iter().map(|name| dir.join(name)).collect())
}

fn preview<T: Tabular>(title: &str, headers: Vec<String>, rows: &[T]) {
    println!("\n{title}");
    let cells = rows
        .iter()
        .take(PREVIEW_ROWS)
        .map(Tabular::cells)
        .collect::<Vec<_>>();
    table::print_table(&headers, &cells);
}

pub fn print_preview(report: &Report) {
    let kpi_rows = report
        .kpi
        .entries()
        .into_iter()
        .map(|(key, value)| vec![key, value])
        .collect::<Vec<_>>();
    table::print_table(&["kpi".to_string(), "value".to_string()], &kpi_rows);

    if let Some(summary) = report.groups.first() {
        preview(
            &format!("Sales by {}", summary.dimension.field()),
            group_headers(summary),
            &summary.rows,
        );
    }
    preview(
        "Top products",
        ProductRank::headers(),
        &report.top_products,
    );
}
