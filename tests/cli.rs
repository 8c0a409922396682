mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use sales_digest::schema::CanonicalSchema;

use common::{TestWorkspace, fixture_path, superstore_csv};

const OUTPUT_FILES: [&str; 12] = [
    "sales_clean.csv",
    "desc_numeric.csv",
    "desc_categorical.csv",
    "group_by_category.csv",
    "group_by_subcategory.csv",
    "group_by_region.csv",
    "group_by_state.csv",
    "monthly_sales.csv",
    "top10_products.csv",
    "kpi_summary.json",
    "data_dictionary.csv",
    "README.md",
];

fn bin() -> Command {
    Command::cargo_bin("sales-digest").expect("binary exists")
}

#[test]
fn run_writes_full_output_set_and_previews() {
    let workspace = TestWorkspace::new();
    let out = workspace.path().join("out");
    bin()
        .args(["run", "-i"])
        .arg(fixture_path("orders_sample.csv"))
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("surviving_rows")
                .and(predicate::str::contains("Top products")),
        );

    for name in OUTPUT_FILES {
        assert!(out.join(name).exists(), "{name} missing");
    }

    let kpi: serde_json::Value =
        serde_json::from_str(&workspace.read("out/kpi_summary.json")).expect("kpi json");
    assert_eq!(kpi["input_rows"], 11);
    assert_eq!(kpi["surviving_rows"], 8);
    assert_eq!(kpi["dropped_rows"], 3);
    assert_eq!(kpi["dropped_duplicate"], 1);
    assert_eq!(kpi["nulled_negative_quantity"], 1);
    assert_eq!(kpi["date_range_end"], "2017-09-30");

    let readme = workspace.read("out/README.md");
    assert!(readme.contains("exact duplicate: 1"));
    assert!(readme.contains("`group_by_state.csv`"));
}

#[test]
fn quiet_run_prints_nothing_to_stdout() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "orders.csv",
        &superstore_csv(&[
            "A-1,1/5/2023,1/7/2023,Standard Class,West,California,Furniture,Chairs,Chair,100,2,0,10",
        ]),
    );
    bin()
        .args(["run", "--quiet", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(workspace.path().join("out"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    let numeric = workspace.read("out/desc_numeric.csv");
    assert!(numeric.starts_with("column,count,mean,std,min,25%,50%,75%,max"));
}

#[test]
fn run_reads_tsv_from_stdin() {
    let workspace = TestWorkspace::new();
    let tsv = superstore_csv(&[
        "A-1,1/5/2023,1/7/2023,Standard Class,West,California,Furniture,Chairs,Chair,100,2,0,10",
    ])
    .replace(',', "\t");
    bin()
        .args(["run", "-q", "-i", "-", "--delimiter", "tab", "-o"])
        .arg(workspace.path())
        .write_stdin(tsv)
        .assert()
        .success();
    let clean = workspace.read("sales_clean.csv");
    assert_eq!(clean.lines().count(), 2);
    assert!(clean.contains("A-1,2023-01-05,2023-01-07"));
}

#[test]
fn missing_required_column_fails_without_outputs() {
    let workspace = TestWorkspace::new();
    let input = workspace.write(
        "orders.csv",
        "Order ID,Order Date,Ship Date,Product Name\nA-1,1/5/2023,1/7/2023,Chair\n",
    );
    let out = workspace.path().join("out");
    bin()
        .args(["run", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("missing required column(s)")
                .and(predicate::str::contains("sales")),
        );
    assert!(!out.exists());
}

#[test]
fn empty_input_fails() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("empty.csv", "");
    bin()
        .args(["run", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(workspace.path().join("out"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no header row"));
}

#[test]
fn schema_command_writes_editable_default() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("schema.yml");
    bin()
        .args(["schema", "-o"])
        .arg(&path)
        .assert()
        .success();
    let loaded = CanonicalSchema::load(&path).expect("load schema");
    assert_eq!(loaded, CanonicalSchema::superstore());
}

#[test]
fn edited_schema_changes_header_binding() {
    let workspace = TestWorkspace::new();
    let mut schema = CanonicalSchema::superstore();
    for column in &mut schema.columns {
        if column.field == sales_digest::schema::CanonicalField::Sales {
            column.aliases.push("Net Revenue".to_string());
        }
    }
    let schema_path = workspace.path().join("schema.yml");
    schema.save(&schema_path).expect("save schema");
    let input = workspace.write(
        "orders.csv",
        &superstore_csv(&[
            "A-1,1/5/2023,1/7/2023,Standard Class,West,California,Furniture,Chairs,Chair,100,2,0,10",
        ])
        .replacen("Sales", "Net Revenue", 1),
    );
    bin()
        .args(["run", "-q", "-i"])
        .arg(&input)
        .arg("--schema")
        .arg(&schema_path)
        .arg("-o")
        .arg(workspace.path().join("out"))
        .assert()
        .success();
    let kpi = workspace.read("out/kpi_summary.json");
    assert!(kpi.contains("\"total_sales\": \"100\""));
}

#[test]
fn unknown_encoding_is_rejected() {
    let workspace = TestWorkspace::new();
    bin()
        .args(["run", "-i"])
        .arg(fixture_path("orders_sample.csv"))
        .args(["--input-encoding", "klingon", "-o"])
        .arg(workspace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown encoding"));
}
