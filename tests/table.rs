use sales_digest::table::{Alignment, render_table, render_table_aligned};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[test]
fn render_table_right_aligns_numeric_columns() {
    let headers = strings(&["region", "total_sales"]);
    let rows = vec![strings(&["West", "1200.50"]), strings(&["Central", "-30"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(
        lines,
        vec![
            "region   total_sales",
            "-------  -----------",
            "West         1200.50",
            "Central          -30",
        ]
    );
}

#[test]
fn empty_cells_do_not_block_numeric_alignment() {
    let headers = strings(&["margin"]);
    let rows = vec![strings(&[""]), strings(&["0.25"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines, vec!["margin", "------", "", "  0.25"]);
}

#[test]
fn explicit_alignment_overrides_detection() {
    let headers = strings(&["id", "name"]);
    let rows = vec![strings(&["1", "Alice"]), strings(&["2", "Bob"])];

    let rendered = render_table_aligned(&headers, &rows, &[Alignment::Left, Alignment::Left]);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines, vec!["id  name", "---  -----", "1   Alice", "2   Bob"]);
}

#[test]
fn render_table_normalizes_control_characters() {
    let headers = strings(&["note"]);
    let rows = vec![strings(&["line1\nline2\tvalue"])];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "line1 line2 value");
}

#[test]
fn render_table_handles_unicode_and_ansi_widths() {
    let headers = strings(&["résumé", "status"]);
    let rows = vec![vec!["café".to_string(), "\u{1b}[31mERR\u{1b}[0m".to_string()]];

    let rendered = render_table(&headers, &rows);
    let lines: Vec<&str> = rendered.lines().collect();

    assert_eq!(lines[0], "résumé  status");
    assert_eq!(lines[2], "café    \u{1b}[31mERR\u{1b}[0m");
}
