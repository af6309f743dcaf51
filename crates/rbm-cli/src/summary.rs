use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use rbm_cli::pipeline::RunResult;
use rbm_model::{ALL_PERIODS, MetricTables, Severity};
use rbm_store::{RunSummary, Snapshot};

pub fn print_run(result: &RunResult) {
    match &result.published {
        Some(published) => {
            println!("Snapshot: {}", published.run_id);
            println!("Path: {}", published.path.display());
            if !published.pruned.is_empty() {
                println!("Pruned: {}", published.pruned.join(", "));
            }
        }
        None => println!("Dry run: snapshot not published"),
    }
    print_run_summary(&result.output.summary);
    println!("Demographics (DM): {} rows", result.output.demographics.len());
    print_metrics(&result.output.metrics);
}

pub fn print_snapshot(snapshot: &Snapshot) {
    let manifest = snapshot.manifest();
    println!("Snapshot: {}", manifest.run_id);
    println!("Created: {}", manifest.created_at.to_rfc3339());
    print_run_summary(&manifest.summary);
    println!("Demographics (DM): {} rows", snapshot.demographics().len());
    print_metrics(snapshot.metrics());
}

fn print_run_summary(summary: &RunSummary) {
    println!("Study: {}", summary.study_id);
    println!(
        "Rows: {} read, {} rejected",
        summary.rows_read, summary.rows_rejected
    );
    println!(
        "Records: {} subjects, {} adverse events, {} unassigned patients",
        summary.subjects, summary.adverse_events, summary.unassigned_patients
    );
    println!(
        "Findings: {} ({} failures, {} warnings), quality score {:.2}",
        summary.findings, summary.failures, summary.warnings, summary.quality_score
    );
}

fn print_metrics(metrics: &MetricTables) {
    print_site_table(metrics);
    print_safety_table(metrics);
    print_quality_table(metrics);
}

fn print_site_table(metrics: &MetricTables) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Site"),
        header_cell("Enrolled"),
        header_cell("Submitted"),
        header_cell("Target"),
        header_cell("Rate"),
        header_cell("AEs"),
        header_cell("Mean age"),
        header_cell("First"),
        header_cell("Last"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for site in &metrics.site_metrics {
        table.add_row(vec![
            Cell::new(&site.site_id)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(site.enrolled),
            Cell::new(site.submitted),
            Cell::new(site.target),
            rate_cell(site.enrollment_rate),
            Cell::new(site.ae_count),
            optional_cell(site.mean_age.map(|age| format!("{age:.1}"))),
            optional_cell(site.first_enrollment.map(|date| date.to_string())),
            optional_cell(site.last_enrollment.map(|date| date.to_string())),
        ]);
    }
    let enrolled = metrics.total_enrolled();
    let target: u32 = metrics.site_metrics.iter().map(|site| site.target).sum();
    let events: usize = metrics.site_metrics.iter().map(|site| site.ae_count).sum();
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(enrolled).add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(target).add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(events).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!();
    println!("Sites:");
    println!("{table}");
}

/// All-time rows only; monthly rows stay in the snapshot.
fn print_safety_table(metrics: &MetricTables) {
    let mut table = Table::new();
    let mut header = vec![header_cell("Site")];
    header.extend(Severity::ALL.iter().map(|severity| header_cell(severity.as_str())));
    table.set_header(header);
    apply_table_style(&mut table);
    for index in 1..=Severity::ALL.len() {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for site in &metrics.site_metrics {
        let mut row = vec![Cell::new(&site.site_id).fg(Color::Blue)];
        for severity in Severity::ALL {
            let cell = match metrics.safety(&site.site_id, severity) {
                Some(metric) if metric.event_count > 0 => Cell::new(format!(
                    "{} ({:.2}/100)",
                    metric.event_count, metric.rate_per_100
                ))
                .fg(severity_color(severity)),
                Some(_) => dim_cell(0),
                None => dim_cell("-"),
            };
            row.push(cell);
        }
        table.add_row(row);
    }
    println!();
    println!("Safety ({ALL_PERIODS}):");
    println!("{table}");
}

fn print_quality_table(metrics: &MetricTables) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Record type"),
        header_cell("Total"),
        header_cell("Valid"),
        header_cell("Warning"),
        header_cell("Invalid"),
        header_cell("Excluded"),
        header_cell("Completeness %"),
        header_cell("Compliance %"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for quality in &metrics.quality_metrics {
        table.add_row(vec![
            Cell::new(quality.record_type.as_str()),
            Cell::new(quality.total),
            Cell::new(quality.valid),
            count_cell(quality.warning, Color::Yellow),
            count_cell(quality.invalid, Color::Red),
            count_cell(quality.excluded, Color::Yellow),
            Cell::new(format!("{:.2}", quality.completeness_pct)),
            Cell::new(format!("{:.2}", quality.compliance_pct)),
        ]);
    }
    println!();
    println!("Data quality:");
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn rate_cell(rate: f64) -> Cell {
    let color = if rate >= 1.0 {
        Color::Green
    } else if rate >= 0.5 {
        Color::Yellow
    } else {
        Color::Red
    };
    Cell::new(format!("{:.1}%", rate * 100.0)).fg(color)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<String>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Mild => Color::Green,
        Severity::Moderate => Color::Yellow,
        Severity::Severe | Severity::LifeThreatening => Color::Red,
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
