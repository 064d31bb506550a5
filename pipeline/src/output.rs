//! Output formatting for run and check reports.

use docgate_core::{Decision, DocOrigin, OutcomeRecord};

use crate::report::{CheckReport, RunReport};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
}

/// Formats a run report in the requested output format.
pub fn format_report(report: &RunReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(report_to_markdown(report)),
        OutputFormat::Table => Ok(report_to_table(report)),
    }
}

/// Formats a check report in the requested output format.
pub fn format_check(report: &CheckReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(check_to_markdown(report)),
        OutputFormat::Table => Ok(check_to_table(report)),
    }
}

/// Short human-readable explanation of a record's decision.
pub fn record_detail(record: &OutcomeRecord) -> String {
    match record.decision {
        Decision::Skipped => record
            .skip_reason
            .map(|r| r.to_string())
            .unwrap_or_default(),
        Decision::Failed => record.error_detail().unwrap_or_default(),
        Decision::Kept | Decision::Applied => record
            .heuristic
            .as_ref()
            .map(|h| {
                let rules = h.rules();
                if rules.is_empty() {
                    "checks passed".to_string()
                } else {
                    rules
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                }
            })
            .unwrap_or_default(),
    }
}

fn report_to_markdown(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("## Documentation Report\n\n");
    if report.dry_run {
        out.push_str("_Dry run: no files were written._\n\n");
    }
    out.push_str("| Kept | Applied | Skipped | Failed |\n");
    out.push_str("|------|---------|---------|--------|\n");
    out.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        report.totals.kept, report.totals.applied, report.totals.skipped, report.totals.failed
    ));
    out.push_str(&format!(
        "**Generator calls:** {}  **Tokens:** {}  **Estimated cost:** ${:.4}\n\n",
        report.usage.calls,
        report.usage.total_tokens(),
        report.usage.cost_usd
    ));

    for file in &report.files {
        out.push_str(&format!("### `{}`\n\n", file.path));
        if let Some(ref error) = file.error {
            out.push_str(&format!("- **Error:** {error}\n\n"));
            continue;
        }

        let touched: Vec<&OutcomeRecord> = file
            .records
            .iter()
            .filter(|r| matches!(r.decision, Decision::Applied | Decision::Failed))
            .collect();
        if touched.is_empty() {
            out.push_str("No documentation changes.\n\n");
            continue;
        }

        out.push_str("| Unit | Line | Decision | Detail |\n");
        out.push_str("|------|------|----------|--------|\n");
        for record in &touched {
            out.push_str(&format!(
                "| `{}` | {} | {} | {} |\n",
                record.unit.id(),
                record.unit.edit_line(),
                record.decision,
                record_detail(record).replace('|', "\\|")
            ));
        }
        out.push('\n');

        for (unit, alternatives) in &file.alternatives {
            out.push_str(&format!(
                "<details>\n<summary>Alternatives for <code>{unit}</code></summary>\n\n"
            ));
            for alt in alternatives {
                let label = match alt.origin {
                    DocOrigin::Previous => "Previous documentation".to_string(),
                    DocOrigin::Generated => format!("Variant {}", alt.variant + 1),
                };
                out.push_str(&format!("**{label}**\n\n```java\n{}\n```\n\n", alt.text));
            }
            out.push_str("</details>\n\n");
        }
    }

    out
}

fn report_to_table(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Kept: {}  Applied: {}  Skipped: {}  Failed: {}  Cost: ${:.4}",
        report.totals.kept,
        report.totals.applied,
        report.totals.skipped,
        report.totals.failed,
        report.usage.cost_usd
    ));
    if report.dry_run {
        out.push_str("  (dry run)");
    }
    out.push('\n');

    for file in &report.files {
        out.push_str(&format!("\n{}\n", file.path));
        if let Some(ref error) = file.error {
            out.push_str(&format!("  error: {error}\n"));
            continue;
        }

        let max_name = file
            .records
            .iter()
            .map(|r| r.unit.id().as_str().len())
            .max()
            .unwrap_or(4);
        for record in &file.records {
            out.push_str(&format!(
                "  {:<width$}  {:<8}  {}\n",
                record.unit.id(),
                record.decision.to_string(),
                record_detail(record),
                width = max_name
            ));
        }
    }

    out
}

fn check_to_markdown(report: &CheckReport) -> String {
    let mut out = String::new();

    out.push_str("## Documentation Check\n\n");
    out.push_str(&format!(
        "- **Units checked:** {}\n- **Units failing checks:** {}\n\n",
        report.checked(),
        report.finding_count()
    ));

    for file in &report.files {
        if file.error.is_none() && file.findings.is_empty() {
            continue;
        }
        out.push_str(&format!("### `{}`\n\n", file.path));
        if let Some(ref error) = file.error {
            out.push_str(&format!("- **Error:** {error}\n\n"));
            continue;
        }
        for finding in &file.findings {
            out.push_str(&format!("- `{}` (line {})\n", finding.unit, finding.line));
            for violation in &finding.violations {
                out.push_str(&format!("  - {}: {}\n", violation.rule, violation.detail));
            }
        }
        out.push('\n');
    }

    out
}

fn check_to_table(report: &CheckReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Checked: {}  Failing: {}\n",
        report.checked(),
        report.finding_count()
    ));
    for file in &report.files {
        if let Some(ref error) = file.error {
            out.push_str(&format!("{}: error: {error}\n", file.path));
            continue;
        }
        for finding in &file.findings {
            let rules = finding
                .violations
                .iter()
                .map(|v| v.rule.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "{}:{}: {}  [{rules}]\n",
                file.path, finding.line, finding.unit
            ));
        }
    }

    out
}
