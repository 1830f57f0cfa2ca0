use crate::report::report_model::RunReport;

/// Format a run report for terminal output.
///
/// Produces output like:
/// ```text
/// === Target: Fuelio (com.kajda.fuelio) via gpt-4o ===
///
/// ✓ PASS  Trial 1 (2 fields)
///     com.kajda.fuelio:id/odometer = 12345
/// ✗ FAIL  Trial 2 (0 fields)
///     [ERROR] app com.kajda.fuelio did not reach the foreground
///
/// === Results: 1 passed, 1 failed (2 total) ===
/// ```
pub fn format_console_report(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Target: {} ({}) via {} ===\n\n",
        report.app_name, report.package_name, report.model_type
    ));

    for trial in &report.trials {
        let marker = if trial.passed {
            "\u{2713} PASS"
        } else {
            "\u{2717} FAIL"
        };

        out.push_str(&format!(
            "{}  Trial {} ({} fields)\n",
            marker,
            trial.seq,
            trial.values.len()
        ));

        for (field, value) in &trial.values {
            out.push_str(&format!("    {} = {}\n", field, value));
        }

        if let Some(ref error) = trial.error {
            out.push_str(&format!("    [ERROR] {}\n", error));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed ({} total)",
        report.passed, report.failed, report.total
    ));

    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");

    out
}
