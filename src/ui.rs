//! Terminal output: spinners and coloured reports.
//!
//! Uses `indicatif` for the progress spinner and `console` for styling.
//! Worklist lines themselves are printed unstyled so they can be piped.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use labflow::{AuditRecord, JobStatus, ValidationError, VolumetricState};

/// Visual progress for one job run.
pub struct RunProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
}

impl RunProgress {
    pub fn start(label: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("RUNNING: {label}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    pub fn complete(&self, job_id: &str, records: usize) {
        self.pb.finish_and_clear();
        println!(
            "  {} Job {job_id} completed ({records} records)",
            self.green.apply_to("✓")
        );
    }

    pub fn fail(&self, job_id: &str, reason: &str) {
        self.pb.finish_and_clear();
        println!("  {} Job {job_id} failed: {reason}", self.red.apply_to("✗"));
    }
}

pub fn print_violations(job_id: &str, errors: &[ValidationError]) {
    let red = Style::new().red().bold();
    let dim = Style::new().dim();
    println!(
        "{} {} violation(s) in job {job_id}",
        red.apply_to("✗"),
        errors.len()
    );
    for error in errors {
        println!(
            "  {} {} {}",
            dim.apply_to(&error.step_id),
            red.apply_to(error.kind),
            error.message
        );
    }
}

pub fn print_ok(message: &str) {
    println!("{} {message}", Style::new().green().bold().apply_to("✓"));
}

pub fn print_records(records: &[String]) {
    for record in records {
        println!("{record}");
    }
}

/// Per-labware totals plus every non-empty well.
pub fn print_volumes(state: &VolumetricState) {
    let header = Style::new().cyan().bold();
    println!();
    println!("{}", header.apply_to("─── Simulated volumes ───"));
    for labware in state.labware() {
        let total = state.total(labware).unwrap_or_default();
        println!("  {labware}: total volume = {total:.2} µL");
        if let Some(volumes) = state.volumes(labware) {
            for (index, volume) in volumes.iter().enumerate() {
                if *volume != 0.0 {
                    let well = u8::try_from(index + 1)
                        .ok()
                        .and_then(labflow::ir::position_to_well)
                        .unwrap_or_default();
                    println!("    {well:>3}: {volume:.2} µL");
                }
            }
        }
    }
}

/// Print the audit record as pretty JSON, coloured by final status.
pub fn print_audit(record: &AuditRecord) {
    let style = match record.status {
        JobStatus::Completed => Style::new().green().bold(),
        JobStatus::Error | JobStatus::Aborted => Style::new().red().bold(),
        _ => Style::new().yellow(),
    };
    println!();
    println!("{}", style.apply_to("─── Audit Record ───"));
    println!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
}
