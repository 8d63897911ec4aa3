//! User-facing rendering of provisioning results. Library code never prints;
//! everything the user reads goes through here.

use std::path::Path;

use crate::models::{
    CleanupPlan, ExtractOutcome, FetchOutcome, ModelDescriptor, ModelStatus, OutcomeReport,
    ProvisionError, ProvisionOutcome,
};

pub fn print_run_header(models_dir: &Path) {
    println!("Starting model download...");
    let shown = std::path::absolute(models_dir).unwrap_or_else(|_| models_dir.to_path_buf());
    println!("Models will be saved to: {}", shown.display());
}

pub fn print_entry_header(id: &str) {
    println!("\n--- Downloading {id} ---");
}

pub fn print_outcome(result: &Result<ProvisionOutcome, ProvisionError>) {
    match result {
        Ok(outcome) => {
            for line in outcome_lines(outcome) {
                println!("{line}");
            }
        }
        Err(error) => println!("✗ {error}"),
    }
}

pub fn outcome_lines(outcome: &ProvisionOutcome) -> Vec<String> {
    let mut lines = Vec::new();
    match &outcome.fetch {
        Some(FetchOutcome::Skipped(path)) => {
            lines.push(format!("✓ {} already exists, skipping download", file_label(path)));
        }
        Some(FetchOutcome::Downloaded { path, bytes }) => {
            lines.push(format!(
                "✓ Downloaded {} ({})",
                file_label(path),
                format_bytes(*bytes)
            ));
        }
        None => {}
    }
    match &outcome.extract {
        Some(ExtractOutcome::Skipped(path)) => {
            lines.push(format!("✓ {} already extracted", file_label(path)));
        }
        Some(ExtractOutcome::Extracted(path)) => {
            lines.push(format!("✓ Extracted to {}", path.display()));
        }
        None => {}
    }
    if outcome.archive_removed {
        lines.push("✓ Removed archive to free space".to_string());
    }
    lines
}

pub fn summary_lines(report: &OutcomeReport) -> Vec<String> {
    let mut lines = vec![
        String::new(),
        "--- Download Summary ---".to_string(),
        format!(
            "Successfully downloaded: {}/{} models",
            report.succeeded(),
            report.total()
        ),
    ];
    if report.is_success() {
        lines.push("✓ All models downloaded successfully!".to_string());
    } else {
        for (id, error) in report.failures() {
            lines.push(format!("  ✗ {id}: {error}"));
        }
        lines.push("✗ Some models failed to download".to_string());
    }
    lines
}

pub fn print_summary(report: &OutcomeReport) {
    for line in summary_lines(report) {
        println!("{line}");
    }
}

pub fn print_tts_notice() {
    println!("\n--- Setting up TTS models ---");
    println!("TTS models will be downloaded automatically on first use");
    println!("This may take some time depending on your internet connection");
}

pub fn print_status(models_dir: &Path, statuses: &[(&ModelDescriptor, ModelStatus)]) {
    println!("Models directory: {}", models_dir.display());
    for (descriptor, status) in statuses {
        let label = match status {
            ModelStatus::Installed => "installed",
            ModelStatus::Downloaded => "downloaded, not extracted",
            ModelStatus::Missing => "missing",
        };
        println!("  {:<12} {:<26} {}", descriptor.id, label, descriptor.url);
    }
}

pub fn print_cleanup_plan(plan: &CleanupPlan, applying: bool) {
    if plan.is_empty() {
        println!("Nothing to clean up.");
        return;
    }
    println!("Cleanup plan:");
    for item in plan.items() {
        println!(
            "  {} ({}, {}): {}",
            item.path.display(),
            item.id,
            item.reason.describe(),
            format_bytes(item.size_bytes)
        );
    }
    println!("Reclaimable: {}", format_bytes(plan.reclaimable_bytes()));
    if !applying {
        println!("Re-run with --yes to delete these files.");
    }
}

pub fn print_cancelled() {
    eprintln!("\nDownload cancelled by user");
}

pub fn print_usage_hint() {
    eprintln!("Please specify --model <name> or --all");
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
