use super::run_result::{Phase, RunResult};
use console::style;
use rust_i18n::t;
use std::fmt::Write;

fn phase_label(phase: Phase) -> String {
    match phase {
        Phase::Walk => t!("phase.walk").to_string(),
        Phase::Transcode => t!("phase.transcode").to_string(),
        Phase::Thumbnail => t!("phase.thumbnail").to_string(),
    }
}

/// 產生執行摘要文字
#[must_use]
pub fn render_summary(result: &RunResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", style(t!("summary.title")).cyan().bold());
    let _ = writeln!(out, "{}", style("========").cyan());

    let _ = writeln!(
        out,
        "{}",
        t!("summary.transcoded", count = result.transcoded.len())
    );
    for record in &result.transcoded {
        let _ = writeln!(
            out,
            "  - {} → {}",
            record.input.display(),
            record.output.display()
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        t!("summary.thumbnails", count = result.thumbnails.len())
    );
    for path in &result.thumbnails {
        let _ = writeln!(out, "  - {}", path.display());
    }

    let skipped = result.skipped_existing + result.skipped_busy + result.skipped_thumbnails;
    if skipped > 0 {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            style(t!(
                "summary.skipped",
                existing = result.skipped_existing,
                busy = result.skipped_busy,
                thumbnails = result.skipped_thumbnails
            ))
            .dim()
        );
    }

    if result.has_errors() {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{}",
            style(t!("summary.errors", count = result.errors.len())).red()
        );
        for failure in &result.errors {
            let _ = writeln!(
                out,
                "  - {}: [{}] {}",
                failure.path.display(),
                phase_label(failure.phase),
                failure.message
            );
        }
    }

    if result.interrupted {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style(t!("summary.interrupted")).yellow());
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{}",
        t!(
            "summary.completed",
            secs = format!("{:.1}", result.elapsed_secs)
        )
    );

    out
}

pub fn print_summary(result: &RunResult) {
    print!("{}", render_summary(result));
}
