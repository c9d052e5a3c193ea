//! Colored console output for server events.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::store::TspEvaluation;

/// Inner width of the summary box.
const BOX_WIDTH: usize = 58;

pub fn print_banner() {
    let banner = r#"
  _   _      _                      _      _____ ____  ____
 | \ | | ___| |___      _____  _ __| | __ |_   _/ ___||  _ \
 |  \| |/ _ \ __\ \ /\ / / _ \| '__| |/ /   | | \___ \| |_) |
 | |\  |  __/ |_ \ V  V / (_) | |  |   <    | |  ___) |  __/
 |_| \_|\___|\__| \_/\_/ \___/|_|  |_|\_\   |_| |____/|_|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Network TSP".bright_cyan()
    );
}

pub fn print_listening(addr: SocketAddr) {
    println!(
        "{} {} {} listening on {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Server]".bright_cyan(),
        format!("http://{}", addr).bright_yellow()
    );
}

pub fn print_network_loaded(edges: usize) {
    println!(
        "{} {} {} network loaded: edges ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Network]".bright_cyan(),
        edges.to_formatted_string(&Locale::en).bright_yellow()
    );
}

pub fn print_points_integrated(integrated: usize, total: usize, edges: usize) {
    println!(
        "{} {} {} points integrated ({}), total points ({}), edges after split ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Points]".bright_cyan(),
        integrated.to_formatted_string(&Locale::en).bright_yellow(),
        total.to_formatted_string(&Locale::en).bright_yellow(),
        edges.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints a boxed comparison of the solvers' results.
pub fn print_evaluation(evaluation: &TspEvaluation) {
    println!(
        "{} {} {} evaluation ended: points ({}), methods ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[TSP]".bright_cyan(),
        evaluation.point_count.to_formatted_string(&Locale::en).bright_yellow(),
        evaluation.results.len().to_string().white()
    );

    let best = evaluation
        .results
        .values()
        .map(|r| r.distance)
        .min_by(f64::total_cmp);

    println!();
    println!("{}", format!("╔{}╗", "═".repeat(BOX_WIDTH)).bright_cyan());
    let title = "TSP EVALUATION";
    let pad = BOX_WIDTH - title.len();
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(pad / 2),
        title.bright_green().bold(),
        " ".repeat(pad - pad / 2),
        "║".bright_cyan()
    );
    println!("{}", format!("╠{}╣", "═".repeat(BOX_WIDTH)).bright_cyan());

    for (name, result) in &evaluation.results {
        let value = format!(
            "{} m in {}",
            (result.distance.round() as u64).to_formatted_string(&Locale::en),
            format_duration(Duration::from_secs_f64(result.elapsed_seconds))
        );
        let marker = if Some(result.distance) == best { "★" } else { " " };
        println!(
            "{} {} {:<20}{:>33}  {}",
            "║".bright_cyan(),
            marker.bright_yellow(),
            name,
            value,
            "║".bright_cyan()
        );
    }
    for name in &evaluation.skipped {
        println!(
            "{}   {:<20}{:>33}  {}",
            "║".bright_cyan(),
            name,
            "skipped",
            "║".bright_cyan()
        );
    }

    println!("{}", format!("╚{}╝", "═".repeat(BOX_WIDTH)).bright_cyan());
    println!();
}

/// Formats a duration for humans.
fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1 {
        format!("{}µs", d.as_micros())
    } else if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", total_ms / 60_000, (total_ms % 60_000) / 1000)
    }
}

/// Seconds since the epoch with millisecond precision.
fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}
