//! The shared style vocabulary: labels, values, status badges, dividers.
//! Both the one-shot renderers and the TUI use these so the two surfaces
//! cannot drift apart.

use colored::Colorize;

use qsf_supervisor::PaneHealth;

pub fn label(s: &str) -> String {
    format!("{}:", s.bold())
}

pub fn value(s: &str) -> String {
    s.bright_white().to_string()
}

pub fn dim(s: &str) -> String {
    s.dimmed().to_string()
}

pub fn divider() -> String {
    "-".repeat(60).dimmed().to_string()
}

pub fn badge_pass(s: &str) -> String {
    format!("[{}]", s.to_uppercase().bright_green().bold())
}

pub fn badge_warn(s: &str) -> String {
    format!("[{}]", s.to_uppercase().yellow().bold())
}

pub fn badge_fail(s: &str) -> String {
    format!("[{}]", s.to_uppercase().bright_red().bold())
}

pub fn health_badge(health: PaneHealth) -> String {
    match health {
        PaneHealth::Running => badge_pass("running"),
        PaneHealth::Quiet => badge_warn("quiet"),
        PaneHealth::Stale => badge_fail("stale"),
        PaneHealth::NeverStarted => format!("[{}]", "idle".dimmed()),
    }
}

pub fn kv(key: &str, val: &str) -> String {
    format!("  {} {}", label(key), value(val))
}

/// Human-readable byte size.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Short "3m ago" style age.
pub fn human_age(secs: i64) -> String {
    if secs < 60 {
        format!("{secs}s ago")
    } else if secs < 3600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}
