//! Pattern entry shapes and their markdown rendering.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three canonical entry shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Success,
    Failure,
    Combo,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Success => "success",
            EntryKind::Failure => "failure",
            EntryKind::Combo => "combo",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One distilled observation. Every entry carries a timestamp, a
/// market-type tag, an instrument list, and a structured metrics block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEntry {
    pub kind: EntryKind,
    pub recorded_at: DateTime<Utc>,
    pub market: String,
    pub instruments: Vec<String>,
    pub metrics: BTreeMap<String, f64>,
    pub notes: String,
}

impl PatternEntry {
    /// Render the markdown block appended under the entry marker.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "### {} | {} | {} | {}\n",
            self.recorded_at.format("%+"),
            self.market,
            self.kind,
            self.instruments.join(",")
        ));
        out.push_str("**metrics**\n");
        for (k, v) in &self.metrics {
            out.push_str(&format!("- {k}: {v}\n"));
        }
        out.push_str("**notes**\n");
        let notes = self.notes.trim();
        if !notes.is_empty() {
            out.push_str(notes);
            out.push('\n');
        }
        out
    }

    /// Parse one rendered block back into an entry. Returns `None` for
    /// blocks that do not follow the canonical shape (hand-edited files
    /// stay readable; unreadable blocks are skipped, never rewritten).
    pub fn parse(block: &str) -> Option<PatternEntry> {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty());
        let header = lines.next()?.strip_prefix("### ")?;

        let mut parts = header.splitn(4, " | ");
        let recorded_at = DateTime::parse_from_rfc3339(parts.next()?.trim())
            .ok()?
            .with_timezone(&Utc);
        let market = parts.next()?.trim().to_string();
        let kind = match parts.next()?.trim() {
            "success" => EntryKind::Success,
            "failure" => EntryKind::Failure,
            "combo" => EntryKind::Combo,
            _ => return None,
        };
        let instruments = parts
            .next()?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut metrics = BTreeMap::new();
        let mut notes = Vec::new();
        let mut in_notes = false;
        for line in lines {
            let trimmed = line.trim();
            match trimmed {
                "**metrics**" => in_notes = false,
                "**notes**" => in_notes = true,
                _ if in_notes => notes.push(trimmed),
                _ => {
                    if let Some(rest) = trimmed.strip_prefix("- ") {
                        if let Some((k, v)) = rest.split_once(':') {
                            if let Ok(val) = v.trim().parse::<f64>() {
                                metrics.insert(k.trim().to_string(), val);
                            }
                        }
                    }
                }
            }
        }

        Some(PatternEntry {
            kind,
            recorded_at,
            market,
            instruments,
            metrics,
            notes: notes.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> PatternEntry {
        PatternEntry {
            kind: EntryKind::Success,
            recorded_at: Utc.with_ymd_and_hms(2026, 2, 1, 10, 5, 0).unwrap(),
            market: "futures".into(),
            instruments: vec!["ES".into(), "NQ".into()],
            metrics: BTreeMap::from([("sharpe_oos".into(), 1.4), ("trades".into(), 312.0)]),
            notes: "RSI mean-reversion holds up with costs included.".into(),
        }
    }

    #[test]
    fn render_parse_round_trip() {
        let entry = sample();
        let parsed = PatternEntry::parse(&entry.render()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn hand_edited_garbage_is_skipped_not_fatal() {
        assert!(PatternEntry::parse("just some prose").is_none());
        assert!(PatternEntry::parse("### not | enough").is_none());
    }
}
