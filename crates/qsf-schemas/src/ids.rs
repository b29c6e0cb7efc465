//! Queue item id generation and parsing.
//!
//! Ids have the shape `{prefix}-{yyyymmdd}-{hhmmss}-{micros}` where the
//! final field is the microsecond-within-second, zero-padded to six digits.
//!
//! # Uniqueness
//!
//! Ids must be unique across the lifetime of the repository. Within one
//! process that is enforced by a monotonic bump: if a freshly sampled
//! `(second, micros)` pair is not strictly greater than the last pair this
//! process handed out, the new id takes `last + 1 microsecond` instead of
//! the sampled value. Across processes the pane-scoped creator plus the
//! push-side duplicate check (`QueueError::DuplicateId`) close the gap.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Last `(epoch_second, micros)` pair handed out by this process.
static LAST_ISSUED: Mutex<(i64, u32)> = Mutex::new((0, 0));

/// A queue item id: `{prefix}-{yyyymmdd}-{hhmmss}-{micros}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Generate the next id for `prefix` at (or monotonically after) `now`.
    pub fn generate(prefix: &str, now: DateTime<Utc>) -> ItemId {
        let mut secs = now.timestamp();
        let mut micros = now.timestamp_subsec_micros().min(999_999);

        {
            let mut last = LAST_ISSUED.lock().expect("id generator lock poisoned");
            if (secs, micros) <= *last {
                let (ls, lm) = *last;
                if lm >= 999_999 {
                    secs = ls + 1;
                    micros = 0;
                } else {
                    secs = ls;
                    micros = lm + 1;
                }
            }
            *last = (secs, micros);
        }

        let ts = Utc
            .timestamp_opt(secs, 0)
            .single()
            .unwrap_or_else(Utc::now);
        ItemId(format!(
            "{}-{}-{:06}",
            prefix,
            ts.format("%Y%m%d-%H%M%S"),
            micros
        ))
    }

    /// Build an id from its raw string form without validation.
    ///
    /// Callers that got the string from a filename should prefer
    /// [`ItemId::from_str`], which validates the shape.
    pub fn from_raw(s: impl Into<String>) -> ItemId {
        ItemId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The role prefix (`hyp`, `cv`, `bt`, `opt`, ...).
    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or("")
    }

    /// The pending/terminal filename for this id.
    pub fn file_name(&self) -> String {
        format!("{}.json", self.0)
    }

    /// The in-progress filename for this id when claimed by `pane`/`role`.
    pub fn claimed_file_name(&self, pane: u32, role: &str) -> String {
        format!("{}.claimed-pane{}-{}.json", self.0, pane, role)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIdParseError(pub String);

impl fmt::Display for ItemIdParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed item id: {}", self.0)
    }
}

impl std::error::Error for ItemIdParseError {}

impl FromStr for ItemId {
    type Err = ItemIdParseError;

    /// Validate `{prefix}-{yyyymmdd}-{hhmmss}-{micros}`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 4 {
            return Err(ItemIdParseError(s.to_string()));
        }
        let [prefix, date, time, micros] = [parts[0], parts[1], parts[2], parts[3]];
        let shape_ok = !prefix.is_empty()
            && prefix.chars().all(|c| c.is_ascii_alphanumeric())
            && date.len() == 8
            && date.chars().all(|c| c.is_ascii_digit())
            && time.len() == 6
            && time.chars().all(|c| c.is_ascii_digit())
            && micros.len() == 6
            && micros.chars().all(|c| c.is_ascii_digit());
        if !shape_ok {
            return Err(ItemIdParseError(s.to_string()));
        }
        Ok(ItemId(s.to_string()))
    }
}

/// Extract the id portion from a queue filename, pending or claimed.
///
/// `bt-20260201-110000-000001.json` and
/// `bt-20260201-110000-000001.claimed-pane2-backtester.json` both yield
/// `bt-20260201-110000-000001`.
pub fn id_from_file_name(name: &str) -> Option<ItemId> {
    let stem = name.strip_suffix(".json")?;
    let stem = match stem.find(".claimed-") {
        Some(idx) => &stem[..idx],
        None => stem,
    };
    stem.parse().ok()
}

/// Extract `(pane, role)` from a claimed filename, if it is one.
pub fn claim_owner_from_file_name(name: &str) -> Option<(u32, String)> {
    let stem = name.strip_suffix(".json")?;
    let idx = stem.find(".claimed-")?;
    let suffix = &stem[idx + ".claimed-".len()..];
    let (pane_part, role) = suffix.split_once('-')?;
    let pane = pane_part.strip_prefix("pane")?.parse().ok()?;
    Some((pane, role.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_monotonic_and_well_formed() {
        let now = Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap();
        let a = ItemId::generate("hyp", now);
        let b = ItemId::generate("hyp", now);
        let c = ItemId::generate("hyp", now);

        assert!(a < b && b < c, "{a} {b} {c}");
        for id in [&a, &b, &c] {
            id.as_str().parse::<ItemId>().expect("well-formed");
            assert_eq!(id.prefix(), "hyp");
        }
    }

    #[test]
    fn filename_roundtrip_strips_claim_suffix() {
        let id = ItemId::from_raw("bt-20260201-110000-000001");
        assert_eq!(id.file_name(), "bt-20260201-110000-000001.json");

        let claimed = id.claimed_file_name(2, "backtester");
        assert_eq!(
            claimed,
            "bt-20260201-110000-000001.claimed-pane2-backtester.json"
        );
        assert_eq!(id_from_file_name(&claimed), Some(id.clone()));
        assert_eq!(id_from_file_name(&id.file_name()), Some(id));
        assert_eq!(
            claim_owner_from_file_name(&claimed),
            Some((2, "backtester".to_string()))
        );
    }

    #[test]
    fn malformed_ids_are_rejected() {
        for bad in ["", "hyp-2026-100000-000001", "x", "hyp-20260201-100000"] {
            assert!(bad.parse::<ItemId>().is_err(), "{bad}");
        }
    }
}
