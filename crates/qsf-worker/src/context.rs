//! Session context: what gets injected into every model pass.
//!
//! Assembled once at session start (START state): the active profile, the
//! distilled pattern knowledge for the profile's market, and current queue
//! depths. The context renders to a prompt preamble; the substrate makes
//! no promise about how the model uses it.

use anyhow::Result;

use qsf_patterns::{PatternCategory, PatternEntry, PatternStore};
use qsf_profile::Profile;
use qsf_queue::QueueRoot;
use qsf_schemas::WorkerRole;

/// How many recent entries per category are rendered into the prompt.
const CONTEXT_ENTRIES_PER_CATEGORY: usize = 12;

#[derive(Debug, Clone)]
pub struct SessionContext {
    pub profile_name: String,
    pub market: String,
    pub symbols: Vec<String>,
    pub pattern_digest: Vec<(PatternCategory, Vec<PatternEntry>)>,
    pub queue_depths: Vec<(String, usize)>,
}

impl SessionContext {
    /// Read everything the session needs into memory.
    pub fn gather(
        profile: &Profile,
        patterns: &PatternStore,
        queues: &QueueRoot,
    ) -> Result<SessionContext> {
        let market = profile.market_type.as_str();

        let mut pattern_digest = Vec::new();
        for category in PatternCategory::for_market(market) {
            let mut entries = patterns.read(category)?;
            let keep = entries.len().saturating_sub(CONTEXT_ENTRIES_PER_CATEGORY);
            entries.drain(..keep);
            pattern_digest.push((category, entries));
        }

        let queue_depths = queues
            .all_depths()?
            .into_iter()
            .map(|(q, d)| (q.dir_name().to_string(), d.pending))
            .collect();

        Ok(SessionContext {
            profile_name: profile.name.clone(),
            market: market.to_string(),
            symbols: profile.symbols().pinned().to_vec(),
            pattern_digest,
            queue_depths,
        })
    }

    /// Render the prompt preamble for a role.
    pub fn render_preamble(&self, role: WorkerRole) -> String {
        let mut out = format!(
            "You are the {} worker. Active profile: {} ({}). Symbols: {}.\n\n",
            role,
            self.profile_name,
            self.market,
            if self.symbols.is_empty() {
                "discovery".to_string()
            } else {
                self.symbols.join(", ")
            }
        );

        out.push_str("Queue depths:\n");
        for (name, depth) in &self.queue_depths {
            out.push_str(&format!("- {name}: {depth} pending\n"));
        }

        for (category, entries) in &self.pattern_digest {
            if entries.is_empty() {
                continue;
            }
            out.push_str(&format!("\nKnown patterns ({category}):\n"));
            for e in entries {
                out.push_str(&format!(
                    "- [{}] {} :: {}\n",
                    e.kind,
                    e.instruments.join(","),
                    e.notes.lines().next().unwrap_or("")
                ));
            }
        }
        out
    }
}
