//! Profile data model. Immutable after load.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::compliance::ComplianceModel;
use crate::cost::CostModel;

// ---------------------------------------------------------------------------
// Market type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Futures,
    Crypto,
}

impl MarketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Futures => "futures",
            MarketType::Crypto => "crypto",
        }
    }
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

/// Which upstream data source this profile uses. The substrate never talks
/// to the source itself; the descriptor is injected into panes and consumed
/// by the data-provider boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    /// Provider kind, e.g. `databento`, `binance`.
    pub kind: String,
    /// Env var holding the API key. Referenced as `${VAR}` in profile JSON
    /// and expanded from the supervisor environment at pane launch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

/// Per-symbol contract terms needed by the per-contract cost model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentSpec {
    pub tick_size: f64,
    pub tick_value: f64,
    pub point_value: f64,
}

/// Symbol universe: either a pinned list or a discovery configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolUniverse {
    Pinned(Vec<String>),
    Discovery {
        max_symbols: u32,
        min_volume_usd: u64,
    },
}

impl SymbolUniverse {
    /// Pinned symbols, empty for discovery universes.
    pub fn pinned(&self) -> &[String] {
        match self {
            SymbolUniverse::Pinned(syms) => syms,
            SymbolUniverse::Discovery { .. } => &[],
        }
    }
}

/// Allowed people / sources / edge types for the researcher role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResearchScope {
    pub people: Vec<String>,
    pub sources: Vec<String>,
    pub edge_types: Vec<String>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// One market profile. Read-only after `ProfileRegistry::load`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub market_type: MarketType,
    pub data_provider: ProviderDescriptor,
    pub cost_model: CostModel,
    pub compliance: ComplianceModel,
    pub symbols: SymbolUniverse,
    /// Promotion bucket under `output/strategies/`, e.g. `prop_firm_ready`.
    pub validated_dir: String,
    pub rejected_dir: String,
    pub sample_data_dir: String,
    pub session_timeout_secs: u64,
    pub budget_cap_usd: f64,
    #[serde(default)]
    pub research: ResearchScope,
    #[serde(default)]
    pub instruments: BTreeMap<String, InstrumentSpec>,
}

impl Profile {
    pub fn instrument_spec(&self, symbol: &str) -> Option<&InstrumentSpec> {
        self.instruments.get(symbol)
    }

    pub fn validator(&self) -> &ComplianceModel {
        &self.compliance
    }

    pub fn data_provider(&self) -> &ProviderDescriptor {
        &self.data_provider
    }

    pub fn symbols(&self) -> &SymbolUniverse {
        &self.symbols
    }
}
