//! qsf-profile
//!
//! The market profile registry. A profile fixes, for one run of the swarm:
//! the cost model, the compliance rule set, the data provider, the symbol
//! universe, and the output buckets. Exactly one profile is active at a
//! time; switching requires no running workers.
//!
//! Cost model and compliance validator are closed sum types selected by a
//! profile tag. There is no open registry: the variant sets are
//! `per_contract` / `percentage` and `prop-firm` / `exchange-rules`, full
//! stop.

mod compliance;
mod cost;
mod registry;
mod types;

pub use compliance::{
    ComplianceModel, FirmRules, LeverageTier, TrailingDrawdownType, find_tier,
};
pub use cost::{CostModel, TradeCosting};
pub use registry::{ActivePointer, ProfileError, ProfileRegistry, ProfileSummary};
pub use types::{
    InstrumentSpec, MarketType, Profile, ProviderDescriptor, ResearchScope, SymbolUniverse,
};
