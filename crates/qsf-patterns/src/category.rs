//! The fixed category set and its market-type selection.

use std::fmt;

/// One knowledge file. The futures categories and their crypto
/// counterparts are distinct files; the active profile's market type picks
/// which side a session distills into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PatternCategory {
    WhatWorks,
    WhatFails,
    IndicatorCombos,
    PropFirmGotchas,
    CryptoWhatWorks,
    CryptoWhatFails,
    IndicatorCombosCrypto,
    ExchangeGotchas,
}

impl PatternCategory {
    pub const ALL: [PatternCategory; 8] = [
        PatternCategory::WhatWorks,
        PatternCategory::WhatFails,
        PatternCategory::IndicatorCombos,
        PatternCategory::PropFirmGotchas,
        PatternCategory::CryptoWhatWorks,
        PatternCategory::CryptoWhatFails,
        PatternCategory::IndicatorCombosCrypto,
        PatternCategory::ExchangeGotchas,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            PatternCategory::WhatWorks => "what-works.md",
            PatternCategory::WhatFails => "what-fails.md",
            PatternCategory::IndicatorCombos => "indicator-combos.md",
            PatternCategory::PropFirmGotchas => "prop-firm-gotchas.md",
            PatternCategory::CryptoWhatWorks => "crypto-what-works.md",
            PatternCategory::CryptoWhatFails => "crypto-what-fails.md",
            PatternCategory::IndicatorCombosCrypto => "indicator-combos-crypto.md",
            PatternCategory::ExchangeGotchas => "exchange-gotchas.md",
        }
    }

    /// Success/failure/combo/gotcha categories for a market type
    /// (`"futures"` or `"crypto"`). Workers read and distill into these
    /// four; the other market's files are left untouched.
    pub fn for_market(market: &str) -> [PatternCategory; 4] {
        if market == "crypto" {
            [
                PatternCategory::CryptoWhatWorks,
                PatternCategory::CryptoWhatFails,
                PatternCategory::IndicatorCombosCrypto,
                PatternCategory::ExchangeGotchas,
            ]
        } else {
            [
                PatternCategory::WhatWorks,
                PatternCategory::WhatFails,
                PatternCategory::IndicatorCombos,
                PatternCategory::PropFirmGotchas,
            ]
        }
    }

    /// The success category for a market type.
    pub fn success_for(market: &str) -> PatternCategory {
        Self::for_market(market)[0]
    }

    /// The failure category for a market type.
    pub fn failure_for(market: &str) -> PatternCategory {
        Self::for_market(market)[1]
    }

    /// The indicator-combo category for a market type.
    pub fn combos_for(market: &str) -> PatternCategory {
        Self::for_market(market)[2]
    }

    /// The gotcha category for a market type.
    pub fn gotchas_for(market: &str) -> PatternCategory {
        Self::for_market(market)[3]
    }

    /// Resolve a category from its file stem (`what-works`,
    /// `exchange-gotchas`, ...). Distillers may target a category
    /// explicitly by stem.
    pub fn from_file_stem(stem: &str) -> Option<PatternCategory> {
        Self::ALL
            .into_iter()
            .find(|c| c.file_name().trim_end_matches(".md") == stem)
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name().trim_end_matches(".md"))
    }
}
