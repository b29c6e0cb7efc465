//! Scaffolded project roots for scenario tests.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use qsf_artifacts::StrategiesRoot;
use qsf_patterns::PatternStore;
use qsf_queue::QueueRoot;
use qsf_schemas::ProjectLayout;

/// A full project layout in a tempdir: config, two profiles, queues,
/// buckets, pattern/checkpoint/summary dirs, sample data.
pub struct TestProject {
    // Held for its Drop; the tempdir lives exactly as long as the project.
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl TestProject {
    /// Futures prop-firm profile active, budget of one task per session,
    /// one-second queue polling.
    pub fn new() -> Result<TestProject> {
        TestProject::with_budget(1.0)
    }

    /// `budget_cap_usd` at 1.0 per-task cost: a cap of N ends each session
    /// after N tasks, which is how scenario tests bound their loops.
    pub fn with_budget(budget_cap_usd: f64) -> Result<TestProject> {
        let dir = tempfile::tempdir().context("create test project tempdir")?;
        let root = dir.path().to_path_buf();

        fs::create_dir_all(root.join("profiles"))?;
        fs::create_dir_all(root.join("patterns"))?;
        fs::create_dir_all(root.join("checkpoints"))?;
        fs::create_dir_all(root.join("session-summaries"))?;
        fs::create_dir_all(root.join("logs"))?;
        fs::create_dir_all(root.join("data/samples"))?;
        fs::create_dir_all(root.join("output/hypotheses"))?;
        fs::create_dir_all(root.join("output/backtests"))?;
        fs::create_dir_all(root.join("output/research-logs"))?;

        let config = json!({
            "workers": {"researcher": 1, "converter": 1, "backtester": 1, "optimizer": 1},
            "recovery": {"maxConsecutiveFailures": 3, "staleClaimMultiplier": 3, "gracefulStopSecs": 10},
            "budget": {"estimatedCostPerTaskUsd": 1.0},
            "model": {"command": "unused-in-tests", "taskTimeoutSecs": 30},
            "pollIntervalSecs": 1
        });
        fs::write(
            root.join("config.json"),
            serde_json::to_string_pretty(&config)?,
        )?;

        let futures_profile = json!({
            "name": "futures-prop",
            "marketType": "futures",
            "dataProvider": {"kind": "databento", "apiKeyEnv": "DATABENTO_API_KEY"},
            "costModel": {
                "type": "per_contract",
                "commission": 2.5, "slippageTicks": 1.0, "tickValue": 12.5
            },
            "compliance": {
                "type": "prop-firm",
                "minPassing": 2,
                "firms": [
                    {"name": "alpha-funding", "dailyLossLimit": 2000.0, "trailingDdLimit": 4000.0,
                     "trailingDdType": "eod", "consistencyPct": 0.6},
                    {"name": "beta-capital", "dailyLossLimit": 2500.0, "trailingDdLimit": 5000.0,
                     "trailingDdType": "intraday", "consistencyPct": 0.6},
                    {"name": "gamma-trading", "dailyLossLimit": 1500.0, "trailingDdLimit": 3000.0,
                     "trailingDdType": "fixed", "consistencyPct": 0.5}
                ]
            },
            "symbols": {"pinned": ["ES", "NQ"]},
            "validatedDir": "prop_firm_ready",
            "rejectedDir": "rejected",
            "sampleDataDir": "data/samples",
            "sessionTimeoutSecs": 3600,
            "budgetCapUsd": budget_cap_usd,
            "instruments": {
                "ES": {"tickSize": 0.25, "tickValue": 12.5, "pointValue": 50.0},
                "NQ": {"tickSize": 0.25, "tickValue": 5.0, "pointValue": 20.0}
            }
        });
        fs::write(
            root.join("profiles/futures-prop.json"),
            serde_json::to_string_pretty(&futures_profile)?,
        )?;

        let crypto_profile = json!({
            "name": "crypto-perps",
            "marketType": "crypto",
            "dataProvider": {"kind": "binance", "apiKeyEnv": "BINANCE_API_KEY"},
            "costModel": {
                "type": "percentage",
                "makerFee": 0.0005, "takerFee": 0.0005,
                "slippageBps": 5.0, "fundingRateAvg": 0.0001
            },
            "compliance": {
                "type": "exchange-rules",
                "leverageTiers": [
                    {"notionalCap": 50000.0, "maxLeverage": 20.0},
                    {"notionalCap": 250000.0, "maxLeverage": 10.0}
                ],
                "liquidationBufferPct": 0.01,
                "maxPositionNotional": 200000.0
            },
            "symbols": {"pinned": ["BTCUSDT"]},
            "validatedDir": "exchange_validated",
            "rejectedDir": "rejected",
            "sampleDataDir": "data/samples",
            "sessionTimeoutSecs": 3600,
            "budgetCapUsd": budget_cap_usd
        });
        fs::write(
            root.join("profiles/crypto-perps.json"),
            serde_json::to_string_pretty(&crypto_profile)?,
        )?;

        fs::write(
            root.join("active-profile.json"),
            r#"{"active": "futures-prop", "path": "profiles/futures-prop.json"}"#,
        )?;
        fs::write(root.join("data/samples/ES-1m.csv"), "ts,o,h,l,c,v\n")?;

        let queues = QueueRoot::new(root.join("queues"));
        queues.ensure_layout()?;
        StrategiesRoot::new(root.join("output/strategies")).ensure_layout("prop_firm_ready")?;

        Ok(TestProject { _dir: dir, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::new(&self.root)
    }

    pub fn queues(&self) -> QueueRoot {
        QueueRoot::new(self.root.join("queues"))
    }

    pub fn patterns(&self) -> PatternStore {
        PatternStore::new(self.root.join("patterns"))
    }

    pub fn strategies(&self) -> StrategiesRoot {
        StrategiesRoot::new(self.root.join("output/strategies"))
    }

    /// Patch the active futures profile's session timeout.
    pub fn set_session_timeout(&self, secs: u64) -> Result<()> {
        let path = self.root.join("profiles/futures-prop.json");
        let mut profile: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        profile["sessionTimeoutSecs"] = json!(secs);
        fs::write(&path, serde_json::to_string_pretty(&profile)?)?;
        Ok(())
    }

    /// Switch the active pointer to the crypto profile.
    pub fn activate_crypto(&self) -> Result<()> {
        fs::write(
            self.root.join("active-profile.json"),
            r#"{"active": "crypto-perps", "path": "profiles/crypto-perps.json"}"#,
        )?;
        Ok(())
    }

    /// Write a file under the project root, creating parents.
    pub fn write_file(&self, rel: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}
