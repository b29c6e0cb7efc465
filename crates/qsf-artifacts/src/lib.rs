//! qsf-artifacts
//!
//! Strategy artifact bundles and their routing buckets.
//!
//! A bundle is a directory named by strategy id holding exactly six files.
//! Writes go to a staging directory; the bundle is published last by a
//! single rename, so readers of a bucket see either an absent bundle or a
//! complete one, never a partial one.

mod bundle;
mod router;

pub use bundle::{
    verify_bundle, BundleWriter, BUNDLE_FILES, FILE_BACKTEST, FILE_BASE_HIT, FILE_COMPLIANCE,
    FILE_OPTIMIZATION, FILE_README, FILE_STRATEGY_CODE,
};
pub use router::{bucket_for, write_reason_file, Bucket, BundleInfo, StrategiesRoot};
