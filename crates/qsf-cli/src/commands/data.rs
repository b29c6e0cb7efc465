//! `qsf data status`

use std::path::Path;

use anyhow::Result;

use qsf_data::scan_data_dir;
use qsf_profile::ProfileRegistry;
use qsf_schemas::ProjectLayout;

use crate::style;

pub fn status(root: &Path) -> Result<()> {
    let layout = ProjectLayout::new(root);
    let profile = ProfileRegistry::load(root)?.active().clone();

    let roots = [
        ("sample data", root.join(&profile.sample_data_dir)),
        ("backtests", layout.backtests_dir()),
        ("research logs", layout.research_logs_dir()),
    ];

    println!("{}", style::divider());
    for (title, dir) in roots {
        let inventory = scan_data_dir(&dir)?;
        println!(
            "{} {} ({} files, {})",
            style::label(title),
            style::dim(&dir.display().to_string()),
            inventory.files.len(),
            style::human_bytes(inventory.total_bytes)
        );
        for f in &inventory.files {
            let rel = f.path.strip_prefix(root).unwrap_or(&f.path);
            println!(
                "  {:<48} {:>10}  {}",
                rel.display(),
                style::human_bytes(f.size_bytes),
                style::dim(&f.modified_at.format("%Y-%m-%d %H:%M").to_string())
            );
        }
    }
    println!("{}", style::divider());
    Ok(())
}
