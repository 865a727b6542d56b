//! `guardsmith inspect` — Summarize a previous run's manifest.

use guardsmith_config::AppConfig;
use guardsmith_core::result::{BuildManifest, ItemTier};
use guardsmith_engine::orchestrator::MANIFEST_FILE;
use std::path::PathBuf;

pub async fn run(out: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = match out {
        Some(dir) => dir,
        None => {
            let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
            config.output.dir
        }
    };

    let manifest_path = out_dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(format!(
            "No manifest at {} — run `guardsmith build` first",
            manifest_path.display()
        )
        .into());
    }
    let manifest = BuildManifest::load(&manifest_path)
        .map_err(|e| format!("Failed to read manifest: {e}"))?;

    println!("🛡️  Guardsmith Manifest");
    println!("======================");
    println!("  Types module:  {}", manifest.types_module);
    println!("  API interface: {}", manifest.api_interface);
    println!("  Started:       {}", manifest.started_at.to_rfc3339());
    println!("  Finished:      {}", manifest.finished_at.to_rfc3339());

    for (tool, entry) in &manifest.tools {
        println!("\n  {tool} ({})", entry.guard_fn_name);
        for (index, item) in entry.item_names.iter().enumerate() {
            let marker = match entry.item_tier(index) {
                ItemTier::Verified => "✅ verified",
                ItemTier::Unverified => "⚠️  unverified",
                ItemTier::StubPassthrough => "❌ passthrough",
            };
            println!("    {marker}  {item}");
        }
    }

    Ok(())
}
