//! `guardsmith build` — Run the full generation pipeline.

use guardsmith_config::AppConfig;
use guardsmith_core::domain::Domain;
use guardsmith_core::policy::ToolPolicy;
use guardsmith_core::result::ItemTier;
use guardsmith_engine::BuildOrchestrator;
use guardsmith_toolchain::{MypyChecker, PytestRunner, VirtualEnv};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub async fn run(
    domain_dir: PathBuf,
    policies_dir: PathBuf,
    out: Option<PathBuf>,
    check_env: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if let Some(out) = out {
        config.output.dir = out;
    }

    let domain = Domain::load(&domain_dir)
        .map_err(|e| format!("Failed to load domain from {}: {e}", domain_dir.display()))?;
    let policies = ToolPolicy::load_dir(&policies_dir)
        .map_err(|e| format!("Failed to load policies from {}: {e}", policies_dir.display()))?;
    if policies.is_empty() {
        return Err(format!("No policy files found in {}", policies_dir.display()).into());
    }

    if check_env {
        return check_environment(&config, &domain, &policies).await;
    }

    let generator = guardsmith_providers::from_config(&config)?;
    info!(provider = generator.name(), model = %config.model, "Generator ready");

    let env = VirtualEnv::provision(
        &config.toolchain.python,
        &config.output.dir.join(&config.toolchain.venv_name),
        &config.toolchain.requirements,
    )
    .await
    .map_err(|e| format!("Failed to provision build environment: {e}"))?;

    let timeout = Duration::from_secs(config.toolchain.timeout_secs);
    let orchestrator = BuildOrchestrator::new(
        generator,
        Arc::new(MypyChecker::new(env.clone(), timeout)),
        Arc::new(PytestRunner::new(env, timeout)),
        &config.budgets,
        config.output.dir.clone(),
        config.debug_dir(),
    );

    let build = orchestrator.build(&domain, &policies).await?;

    let mut verified = 0usize;
    let mut unverified = 0usize;
    let mut passthrough = 0usize;
    for tool in build.tools.values() {
        for index in 0..tool.policy.policy_items.len() {
            match tool.item_tier(index) {
                ItemTier::Verified => verified += 1,
                ItemTier::Unverified => unverified += 1,
                ItemTier::StubPassthrough => passthrough += 1,
            }
        }
    }

    println!("🛡️  Guardsmith Build");
    println!("===================");
    println!("  Tools:        {}", build.tools.len());
    println!("  Verified:     {verified}");
    println!("  Unverified:   {unverified}");
    println!("  Passthrough:  {passthrough}");
    println!(
        "  Duration:     {}s",
        (build.finished_at - build.started_at).num_seconds()
    );
    println!("  Output:       {}", config.output.dir.display());

    Ok(())
}

/// Validate everything a build needs without generating anything:
/// config and inputs parsed (already done by the caller), an API key
/// present, and the Python interpreter runnable.
async fn check_environment(
    config: &AppConfig,
    domain: &Domain,
    policies: &[ToolPolicy],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut issues = 0;

    println!("🛡️  Guardsmith Environment Check");
    println!("===============================");
    println!("  ✅ Config valid ({} provider, model {})", config.provider, config.model);
    println!(
        "  ✅ Domain loaded ({} tools, interface {})",
        domain.methods.len(),
        domain.interface_name
    );
    println!(
        "  ✅ Policies loaded ({} tools, {} with items)",
        policies.len(),
        policies.iter().filter(|p| p.has_items()).count()
    );

    if config.has_api_key() {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key — set GUARDSMITH_API_KEY or guardsmith.toml api_key");
        issues += 1;
    }

    match tokio::process::Command::new(&config.toolchain.python)
        .arg("--version")
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            println!("  ✅ Python found ({})", version.trim());
        }
        _ => {
            println!("  ❌ Python not runnable: {}", config.toolchain.python);
            issues += 1;
        }
    }

    let venv = config.output.dir.join(&config.toolchain.venv_name);
    if VirtualEnv::at(&venv).interpreter().exists() {
        println!("  ✅ Virtualenv already provisioned");
    } else {
        println!("  ℹ️  Virtualenv will be provisioned on first build");
    }

    println!();
    if issues == 0 {
        println!("  🎉 Ready to build");
        Ok(())
    } else {
        Err(format!("{issues} issue(s) found").into())
    }
}
