//! `ragraph doctor` — diagnose configuration and capabilities.

use super::build_orchestrator;
use ragraph_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Ragraph Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults (run `ragraph onboard`)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  Cannot continue without a valid config.");
            return Ok(());
        }
    };

    if config.has_api_key() || config.providers.values().any(|p| p.api_key.is_some()) {
        println!("  ✅ API key configured");
    } else {
        println!("  ⚠️  No API key — set OPENAI_API_KEY or add api_key to config.toml");
        issues += 1;
    }

    let router = ragraph_providers::build_from_config(&config);
    println!("  ✅ Providers: {}", router.list().join(", "));

    match ragraph_knowledge::load_corpus(&config) {
        Ok(corpus) => println!(
            "  ✅ Corpus: {} passages from {} sources",
            corpus.len(),
            corpus.sources().len()
        ),
        Err(e) => {
            println!("  ❌ Corpus: {e}");
            issues += 1;
        }
    }

    match ragraph_memory::build_from_config(&config).await {
        Ok(store) => match store.list().await {
            Ok(ids) => println!("  ✅ Memory ({}): {} conversations", store.name(), ids.len()),
            Err(e) => {
                println!("  ❌ Memory ({}): {e}", store.name());
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Memory: {e}");
            issues += 1;
        }
    }

    match build_orchestrator(&config).await {
        Ok(orchestrator) => match orchestrator.preflight().await {
            Ok(()) => println!("  ✅ Provider reachable ({})", config.default_model),
            Err(e) => {
                println!("  ❌ Preflight: {e}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Pipeline: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
