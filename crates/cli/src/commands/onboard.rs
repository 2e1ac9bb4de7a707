//! `ragraph onboard` — first-time setup.

use ragraph_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let conversations_dir = AppConfig::default_conversations_dir();

    println!("Ragraph — First-Time Setup");
    println!("==========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !conversations_dir.exists() {
        std::fs::create_dir_all(&conversations_dir)?;
        println!("✅ Created conversations directory: {}", conversations_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Set OPENAI_API_KEY (or edit {})", config_path.display());
        println!("   2. Point [knowledge] corpus_path at your passages, or keep the sample");
        println!("   3. Run: ragraph demo\n");
    }

    println!("🎉 Setup complete! Run `ragraph chat` to start a conversation.\n");
    Ok(())
}
