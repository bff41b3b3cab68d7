//! `prospector onboard`: first-time setup.

use prospector_config::AppConfig;
use std::path::Path;

pub fn run(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config_path = super::config_path(config_path);

    println!("prospector: first-time setup");
    println!("============================\n");

    if let Some(dir) = config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            println!("✅ Created config directory: {}", dir.display());
        }
    }

    if config_path.exists() {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
    }

    let config = super::load_config(Some(&config_path))?;
    for dir in config.state_dirs() {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            println!("✅ Created {}", dir.display());
        }
    }

    println!("\n📝 Next steps:");
    println!("   1. Set DEEPSEEK_API_KEY");
    println!("      (and any adapter keys: APOLLO_API_KEY, SENDGRID_API_KEY, ...)");
    println!("   2. Check the setup:   prospector config validate");
    println!("   3. Try a dry run:");
    println!("      prospector run --mode test --prompt \"Find SaaS founders in the US\"");
    println!();
    Ok(())
}
