//! `neurocite config`: configuration inspection.

use neurocite_config::AppConfig;

pub fn show_default() {
    println!("{}", AppConfig::default_toml());
}

pub fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}

pub fn check() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;

    let mut warnings = Vec::new();
    if !config.has_api_key() {
        warnings.push("No API key set (set NEUROCITE_API_KEY or OPENAI_API_KEY)".to_string());
    }
    if !std::path::Path::new(&config.retrieval.corpus_path).exists() {
        warnings.push(format!("Corpus file not found: {}", config.retrieval.corpus_path));
    }

    println!("Config parsed successfully");
    for w in &warnings {
        println!("   warning: {w}");
    }
    println!();
    println!("   Provider:   {}", config.default_provider);
    println!("   Model:      {}", config.default_model);
    println!("   Expansion:  {}", config.expansion_model());
    println!("   Max hops:   {}", config.agent.max_hops);
    println!("   Threshold:  {}", config.agent.confidence_threshold);
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);

    Ok(())
}
