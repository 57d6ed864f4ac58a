//! `neurocite gateway`: start the HTTP API server.

use neurocite_core::event::EventBus;
use std::sync::Arc;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config()?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    let agent = super::build_agent(&config, Arc::new(EventBus::default())).await?;

    println!("NeuroCite Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {}", config.default_model);

    neurocite_gateway::start(&config, Arc::new(agent)).await?;

    Ok(())
}
