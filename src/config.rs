use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Error;

const CONFIG_FILE: &str = "clientes";
const ENV_PREFIX: &str = "CLIENTES";

#[derive(Clone, Debug, Deserialize)]
pub struct ClientesConfig {
    pub gateway: GatewayConfig,
    pub ui: UiConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayConfig {
    pub bind_address: String,
    /// Path of the SQLite file; `:memory:` keeps everything in RAM.
    pub database: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UiConfig {
    pub api_base_url: String,
}

impl ClientesConfig {
    /// Defaults, then `clientes.toml` (optional), then `CLIENTES__SECTION__KEY` variables.
    pub fn load() -> Result<Self, Error> {
        let config = Config::builder()
            .set_default("gateway.bind_address", "0.0.0.0:3000")?
            .set_default("gateway.database", "clientes.sqlite")?
            .set_default("ui.api_base_url", "http://localhost:3000")?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<ClientesConfig>()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let config = ClientesConfig::load().expect("defaults should always deserialize");
        assert!(!config.gateway.bind_address.is_empty());
        assert!(!config.gateway.database.is_empty());
        assert!(config.ui.api_base_url.starts_with("http"));
    }
}
