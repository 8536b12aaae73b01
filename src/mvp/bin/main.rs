mod app_controller;
mod controller;
mod error;
mod model;
mod ui;

#[macro_use]
extern crate log;

use clientes::api::ApiClient;
use clientes::config::ClientesConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use app_controller::AppController;

    pretty_env_logger::init();

    let config = ClientesConfig::load()?;
    let client = ApiClient::new(&config.ui.api_base_url);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let app_controller = AppController::new(client)?;
        app_controller.await
    })?;
    Ok(())
}
