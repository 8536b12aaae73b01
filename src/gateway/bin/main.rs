#[macro_use]
extern crate log;

use clientes::config::ClientesConfig;
use clientes::gateway;
use clientes::model::Store;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let config = ClientesConfig::load()?;
    let (store, store_thread) = Store::open(&config.gateway.database)?;

    let rt = tokio::runtime::Runtime::new()?;
    let served = rt.block_on(async {
        let served = async {
            let listener = tokio::net::TcpListener::bind(&config.gateway.bind_address).await?;
            gateway::serve(listener, store.clone()).await
        }
        .await;
        // serve only returns on failure
        if let Err(error) = store.shutdown().await {
            warn!("Store did not shut down cleanly: {}", error);
        }
        served
    });

    if store_thread.join().is_err() {
        error!("Store thread panicked");
    }
    served?;
    Ok(())
}
