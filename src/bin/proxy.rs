use modbus_gateway::config::{create_devices, Cli};
use modbus_gateway::logging;
use modbus_gateway::Supervisor;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let resolved = create_devices(&cli)?;

    logging::init(resolved.logging.as_ref(), false);

    let supervisor = Supervisor::new(&resolved.devices)?;
    std::process::exit(supervisor.run().await);
}
