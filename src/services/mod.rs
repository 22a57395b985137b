pub mod distributor;
pub mod health_monitor;
pub mod processor_client;

pub use distributor::Distributor;
pub use health_monitor::HealthMonitor;
pub use processor_client::ProcessorClient;
