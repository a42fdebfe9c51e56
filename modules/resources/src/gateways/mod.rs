pub mod http;
pub mod memory;

pub use http::HttpOrchestrationClient;
pub use memory::InMemoryOrchestrator;
