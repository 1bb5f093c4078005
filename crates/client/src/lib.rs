pub mod backend;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod memory;

pub use backend::IpfBackend;
pub use error::BackendError;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
