// Adapters layer: concrete implementations for external systems (backend http, storage).

pub mod http;
pub mod storage;

pub use http::RestBackend;
pub use storage::LocalStorage;
