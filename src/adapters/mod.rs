// Adapters layer: concrete implementations for external systems.

pub mod delimited;
pub mod http;
pub mod secrets;
pub mod storage;
pub mod xml;
