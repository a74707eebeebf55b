//! Remote provider adapters and their shared interface.

pub mod config;
pub mod factory;
pub mod notion;
pub mod trait_;

pub use config::{ConfigDirection, IntegrationConfig};
pub use factory::ProviderFactory;
pub use trait_::{
    ConnectionCheck, OutboundResult, PostPayload, ProviderError, RemoteChange, RemoteDatabase,
    RemoteProvider, RemoteProperty, RemoteSchema, RemoteStatusOption,
};
