//! Configuration Module
//!
//! Configuration loading, `.env` support and credential resolution.

mod credentials;
mod dotenv;
mod settings;

pub use credentials::CredentialResolver;
pub use dotenv::{DotenvStatus, load_dotenv, load_dotenv_from};
pub use settings::{
    AlpacaSettings, DEFAULT_ALPACA_BASE_URL, DEFAULT_POLYGON_BASE_URL, PolygonSettings,
    ServerSettings, ToolsConfig, UPSTREAM_TIMEOUT,
};
