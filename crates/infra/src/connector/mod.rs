//! Building blocks shared by every platform connector: token management,
//! authenticated request execution and lifecycle events.

pub mod auth;
pub mod events;
pub mod executor;

pub use auth::{
    AccessTokenProvider, AuthScheme, CredentialConfig, CredentialManager, StaticTokenProvider,
};
pub use events::ConnectorEvent;
pub use executor::{
    endpoint_path, ExecutorConfig, RequestExecutor, RequestOptions, ResponseBody,
};
