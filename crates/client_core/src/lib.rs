//! Client side of the posts table: the gateway to the remote collection,
//! the view-state controller, and the debounced input adapter.

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod gateway;
pub mod types;

pub use config::TableConfig;
pub use controller::TableController;
pub use debounce::Debouncer;
pub use error::GatewayError;
pub use gateway::{HttpPostGateway, PostGateway};
pub use types::{FetchOutcome, TableEvent, TableSnapshot, ViewState};
