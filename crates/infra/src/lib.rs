//! Infrastructure layer: backend adapters, configuration and the async
//! drivers that connect the pure pricing/quote logic to them.

pub mod backend;
pub mod config;
pub mod estimator;
pub mod flags;
pub mod read_model;
pub mod submission;
pub mod wizard_driver;

pub use backend::{Backend, BackendError, RemoteCallError};
pub use config::{AppConfig, BackendConfig, ConfigError};
pub use estimator::{EstimateError, PricedEstimate, price_selection};
pub use flags::{FlagToggler, ToggleError};
pub use submission::{SubmitError, dispatch, submit_repriced};
pub use wizard_driver::WizardDriver;
