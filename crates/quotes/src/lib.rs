//! Quote wizard domain: contact validation, step controller, estimate session
//! and the event-sourced `Quote` aggregate.
//!
//! Pure logic only. The async wiring that loads catalogs and submits quotes
//! lives in `hearth-infra`.

pub mod contact;
pub mod quote;
pub mod session;
pub mod wizard;

pub use contact::{Contact, FieldError};
pub use quote::{
    AcceptQuote, DeclineQuote, Quote, QuoteAccepted, QuoteCommand, QuoteDeclined, QuoteEvent,
    QuoteId, QuoteStatus, QuoteSubmitted, SubmitQuote,
};
pub use session::{CatalogState, Channel, EstimateSession, RequestToken, Resolution};
pub use wizard::{StepController, WizardError, WizardForm, WizardStep, validate_step};
