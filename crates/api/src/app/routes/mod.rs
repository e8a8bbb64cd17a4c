use axum::{
    Router,
    routing::{get, post, put},
};

pub mod discounts;
pub mod estimates;
pub mod flags;
pub mod quotes;
pub mod remote;
pub mod system;
pub mod wizard;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/estimates", post(estimates::create_estimate))
        .route("/discounts/:code", get(discounts::lookup_discount))
        .route("/quotes", post(quotes::submit_quote))
        .route("/flags", get(flags::list_flags))
        .route("/flags/:key", put(flags::toggle_flag))
        .route("/wizard/steps/:step/validate", post(wizard::validate_step))
        .route("/rpc/:name", post(remote::call_rpc))
        .route("/functions/:name", post(remote::invoke_function))
}
