//! Submission dispatcher: turns a priced wizard run into a `Quote` and hands
//! the resulting `QuoteSubmitted` record to the quote sink.
//!
//! No retries. A failed submission is returned to the caller, who decides
//! whether the customer tries again.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use hearth_core::{Aggregate, AggregateId, DomainError, SessionContext};
use hearth_pricing::{EstimateResult, PricingError, Selection};
use hearth_quotes::{
    Contact, Quote, QuoteCommand, QuoteEvent, QuoteId, QuoteSubmitted, SubmitQuote, WizardError,
    WizardStep,
};

use crate::backend::{BackendError, CatalogSource, DiscountDirectory, QuoteSink};
use crate::estimator::{EstimateError, price_selection};

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The quote aggregate refused the submission.
    #[error(transparent)]
    Rejected(#[from] DomainError),

    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error(transparent)]
    Wizard(#[from] WizardError),

    #[error("wizard is on the {} step, not submit", .0.as_str())]
    NotReady(WizardStep),

    #[error("a submission is already in flight")]
    InFlight,

    #[error("quote {0} was already submitted")]
    AlreadySubmitted(QuoteId),

    #[error("quote submission failed: {0}")]
    Backend(#[from] BackendError),
}

impl From<EstimateError> for SubmitError {
    fn from(value: EstimateError) -> Self {
        match value {
            EstimateError::Pricing(e) => SubmitError::Pricing(e),
            EstimateError::Backend(e) => SubmitError::Backend(e),
        }
    }
}

/// Validate through the `Quote` aggregate, then write to the sink.
pub async fn dispatch<S>(
    sink: &S,
    ctx: &SessionContext,
    contact: &Contact,
    selection: &Selection,
    estimate: &EstimateResult,
) -> Result<QuoteId, SubmitError>
where
    S: QuoteSink + ?Sized,
{
    let submitted = build_submission(ctx, contact, selection, estimate)?;

    match sink.submit(ctx, &submitted).await {
        Ok(id) => {
            info!(
                tenant_id = %ctx.tenant_id(),
                quote_id = %id,
                total = %submitted.total,
                discount_code = submitted.discount.as_ref().map(|d| d.code.as_str()),
                "quote submitted"
            );
            Ok(id)
        }
        Err(e) => {
            warn!(tenant_id = %ctx.tenant_id(), error = %e, "quote submission failed");
            Err(e.into())
        }
    }
}

/// Reprice `selection` server-side, then dispatch.
pub async fn submit_repriced<B>(
    backend: &B,
    ctx: &SessionContext,
    contact: &Contact,
    selection: &Selection,
    discount_code: Option<&str>,
) -> Result<(QuoteId, EstimateResult), SubmitError>
where
    B: CatalogSource + DiscountDirectory + QuoteSink + ?Sized,
{
    let priced = price_selection(backend, ctx, selection, discount_code).await?;
    let id = dispatch(backend, ctx, contact, selection, &priced.estimate).await?;
    Ok((id, priced.estimate))
}

fn build_submission(
    ctx: &SessionContext,
    contact: &Contact,
    selection: &Selection,
    estimate: &EstimateResult,
) -> Result<QuoteSubmitted, SubmitError> {
    let quote_id = QuoteId::new(AggregateId::new());
    let command = QuoteCommand::SubmitQuote(SubmitQuote {
        tenant_id: ctx.tenant_id(),
        quote_id,
        submitted_by: ctx.user_id(),
        contact: contact.clone(),
        selection: selection.clone(),
        line_items: estimate.line_items.clone(),
        subtotal: estimate.subtotal,
        discount: estimate.discount.clone(),
        total: estimate.total,
        occurred_at: Utc::now(),
    });

    let events = Quote::empty(quote_id).handle(&command)?;
    events
        .into_iter()
        .find_map(|event| match event {
            QuoteEvent::QuoteSubmitted(e) => Some(e),
            _ => None,
        })
        .ok_or_else(|| SubmitError::Rejected(DomainError::invariant("no submission event")))
}
