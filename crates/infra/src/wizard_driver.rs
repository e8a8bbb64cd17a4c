//! Drives one estimate wizard run against a backend.
//!
//! The session state sits behind a mutex that is released while a remote
//! call is outstanding, so catalog loads and discount lookups may overlap.
//! Each call takes a request token before it goes out and presents it when it
//! resolves; a completion that was superseded meanwhile is dropped.

use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use hearth_core::SessionContext;
use hearth_pricing::{DiscountOutcome, EstimateResult, Selection};
use hearth_quotes::{
    CatalogState, Channel, EstimateSession, FieldError, QuoteId, Resolution, StepController,
    WizardError, WizardForm, WizardStep,
};

use crate::backend::{BackendError, CatalogSource, DiscountDirectory, QuoteSink};
use crate::estimator::{load_catalog, resolve_discount};
use crate::submission::{SubmitError, dispatch};

#[derive(Debug, Default)]
struct WizardState {
    session: EstimateSession,
    steps: StepController,
    form: WizardForm,
    submitting: bool,
    submitted: Option<QuoteId>,
}

pub struct WizardDriver<B> {
    backend: B,
    ctx: SessionContext,
    state: Mutex<WizardState>,
}

impl<B> WizardDriver<B>
where
    B: CatalogSource + DiscountDirectory + QuoteSink,
{
    pub fn new(backend: B, ctx: SessionContext) -> Self {
        Self {
            backend,
            ctx,
            state: Mutex::new(WizardState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn current_step(&self) -> WizardStep {
        self.state().steps.current()
    }

    pub fn form(&self) -> WizardForm {
        self.state().form.clone()
    }

    /// Apply customer edits. Never revalidates any step.
    pub fn edit(&self, f: impl FnOnce(&mut WizardForm)) {
        f(&mut self.state().form);
    }

    pub fn catalog_state(&self) -> CatalogState {
        self.state().session.catalog().clone()
    }

    pub fn discount(&self) -> DiscountOutcome {
        self.state().session.discount().clone()
    }

    /// Load the session's catalog snapshot (the whole active price book).
    pub async fn load_catalog(&self) -> Resolution {
        let token = self.state().session.begin(Channel::Catalog);
        let result = load_catalog(&self.backend, &self.ctx, None).await;
        let resolution = self.state().session.complete_catalog(token, result);
        if resolution == Resolution::Stale {
            debug!(tenant_id = %self.ctx.tenant_id(), seq = token.seq(), "stale catalog response dropped");
        }
        resolution
    }

    /// Look up the code the customer typed and store it on the form. A blank
    /// code clears any applied discount, and so does a lookup that fails.
    pub async fn apply_discount_code(&self, code: &str) -> Result<Resolution, BackendError> {
        let token = {
            let mut state = self.state();
            let trimmed = code.trim();
            if trimmed.is_empty() {
                state.form.discount_code = None;
                state.session.clear_discount();
                return Ok(Resolution::Applied);
            }
            state.form.discount_code = Some(trimmed.to_string());
            state.session.begin(Channel::Discount)
        };

        let outcome = match resolve_discount(&self.backend, &self.ctx, Some(code)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let mut state = self.state();
                if state.session.fail_discount(token) == Resolution::Applied {
                    state.form.discount_code = None;
                    warn!(tenant_id = %self.ctx.tenant_id(), error = %e, "discount lookup failed, code dropped");
                }
                return Err(e);
            }
        };
        let resolution = self.state().session.complete_discount(token, outcome);
        if resolution == Resolution::Stale {
            debug!(tenant_id = %self.ctx.tenant_id(), seq = token.seq(), "stale discount response dropped");
        }
        Ok(resolution)
    }

    /// Current estimate for the review step.
    pub fn estimate(&self) -> Result<EstimateResult, WizardError> {
        let state = self.state();
        let selection = selected(&state.form)?;
        state
            .session
            .estimate(selection)
            .map_err(WizardError::PricingUnavailable)
    }

    pub fn advance(&self) -> Result<WizardStep, WizardError> {
        let mut state = self.state();
        let WizardState {
            session,
            steps,
            form,
            ..
        } = &mut *state;
        let result = steps.advance(form, session);
        if let Err(WizardError::PricingUnavailable(e)) = &result {
            warn!(tenant_id = %self.ctx.tenant_id(), error = %e, "pricing unavailable, wizard blocked");
        }
        result
    }

    pub fn back(&self) -> Result<WizardStep, WizardError> {
        self.state().steps.back()
    }

    /// Send the quote. Only possible once the wizard reached the submit step,
    /// and only once.
    pub async fn submit(&self) -> Result<QuoteId, SubmitError> {
        let (contact, selection, estimate) = {
            let mut state = self.state();
            if let Some(id) = state.submitted {
                return Err(SubmitError::AlreadySubmitted(id));
            }
            if state.submitting {
                return Err(SubmitError::InFlight);
            }
            if !state.steps.is_finished() {
                return Err(SubmitError::NotReady(state.steps.current()));
            }
            let selection = selected(&state.form)?.clone();
            let estimate = state
                .session
                .estimate(&selection)
                .map_err(SubmitError::Pricing)?;
            state.submitting = true;
            (state.form.contact.clone(), selection, estimate)
        };

        let in_flight = SubmitInFlight(&self.state);
        let result = dispatch(&self.backend, &self.ctx, &contact, &selection, &estimate).await;

        if let Ok(id) = &result {
            self.state().submitted = Some(*id);
        }
        drop(in_flight);
        result
    }
}

/// Clears `submitting` when dropped, including when the submit future is
/// cancelled mid-dispatch.
struct SubmitInFlight<'a>(&'a Mutex<WizardState>);

impl Drop for SubmitInFlight<'_> {
    fn drop(&mut self) {
        self.0
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .submitting = false;
    }
}

fn selected(form: &WizardForm) -> Result<&Selection, WizardError> {
    form.selection.as_ref().ok_or_else(|| WizardError::Invalid {
        step: WizardStep::Options,
        errors: vec![FieldError {
            field: "service",
            message: "choose a service".to_string(),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use hearth_core::{Money, TenantId};
    use hearth_pricing::{
        DiscountKind, DiscountRecord, DryerVentOptions, PackageTier, PriceBookEntry, Selection, Sku,
    };
    use hearth_quotes::{Contact, QuoteSubmitted};

    use crate::backend::InMemoryBackend;

    /// Delays lookups of `SLOW` so a later lookup can overtake it.
    struct Laggy(Arc<InMemoryBackend>);

    #[async_trait]
    impl CatalogSource for Laggy {
        async fn load(
            &self,
            ctx: &SessionContext,
            only: Option<&[Sku]>,
        ) -> Result<Vec<PriceBookEntry>, BackendError> {
            self.0.load(ctx, only).await
        }
    }

    #[async_trait]
    impl DiscountDirectory for Laggy {
        async fn lookup(
            &self,
            ctx: &SessionContext,
            code: &str,
        ) -> Result<Option<DiscountRecord>, BackendError> {
            if code.trim().eq_ignore_ascii_case("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.0.lookup(ctx, code).await
        }
    }

    #[async_trait]
    impl QuoteSink for Laggy {
        async fn submit(
            &self,
            ctx: &SessionContext,
            quote: &QuoteSubmitted,
        ) -> Result<QuoteId, BackendError> {
            self.0.submit(ctx, quote).await
        }
    }

    /// Lookups fail while `fail_lookups` is set; submits take `submit_delay`.
    struct Unreliable {
        inner: Arc<InMemoryBackend>,
        fail_lookups: AtomicBool,
        submit_delay: Duration,
    }

    impl Unreliable {
        fn new(inner: Arc<InMemoryBackend>) -> Self {
            Self {
                inner,
                fail_lookups: AtomicBool::new(false),
                submit_delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl CatalogSource for Unreliable {
        async fn load(
            &self,
            ctx: &SessionContext,
            only: Option<&[Sku]>,
        ) -> Result<Vec<PriceBookEntry>, BackendError> {
            self.inner.load(ctx, only).await
        }
    }

    #[async_trait]
    impl DiscountDirectory for Unreliable {
        async fn lookup(
            &self,
            ctx: &SessionContext,
            code: &str,
        ) -> Result<Option<DiscountRecord>, BackendError> {
            if self.fail_lookups.load(Ordering::SeqCst) {
                return Err(BackendError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            self.inner.lookup(ctx, code).await
        }
    }

    #[async_trait]
    impl QuoteSink for Unreliable {
        async fn submit(
            &self,
            ctx: &SessionContext,
            quote: &QuoteSubmitted,
        ) -> Result<QuoteId, BackendError> {
            tokio::time::sleep(self.submit_delay).await;
            self.inner.submit(ctx, quote).await
        }
    }

    fn partner(code: &str, amount: i64) -> DiscountRecord {
        DiscountRecord {
            code: code.to_string(),
            org_name: format!("{code} Partners"),
            active: true,
            kind: DiscountKind::Flat {
                amount: Money::from_units(amount),
            },
        }
    }

    fn seeded() -> (Arc<InMemoryBackend>, SessionContext) {
        let backend = Arc::new(InMemoryBackend::new());
        let ctx = SessionContext::anonymous(TenantId::new());
        backend.seed_prices(
            ctx.tenant_id(),
            [
                PriceBookEntry::active(Sku::new("PKG-COMP").unwrap(), Money::from_units(200)),
                PriceBookEntry::active(Sku::new("ACC-ROOF").unwrap(), Money::from_units(50)),
            ],
        );
        backend.seed_discount(ctx.tenant_id(), partner("SLOW", 100));
        backend.seed_discount(ctx.tenant_id(), partner("FAST", 25));
        (backend, ctx)
    }

    fn fill(form: &mut WizardForm) {
        form.contact = Contact {
            name: "Dana Whitfield".to_string(),
            phone: "555-123-4567".to_string(),
            email: None,
            street: "12 Elm St".to_string(),
            city: "Dayton".to_string(),
            state: "OH".to_string(),
            zip: "45402".to_string(),
        };
        let mut o = DryerVentOptions::new(PackageTier::Better);
        o.roof_access = true;
        form.selection = Some(Selection::DryerVent(o));
    }

    #[tokio::test]
    async fn full_run_submits_once() {
        let (backend, ctx) = seeded();
        let driver = WizardDriver::new(backend.clone(), ctx);
        driver.edit(fill);

        assert_eq!(driver.load_catalog().await, Resolution::Applied);
        assert_eq!(driver.advance(), Ok(WizardStep::Options));
        assert_eq!(driver.advance(), Ok(WizardStep::Review));
        assert_eq!(driver.estimate().unwrap().total, Money::from_units(250));
        assert_eq!(driver.advance(), Ok(WizardStep::Submit));

        let id = driver.submit().await.unwrap();
        assert!(matches!(driver.submit().await, Err(SubmitError::AlreadySubmitted(x)) if x == id));
        assert_eq!(backend.quotes(ctx.tenant_id()).len(), 1);
    }

    #[tokio::test]
    async fn cannot_submit_before_reaching_submit_step() {
        let (backend, ctx) = seeded();
        let driver = WizardDriver::new(backend, ctx);
        driver.edit(fill);
        driver.load_catalog().await;

        assert!(matches!(
            driver.submit().await,
            Err(SubmitError::NotReady(WizardStep::Contact))
        ));
    }

    #[tokio::test]
    async fn missing_price_blocks_priced_steps() {
        let backend = Arc::new(InMemoryBackend::new());
        let ctx = SessionContext::anonymous(TenantId::new());
        backend.seed_prices(
            ctx.tenant_id(),
            [PriceBookEntry::active(Sku::new("PKG-COMP").unwrap(), Money::from_units(200))],
        );
        let driver = WizardDriver::new(backend, ctx);
        driver.edit(fill);
        driver.load_catalog().await;

        driver.advance().unwrap();
        assert!(matches!(driver.advance(), Err(WizardError::PricingUnavailable(_))));
        assert_eq!(driver.current_step(), WizardStep::Options);
    }

    #[tokio::test]
    async fn overtaken_discount_lookup_is_discarded() {
        let (backend, ctx) = seeded();
        let driver = WizardDriver::new(Laggy(backend), ctx);
        driver.edit(fill);
        driver.load_catalog().await;

        let (slow, fast) = tokio::join!(
            driver.apply_discount_code("slow"),
            async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                driver.apply_discount_code("fast").await
            }
        );

        assert_eq!(slow.unwrap(), Resolution::Stale);
        assert_eq!(fast.unwrap(), Resolution::Applied);
        assert_eq!(driver.estimate().unwrap().total, Money::from_units(225));
        assert_eq!(driver.form().discount_code.as_deref(), Some("fast"));
    }

    #[tokio::test]
    async fn blank_code_clears_discount() {
        let (backend, ctx) = seeded();
        let driver = WizardDriver::new(backend, ctx);
        driver.edit(fill);
        driver.load_catalog().await;

        driver.apply_discount_code("FAST").await.unwrap();
        assert_eq!(driver.estimate().unwrap().total, Money::from_units(225));

        driver.apply_discount_code("  ").await.unwrap();
        assert_eq!(driver.discount(), DiscountOutcome::NoCode);
        assert_eq!(driver.estimate().unwrap().total, Money::from_units(250));
    }

    #[tokio::test]
    async fn failed_lookup_drops_the_previous_discount() {
        let (backend, ctx) = seeded();
        let driver = WizardDriver::new(Unreliable::new(backend.clone()), ctx);
        driver.edit(fill);
        driver.load_catalog().await;

        driver.apply_discount_code("FAST").await.unwrap();
        assert_eq!(driver.estimate().unwrap().total, Money::from_units(225));

        driver.backend.fail_lookups.store(true, Ordering::SeqCst);
        assert!(driver.apply_discount_code("SLOW").await.is_err());

        assert_eq!(driver.form().discount_code, None);
        assert_eq!(driver.discount(), DiscountOutcome::NoCode);
        assert_eq!(driver.estimate().unwrap().total, Money::from_units(250));

        driver.advance().unwrap();
        driver.advance().unwrap();
        driver.advance().unwrap();
        driver.submit().await.unwrap();
        let quotes = backend.quotes(ctx.tenant_id());
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].discount, None);
        assert_eq!(quotes[0].total, Money::from_units(250));
    }

    #[tokio::test]
    async fn cancelled_submit_can_be_retried() {
        let (backend, ctx) = seeded();
        let mut unreliable = Unreliable::new(backend.clone());
        unreliable.submit_delay = Duration::from_millis(100);
        let driver = WizardDriver::new(unreliable, ctx);
        driver.edit(fill);
        driver.load_catalog().await;
        driver.advance().unwrap();
        driver.advance().unwrap();
        driver.advance().unwrap();

        let cancelled = tokio::time::timeout(Duration::from_millis(5), driver.submit()).await;
        assert!(cancelled.is_err());
        assert!(backend.quotes(ctx.tenant_id()).is_empty());

        driver.submit().await.unwrap();
        assert_eq!(backend.quotes(ctx.tenant_id()).len(), 1);
    }
}
