use serde::{Deserialize, Serialize};

use hearth_core::Money;
use hearth_infra::PricedEstimate;
use hearth_pricing::{DiscountOutcome, EstimateResult, Selection};
use hearth_quotes::{Contact, QuoteId, WizardStep};
use hearth_tenants::FlagKey;

#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub selection: Selection,
    #[serde(default)]
    pub discount_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscountView {
    pub outcome: DiscountOutcome,
    /// Inline text shown under the code field.
    pub message: Option<String>,
}

impl From<DiscountOutcome> for DiscountView {
    fn from(outcome: DiscountOutcome) -> Self {
        Self {
            message: outcome.message(),
            outcome,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub estimate: EstimateResult,
    pub discount: DiscountView,
}

impl From<PricedEstimate> for EstimateResponse {
    fn from(priced: PricedEstimate) -> Self {
        Self {
            estimate: priced.estimate,
            discount: priced.discount.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitQuoteRequest {
    pub contact: Contact,
    pub selection: Selection,
    #[serde(default)]
    pub discount_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmitQuoteResponse {
    pub id: QuoteId,
    pub total: Money,
    pub estimate: EstimateResult,
}

#[derive(Debug, Serialize)]
pub struct FlagView {
    pub key: FlagKey,
    pub enabled: bool,
}

pub fn flags_to_json(flags: Vec<(FlagKey, bool)>) -> serde_json::Value {
    let items = flags
        .into_iter()
        .map(|(key, enabled)| FlagView { key, enabled })
        .collect::<Vec<_>>();
    serde_json::json!({ "items": items })
}

#[derive(Debug, Deserialize)]
pub struct ToggleFlagRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StepValidated {
    pub step: WizardStep,
    pub next: Option<WizardStep>,
}
