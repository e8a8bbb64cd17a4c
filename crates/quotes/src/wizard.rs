//! Wizard step controller.
//!
//! Linear steps with a validation gate on each forward move. Going back never
//! invalidates later steps; they are checked again only when the customer
//! moves forward through them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use hearth_pricing::{PricingError, Selection};

use crate::contact::{Contact, FieldError};
use crate::session::EstimateSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Contact,
    Options,
    Review,
    Submit,
}

impl WizardStep {
    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Contact => Some(WizardStep::Options),
            WizardStep::Options => Some(WizardStep::Review),
            WizardStep::Review => Some(WizardStep::Submit),
            WizardStep::Submit => None,
        }
    }

    pub fn prev(self) -> Option<WizardStep> {
        match self {
            WizardStep::Contact => None,
            WizardStep::Options => Some(WizardStep::Contact),
            WizardStep::Review => Some(WizardStep::Options),
            WizardStep::Submit => Some(WizardStep::Review),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WizardStep::Contact => "contact",
            WizardStep::Options => "options",
            WizardStep::Review => "review",
            WizardStep::Submit => "submit",
        }
    }
}

/// Everything the customer has entered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardForm {
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub selection: Option<Selection>,
    #[serde(default)]
    pub discount_code: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum WizardError {
    #[error("{} step has {} invalid field(s)", .step.as_str(), .errors.len())]
    Invalid {
        step: WizardStep,
        errors: Vec<FieldError>,
    },

    /// Blocking: the customer is asked to call instead.
    #[error("pricing unavailable: {0}")]
    PricingUnavailable(PricingError),

    #[error("already at the first step")]
    AtFirstStep,

    #[error("wizard already submitted")]
    Finished,
}

impl WizardError {
    fn invalid(step: WizardStep, field: &'static str, message: &str) -> Self {
        WizardError::Invalid {
            step,
            errors: vec![FieldError {
                field,
                message: message.to_string(),
            }],
        }
    }
}

/// Check whether `step` may be left in the forward direction.
pub fn validate_step(
    step: WizardStep,
    form: &WizardForm,
    session: &EstimateSession,
) -> Result<(), WizardError> {
    match step {
        WizardStep::Contact => {
            let errors = form.contact.validate();
            if errors.is_empty() {
                Ok(())
            } else {
                Err(WizardError::Invalid { step, errors })
            }
        }
        // Both lead into (or out of) a priced step.
        WizardStep::Options | WizardStep::Review => {
            let selection = form
                .selection
                .as_ref()
                .ok_or_else(|| WizardError::invalid(step, "service", "choose a service"))?;
            session
                .estimate(selection)
                .map(|_| ())
                .map_err(WizardError::PricingUnavailable)
        }
        WizardStep::Submit => Err(WizardError::Finished),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepController {
    step: WizardStep,
}

impl Default for StepController {
    fn default() -> Self {
        Self::new()
    }
}

impl StepController {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Contact,
        }
    }

    pub fn current(&self) -> WizardStep {
        self.step
    }

    pub fn is_finished(&self) -> bool {
        self.step == WizardStep::Submit
    }

    /// Move forward if the current step validates.
    pub fn advance(
        &mut self,
        form: &WizardForm,
        session: &EstimateSession,
    ) -> Result<WizardStep, WizardError> {
        validate_step(self.step, form, session)?;
        let next = self.step.next().ok_or(WizardError::Finished)?;
        self.step = next;
        Ok(next)
    }

    pub fn back(&mut self) -> Result<WizardStep, WizardError> {
        if self.is_finished() {
            return Err(WizardError::Finished);
        }
        let prev = self.step.prev().ok_or(WizardError::AtFirstStep)?;
        self.step = prev;
        Ok(prev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Channel;
    use hearth_core::Money;
    use hearth_pricing::{DryerVentOptions, PackageTier, PriceBookEntry, PriceCatalog, Sku};

    fn contact() -> Contact {
        Contact {
            name: "Dana Whitfield".to_string(),
            phone: "555-123-4567".to_string(),
            email: None,
            street: "12 Elm St".to_string(),
            city: "Dayton".to_string(),
            state: "OH".to_string(),
            zip: "45402".to_string(),
        }
    }

    fn form() -> WizardForm {
        WizardForm {
            contact: contact(),
            selection: Some(Selection::DryerVent(DryerVentOptions::new(PackageTier::Better))),
            discount_code: None,
        }
    }

    fn ready_session() -> EstimateSession {
        let mut session = EstimateSession::new();
        let t = session.begin(Channel::Catalog);
        let catalog = PriceCatalog::from_entries(vec![PriceBookEntry::active(
            Sku::new("PKG-COMP").unwrap(),
            Money::from_units(200),
        )])
        .unwrap();
        session.complete_catalog(t, Ok(catalog));
        session
    }

    #[test]
    fn walks_all_steps_when_valid() {
        let session = ready_session();
        let mut wizard = StepController::new();
        assert_eq!(wizard.advance(&form(), &session), Ok(WizardStep::Options));
        assert_eq!(wizard.advance(&form(), &session), Ok(WizardStep::Review));
        assert_eq!(wizard.advance(&form(), &session), Ok(WizardStep::Submit));
        assert!(wizard.is_finished());
        assert_eq!(wizard.advance(&form(), &session), Err(WizardError::Finished));
        assert_eq!(wizard.back(), Err(WizardError::Finished));
    }

    #[test]
    fn invalid_contact_blocks_forward_only() {
        let session = ready_session();
        let mut wizard = StepController::new();
        let mut bad = form();
        bad.contact.zip = "12".to_string();

        match wizard.advance(&bad, &session) {
            Err(WizardError::Invalid { step, errors }) => {
                assert_eq!(step, WizardStep::Contact);
                assert_eq!(errors[0].field, "zip");
            }
            other => panic!("expected invalid contact, got {other:?}"),
        }
        assert_eq!(wizard.current(), WizardStep::Contact);
        assert_eq!(wizard.back(), Err(WizardError::AtFirstStep));
    }

    #[test]
    fn options_require_a_service() {
        let session = ready_session();
        let mut wizard = StepController::new();
        wizard.advance(&form(), &session).unwrap();

        let mut no_service = form();
        no_service.selection = None;
        assert!(matches!(
            wizard.advance(&no_service, &session),
            Err(WizardError::Invalid { step: WizardStep::Options, .. })
        ));
    }

    #[test]
    fn cannot_reach_review_without_pricing() {
        let session = EstimateSession::new();
        let mut wizard = StepController::new();
        wizard.advance(&form(), &session).unwrap();

        assert!(matches!(
            wizard.advance(&form(), &session),
            Err(WizardError::PricingUnavailable(_))
        ));
        assert_eq!(wizard.current(), WizardStep::Options);
    }

    #[test]
    fn missing_sku_price_blocks_review() {
        let session = ready_session();
        let mut wizard = StepController::new();
        wizard.advance(&form(), &session).unwrap();

        let mut roof = DryerVentOptions::new(PackageTier::Better);
        roof.roof_access = true;
        let mut f = form();
        f.selection = Some(Selection::DryerVent(roof));

        match wizard.advance(&f, &session) {
            Err(WizardError::PricingUnavailable(PricingError::Unavailable { missing })) => {
                assert_eq!(missing, vec![Sku::new("ACC-ROOF").unwrap()]);
            }
            other => panic!("expected pricing unavailable, got {other:?}"),
        }
    }

    #[test]
    fn going_back_does_not_revalidate() {
        let session = ready_session();
        let mut wizard = StepController::new();
        wizard.advance(&form(), &session).unwrap();
        wizard.advance(&form(), &session).unwrap();

        // Contact edited into an invalid state while on review.
        let mut edited = form();
        edited.contact.name.clear();
        assert_eq!(wizard.back(), Ok(WizardStep::Options));
        assert_eq!(wizard.advance(&edited, &session), Ok(WizardStep::Review));
    }
}
