use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hearth_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, Event, Money, TenantId, UserId,
};
use hearth_pricing::{AppliedDiscount, LineItem, Selection, compose};

use crate::contact::Contact;

/// Quote identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(pub AggregateId);

impl QuoteId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quote lifecycle, mirroring the CRM lead pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Draft,
    Submitted,
    Accepted,
    Declined,
}

/// Aggregate root: Quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    id: QuoteId,
    tenant_id: Option<TenantId>,
    status: QuoteStatus,
    contact: Contact,
    line_items: Vec<LineItem>,
    total: Money,
    discount: Option<AppliedDiscount>,
    version: u64,
    created: bool,
}

impl Quote {
    /// Create an empty, not-yet-submitted aggregate instance for rehydration.
    pub fn empty(id: QuoteId) -> Self {
        Self {
            id,
            tenant_id: None,
            status: QuoteStatus::Draft,
            contact: Contact::default(),
            line_items: Vec::new(),
            total: Money::ZERO,
            discount: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> QuoteId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn line_items(&self) -> &[LineItem] {
        &self.line_items
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn discount(&self) -> Option<&AppliedDiscount> {
        self.discount.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.status == QuoteStatus::Submitted
    }
}

impl AggregateRoot for Quote {
    type Id = QuoteId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitQuote (final wizard step).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitQuote {
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub submitted_by: Option<UserId>,
    pub contact: Contact,
    pub selection: Selection,
    pub line_items: Vec<LineItem>,
    pub subtotal: Money,
    pub discount: Option<AppliedDiscount>,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AcceptQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptQuote {
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeclineQuote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineQuote {
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteCommand {
    SubmitQuote(SubmitQuote),
    AcceptQuote(AcceptQuote),
    DeclineQuote(DeclineQuote),
}

/// Event: QuoteSubmitted. This is the record handed to the quote sink; it
/// carries the applied discount so partner credits can be audited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteSubmitted {
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub submitted_by: Option<UserId>,
    pub contact: Contact,
    pub selection: Selection,
    pub line_items: Vec<LineItem>,
    pub subtotal: Money,
    pub discount: Option<AppliedDiscount>,
    pub total: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteAccepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAccepted {
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: QuoteDeclined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteDeclined {
    pub tenant_id: TenantId,
    pub quote_id: QuoteId,
    pub reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuoteEvent {
    QuoteSubmitted(QuoteSubmitted),
    QuoteAccepted(QuoteAccepted),
    QuoteDeclined(QuoteDeclined),
}

impl Event for QuoteEvent {
    fn event_type(&self) -> &'static str {
        match self {
            QuoteEvent::QuoteSubmitted(_) => "quotes.quote.submitted",
            QuoteEvent::QuoteAccepted(_) => "quotes.quote.accepted",
            QuoteEvent::QuoteDeclined(_) => "quotes.quote.declined",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QuoteEvent::QuoteSubmitted(e) => e.occurred_at,
            QuoteEvent::QuoteAccepted(e) => e.occurred_at,
            QuoteEvent::QuoteDeclined(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Quote {
    type Command = QuoteCommand;
    type Event = QuoteEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            QuoteEvent::QuoteSubmitted(e) => {
                self.id = e.quote_id;
                self.tenant_id = Some(e.tenant_id);
                self.status = QuoteStatus::Submitted;
                self.contact = e.contact.clone();
                self.line_items = e.line_items.clone();
                self.total = e.total;
                self.discount = e.discount.clone();
                self.created = true;
            }
            QuoteEvent::QuoteAccepted(_) => {
                self.status = QuoteStatus::Accepted;
            }
            QuoteEvent::QuoteDeclined(_) => {
                self.status = QuoteStatus::Declined;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            QuoteCommand::SubmitQuote(cmd) => self.handle_submit(cmd),
            QuoteCommand::AcceptQuote(cmd) => self.handle_accept(cmd),
            QuoteCommand::DeclineQuote(cmd) => self.handle_decline(cmd),
        }
    }
}

impl Quote {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_quote_id(&self, quote_id: QuoteId) -> Result<(), DomainError> {
        if self.id != quote_id {
            return Err(DomainError::invariant("quote_id mismatch"));
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        match self.status {
            QuoteStatus::Submitted => Ok(()),
            QuoteStatus::Draft => Err(DomainError::not_found()),
            QuoteStatus::Accepted | QuoteStatus::Declined => {
                Err(DomainError::conflict("quote is already closed"))
            }
        }
    }

    fn handle_submit(&self, cmd: &SubmitQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("quote already submitted"));
        }

        let contact_errors = cmd.contact.validate();
        if let Some(first) = contact_errors.first() {
            return Err(DomainError::validation(format!(
                "{}: {}",
                first.field, first.message
            )));
        }

        if cmd.line_items.is_empty() {
            return Err(DomainError::validation("quote has no line items"));
        }

        // The submitted lines must be exactly what the selection composes to.
        if cmd.line_items != compose(&cmd.selection) {
            return Err(DomainError::invariant(
                "line items do not match the selected options",
            ));
        }

        let discount_amount = cmd.discount.as_ref().map(|d| d.amount).unwrap_or(Money::ZERO);
        if discount_amount.is_negative() {
            return Err(DomainError::validation("discount cannot be negative"));
        }
        let expected_total = cmd
            .subtotal
            .checked_sub(discount_amount)
            .ok_or_else(|| DomainError::invariant("quote total overflow"))?
            .max(Money::ZERO);
        if cmd.total != expected_total {
            return Err(DomainError::invariant(format!(
                "total {} does not equal subtotal {} less discount {}",
                cmd.total, cmd.subtotal, discount_amount
            )));
        }

        Ok(vec![QuoteEvent::QuoteSubmitted(QuoteSubmitted {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            submitted_by: cmd.submitted_by,
            contact: cmd.contact.clone(),
            selection: cmd.selection.clone(),
            line_items: cmd.line_items.clone(),
            subtotal: cmd.subtotal,
            discount: cmd.discount.clone(),
            total: cmd.total,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_accept(&self, cmd: &AcceptQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_quote_id(cmd.quote_id)?;
        self.ensure_open()?;

        Ok(vec![QuoteEvent::QuoteAccepted(QuoteAccepted {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_decline(&self, cmd: &DeclineQuote) -> Result<Vec<QuoteEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_quote_id(cmd.quote_id)?;
        self.ensure_open()?;

        Ok(vec![QuoteEvent::QuoteDeclined(QuoteDeclined {
            tenant_id: cmd.tenant_id,
            quote_id: cmd.quote_id,
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}
