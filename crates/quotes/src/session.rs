//! Per-wizard estimate session.
//!
//! Holds the price catalog snapshot and the resolved discount code for one
//! wizard run. Remote loads are asynchronous and may resolve out of order, so
//! every load takes a [`RequestToken`]; a completion carrying anything but the
//! latest token for its channel is discarded.

use serde::Serialize;

use hearth_pricing::{
    DiscountOutcome, EstimateResult, PriceCatalog, PricingError, Selection, estimate,
};

/// Independent request streams within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Catalog,
    Discount,
}

/// Issued when a remote request starts; presented again when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    channel: Channel,
    seq: u64,
}

impl RequestToken {
    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// What happened to a completed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response was the latest for its channel and is now session state.
    Applied,
    /// A newer request superseded this one (or the session is closed to
    /// updates); the response was dropped.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    NotLoaded,
    Loading,
    Ready(PriceCatalog),
    /// Terminal for the session: no later load may revive pricing.
    Unavailable(PricingError),
}

#[derive(Debug, Clone)]
pub struct EstimateSession {
    catalog: CatalogState,
    discount: DiscountOutcome,
    next_seq: u64,
    latest_catalog: Option<u64>,
    latest_discount: Option<u64>,
}

impl Default for EstimateSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateSession {
    pub fn new() -> Self {
        Self {
            catalog: CatalogState::NotLoaded,
            discount: DiscountOutcome::NoCode,
            next_seq: 0,
            latest_catalog: None,
            latest_discount: None,
        }
    }

    /// Start a request on `channel`. Any earlier outstanding request on the
    /// same channel becomes stale.
    pub fn begin(&mut self, channel: Channel) -> RequestToken {
        self.next_seq += 1;
        let seq = self.next_seq;
        match channel {
            Channel::Catalog => {
                self.latest_catalog = Some(seq);
                if !matches!(self.catalog, CatalogState::Unavailable(_)) {
                    self.catalog = CatalogState::Loading;
                }
            }
            Channel::Discount => self.latest_discount = Some(seq),
        }
        RequestToken { channel, seq }
    }

    fn is_latest(&self, token: RequestToken) -> bool {
        let latest = match token.channel {
            Channel::Catalog => self.latest_catalog,
            Channel::Discount => self.latest_discount,
        };
        latest == Some(token.seq)
    }

    /// Resolve a catalog load.
    pub fn complete_catalog(
        &mut self,
        token: RequestToken,
        result: Result<PriceCatalog, PricingError>,
    ) -> Resolution {
        if token.channel != Channel::Catalog || !self.is_latest(token) {
            return Resolution::Stale;
        }
        if matches!(self.catalog, CatalogState::Unavailable(_)) {
            return Resolution::Stale;
        }
        self.catalog = match result {
            Ok(catalog) => CatalogState::Ready(catalog),
            Err(e) => CatalogState::Unavailable(e),
        };
        Resolution::Applied
    }

    /// Resolve a discount-code lookup.
    pub fn complete_discount(&mut self, token: RequestToken, outcome: DiscountOutcome) -> Resolution {
        if token.channel != Channel::Discount || !self.is_latest(token) {
            return Resolution::Stale;
        }
        self.discount = outcome;
        Resolution::Applied
    }

    /// Resolve a discount-code lookup that errored. If it was still the
    /// latest lookup, no code is applied afterwards.
    pub fn fail_discount(&mut self, token: RequestToken) -> Resolution {
        if token.channel != Channel::Discount || !self.is_latest(token) {
            return Resolution::Stale;
        }
        self.clear_discount();
        Resolution::Applied
    }

    /// Drop the discount code (and make any in-flight lookup stale).
    pub fn clear_discount(&mut self) {
        self.latest_discount = None;
        self.discount = DiscountOutcome::NoCode;
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn discount(&self) -> &DiscountOutcome {
        &self.discount
    }

    /// `true` once a catalog snapshot is loaded and usable.
    pub fn pricing_ready(&self) -> bool {
        matches!(self.catalog, CatalogState::Ready(_))
    }

    /// Price `selection` against the session snapshot.
    pub fn estimate(&self, selection: &Selection) -> Result<EstimateResult, PricingError> {
        match &self.catalog {
            CatalogState::Ready(catalog) => estimate(selection, catalog, self.discount.record()),
            CatalogState::Unavailable(e) => Err(e.clone()),
            CatalogState::NotLoaded | CatalogState::Loading => {
                Err(PricingError::catalog("price catalog not loaded"))
            }
        }
    }
}
