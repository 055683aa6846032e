//! The five NFT transactions and their three-phase contract.
//!
//! Every transaction passes through the same stages:
//!
//! 1. **preflight** — stateless syntactic checks against the rule snapshot;
//! 2. **preclaim** — read-only state checks, so obviously-doomed
//!    transactions are rejected before any mutation;
//! 3. **apply** — the sole mutating phase, run against a private view.
//!
//! The dispatcher in [`crate::ledger`] owns fee charging, sequence numbers,
//! and commit/discard; the stage functions here only produce result codes.

use nftbook_core::{AccountId, TxCode};

use crate::ledger::{ApplyView, ReadView, Rules};

mod accept_offer;
mod burn;
mod cancel_offer;
mod create_offer;
mod mint;

pub use accept_offer::AcceptOffer;
pub use burn::{Burn, MAX_OFFERS_AT_BURN};
pub use cancel_offer::{CancelOffer, MAX_OFFERS_PER_CANCEL};
pub use create_offer::CreateOffer;
pub use mint::Mint;

/// A submitted transaction: the common envelope plus the typed payload.
#[derive(Clone, Debug)]
pub struct Transaction {
    /// The submitting account.
    pub account: AccountId,
    /// The declared fee, in drops. Must meet the ledger's base fee.
    pub fee: u64,
    /// The typed payload.
    pub kind: TxKind,
}

/// The typed payload of a transaction.
#[derive(Clone, Debug)]
pub enum TxKind {
    /// Mint a new token into the submitter's directory.
    Mint(Mint),
    /// Burn an existing token.
    Burn(Burn),
    /// Place a buy or sell offer.
    CreateOffer(CreateOffer),
    /// Cancel a batch of offers.
    CancelOffer(CancelOffer),
    /// Accept an offer directly or broker two of them.
    AcceptOffer(AcceptOffer),
}

/// Context handed to the apply stage.
pub(crate) struct ApplyCtx<'a> {
    /// The transaction's private mutable view.
    pub view: &'a mut ApplyView,
    /// The submitting account.
    pub account: AccountId,
    /// The sequence number this transaction consumed.
    pub sequence: u32,
    /// The submitter's balance before this transaction's fee was charged.
    /// Reserve checks compare against this, not the post-fee balance.
    pub prior_balance: u64,
}

impl Transaction {
    /// Stage 1: stateless checks.
    pub fn preflight(&self, rules: &Rules) -> TxCode {
        match &self.kind {
            TxKind::Mint(m) => mint::preflight(self, m, rules),
            TxKind::Burn(b) => burn::preflight(self, b, rules),
            TxKind::CreateOffer(c) => create_offer::preflight(self, c, rules),
            TxKind::CancelOffer(c) => cancel_offer::preflight(self, c, rules),
            TxKind::AcceptOffer(a) => accept_offer::preflight(self, a, rules),
        }
    }

    /// Stage 2: read-only state checks.
    pub(crate) fn preclaim(&self, view: &ReadView) -> TxCode {
        match &self.kind {
            TxKind::Mint(m) => mint::preclaim(self, m, view),
            TxKind::Burn(b) => burn::preclaim(self, b, view),
            TxKind::CreateOffer(c) => create_offer::preclaim(self, c, view),
            TxKind::CancelOffer(c) => cancel_offer::preclaim(self, c, view),
            TxKind::AcceptOffer(a) => accept_offer::preclaim(self, a, view),
        }
    }

    /// Stage 3: the mutating phase.
    pub(crate) fn apply(&self, ctx: &mut ApplyCtx) -> TxCode {
        let applied = match &self.kind {
            TxKind::Mint(m) => mint::apply(ctx, m),
            TxKind::Burn(b) => burn::apply(ctx, b),
            TxKind::CreateOffer(c) => create_offer::apply(ctx, c),
            TxKind::CancelOffer(c) => cancel_offer::apply(ctx, c),
            TxKind::AcceptOffer(a) => accept_offer::apply(ctx, a),
        };
        match applied {
            Ok(()) => TxCode::Success,
            Err(code) => code,
        }
    }
}

/// Whether `account` is the current authorized minter of `issuer`.
pub(crate) fn is_authorized_minter(
    view: &impl crate::ledger::View,
    issuer: &AccountId,
    account: &AccountId,
) -> bool {
    view.account(issuer)
        .and_then(|root| root.minter)
        .as_ref()
        == Some(account)
}
