//! Cancelling batches of offers.

use std::collections::HashSet;

use nftbook_core::{Key, TxCode};

use crate::ledger::{ReadView, Rules, View};
use crate::offers;

use super::{ApplyCtx, Transaction};

/// The most offers a single cancel transaction may list.
pub const MAX_OFFERS_PER_CANCEL: usize = 500;

/// The cancel-offer payload.
#[derive(Clone, Debug)]
pub struct CancelOffer {
    /// The offers to cancel: 1..=500 unique keys.
    pub offers: Vec<Key>,
}

pub(crate) fn preflight(_tx: &Transaction, c: &CancelOffer, rules: &Rules) -> TxCode {
    if !rules.nft_enabled {
        return TxCode::Disabled;
    }
    if c.offers.is_empty() || c.offers.len() > MAX_OFFERS_PER_CANCEL {
        return TxCode::Malformed;
    }
    let unique: HashSet<&Key> = c.offers.iter().collect();
    if unique.len() != c.offers.len() {
        return TxCode::Malformed;
    }
    TxCode::Success
}

pub(crate) fn preclaim(tx: &Transaction, c: &CancelOffer, view: &ReadView) -> TxCode {
    for key in &c.offers {
        // Offers already gone are skipped; they may have been consumed or
        // cancelled earlier in the round.
        let Some(offer) = view.offer(key) else {
            continue;
        };
        // An expired offer is dead weight anyone may clear away. A live one
        // may only be cancelled by its owner or its named destination.
        if !offer.expired_at(view.close_time())
            && offer.owner != tx.account
            && offer.destination != Some(tx.account)
        {
            return TxCode::NoPermission;
        }
    }
    TxCode::Success
}

pub(crate) fn apply(ctx: &mut ApplyCtx, c: &CancelOffer) -> Result<(), TxCode> {
    for key in &c.offers {
        if ctx.view.offer(key).is_some() {
            offers::delete_offer(ctx.view, key)?;
        }
    }
    Ok(())
}
