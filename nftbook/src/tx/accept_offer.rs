//! Accepting offers: direct sales and brokered matches.
//!
//! Settlement runs entirely inside the apply phase, so a failure at any leg
//! discards every earlier leg with it. The mutation order is fixed: the
//! offers are deleted first, then funds move, then the token changes
//! directories. Up to four parties are paid in brokered mode — buyer,
//! seller, broker, and the token's issuer.
//!
//! The issuer's cut is computed *after* the broker's cut is removed.
//! Computing it first could pay out more than the seller's floor
//! authorized when a large broker cut combines with a high transfer fee.

use log::error;

use nftbook_core::{flags, AccountId, Amount, Key, TokenId, TxCode};

use crate::ledger::{holdings, send, ApplyView, ReadView, Rules, View};
use crate::offers::{self, NftOffer};
use crate::pages;

use super::{ApplyCtx, Transaction};

/// The accept-offer payload.
#[derive(Clone, Debug)]
pub struct AcceptOffer {
    /// The buy offer to accept (submitter sells), or the buy side of a
    /// brokered match.
    pub buy_offer: Option<Key>,
    /// The sell offer to accept (submitter buys), or the sell side of a
    /// brokered match.
    pub sell_offer: Option<Key>,
    /// Brokered mode only: the broker's cut, paid by the buyer.
    pub broker_fee: Option<Amount>,
}

pub(crate) fn preflight(_tx: &Transaction, a: &AcceptOffer, rules: &Rules) -> TxCode {
    if !rules.nft_enabled {
        return TxCode::Disabled;
    }
    if a.buy_offer.is_none() && a.sell_offer.is_none() {
        return TxCode::Malformed;
    }
    if let Some(fee) = &a.broker_fee {
        if a.buy_offer.is_none() || a.sell_offer.is_none() {
            return TxCode::Malformed;
        }
        if fee.is_zero() {
            return TxCode::Malformed;
        }
    }
    TxCode::Success
}

pub(crate) fn preclaim(tx: &Transaction, a: &AcceptOffer, view: &ReadView) -> TxCode {
    for key in [&a.buy_offer, &a.sell_offer].into_iter().flatten() {
        let Some(offer) = view.offer(key) else {
            return TxCode::ObjectNotFound;
        };
        if offer.expired_at(view.close_time()) {
            return TxCode::Expired;
        }
    }

    let buy = a.buy_offer.as_ref().and_then(|k| view.offer(k));
    let sell = a.sell_offer.as_ref().and_then(|k| view.offer(k));

    if let (Some(bo), Some(so)) = (buy, sell) {
        // Brokered mode: the two offers must describe the same trade.
        if bo.token_id != so.token_id {
            return TxCode::BuySellMismatch;
        }
        if !bo.amount.same_asset(&so.amount) {
            return TxCode::BuySellMismatch;
        }
        // The buyer must be willing to pay at least the seller's ask.
        if so.amount.value > bo.amount.value {
            return TxCode::InsufficientPayment;
        }
        if let Some(dest) = so.destination {
            if dest != bo.owner {
                return TxCode::BuySellMismatch;
            }
        }
        if let Some(fee) = &a.broker_fee {
            if !fee.same_asset(&bo.amount) {
                return TxCode::BuySellMismatch;
            }
            if fee.value >= bo.amount.value {
                return TxCode::InsufficientPayment;
            }
            // The ask must survive the broker's cut.
            if so.amount.value > bo.amount.value - fee.value {
                return TxCode::InsufficientPayment;
            }
        }
    }

    if let Some(bo) = buy {
        if bo.is_sell() {
            return TxCode::OfferTypeMismatch;
        }
        if bo.owner == tx.account {
            return TxCode::CantAcceptOwnOffer;
        }
        // Accepting a buy offer directly means the submitter is the seller
        // and must hold the token.
        if sell.is_none() && pages::find_token(view, &tx.account, &bo.token_id).is_none() {
            return TxCode::NoPermission;
        }
        // The buyer pays in every mode; they must be good for it.
        if holdings(view, &bo.owner, &bo.amount.asset) < bo.amount.value {
            return TxCode::InsufficientFunds;
        }
    }

    if let Some(so) = sell {
        if !so.is_sell() {
            return TxCode::OfferTypeMismatch;
        }
        if so.owner == tx.account {
            return TxCode::CantAcceptOwnOffer;
        }
        // The seller must still hold the token they listed.
        if pages::find_token(view, &so.owner, &so.token_id).is_none() {
            return TxCode::NoPermission;
        }
        if buy.is_none() {
            if let Some(dest) = so.destination {
                if dest != tx.account {
                    return TxCode::NoPermission;
                }
            }
            // Direct acceptance: the submitter is the buyer and pays the
            // ask themselves. (Brokered funding is checked on the buy side.)
            if holdings(view, &tx.account, &so.amount.asset) < so.amount.value {
                return TxCode::InsufficientFunds;
            }
        }
    }

    TxCode::Success
}

pub(crate) fn apply(ctx: &mut ApplyCtx, a: &AcceptOffer) -> Result<(), TxCode> {
    let load = |view: &ApplyView, key: &Option<Key>| -> Result<Option<NftOffer>, TxCode> {
        match key {
            None => Ok(None),
            Some(key) => match view.offer(key).cloned() {
                Some(offer) => Ok(Some(offer)),
                None => {
                    // Verified in preclaim; nothing in this transaction has
                    // deleted it yet.
                    error!("accepted offer vanished before settlement");
                    Err(TxCode::Internal)
                }
            },
        }
    };

    let bo = load(ctx.view, &a.buy_offer)?;
    let so = load(ctx.view, &a.sell_offer)?;

    // Offers leave the books before any funds move.
    if let Some(key) = &a.buy_offer {
        offers::delete_offer(ctx.view, key)?;
    }
    if let Some(key) = &a.sell_offer {
        offers::delete_offer(ctx.view, key)?;
    }

    match (bo, so) {
        (Some(bo), Some(so)) => broker(ctx, a, &bo, &so),
        (Some(bo), None) => direct(ctx, &bo),
        (None, Some(so)) => direct(ctx, &so),
        (None, None) => Err(TxCode::Internal),
    }
}

/// Brokered settlement: the submitter matched two strangers' offers.
fn broker(
    ctx: &mut ApplyCtx,
    a: &AcceptOffer,
    bo: &NftOffer,
    so: &NftOffer,
) -> Result<(), TxCode> {
    let buyer = bo.owner;
    let seller = so.owner;
    let token = so.token_id;

    // The buyer pays their full offer; it is carved up from there.
    let mut amount = bo.amount;

    if let Some(fee) = &a.broker_fee {
        if !fee.is_zero() {
            send(ctx.view, &buyer, &ctx.account, fee, false)?;
            amount = amount.checked_sub(fee).ok_or(TxCode::Internal)?;
        }
    }

    amount = pay_issuer_cut(ctx.view, &buyer, &seller, &token, amount)?;

    if !amount.is_zero() {
        send(ctx.view, &buyer, &seller, &amount, false)?;
    }

    move_token(ctx.view, &seller, &buyer, &token)
}

/// Direct settlement: the submitter takes the counterparty role the offer
/// implies.
fn direct(ctx: &mut ApplyCtx, offer: &NftOffer) -> Result<(), TxCode> {
    let (buyer, seller) = if offer.is_sell() {
        (ctx.account, offer.owner)
    } else {
        (offer.owner, ctx.account)
    };
    let token = offer.token_id;

    if !offer.amount.is_zero() {
        let amount = pay_issuer_cut(ctx.view, &buyer, &seller, &token, offer.amount)?;
        send(ctx.view, &buyer, &seller, &amount, false)?;
    }

    move_token(ctx.view, &seller, &buyer, &token)
}

/// Pay the issuer's transfer-fee cut out of `amount`, returning what is
/// left for the seller. No cut is taken when either principal *is* the
/// issuer.
fn pay_issuer_cut(
    view: &mut ApplyView,
    buyer: &AccountId,
    seller: &AccountId,
    token: &TokenId,
    amount: Amount,
) -> Result<Amount, TxCode> {
    let fee = token.transfer_fee();
    if amount.is_zero() || fee == 0 {
        return Ok(amount);
    }

    let issuer = token.issuer();
    if *seller == issuer || *buyer == issuer {
        return Ok(amount);
    }

    let cut = amount.transfer_cut(fee);
    if cut.is_zero() {
        return Ok(amount);
    }

    let auto_line = token.has_flag(flags::CREATE_TRUST_LINES);
    send(view, buyer, &issuer, &cut, auto_line)?;
    amount.checked_sub(&cut).ok_or(TxCode::Internal)
}

/// Move the token from the seller's directory to the buyer's.
fn move_token(
    view: &mut ApplyView,
    seller: &AccountId,
    buyer: &AccountId,
    token: &TokenId,
) -> Result<(), TxCode> {
    let Some(entry) = pages::find_token(view, seller, token) else {
        error!("settled token is not in the seller's directory");
        return Err(TxCode::Internal);
    };
    pages::remove_token(view, seller, token)?;
    pages::insert_token(view, buyer, entry)
}
