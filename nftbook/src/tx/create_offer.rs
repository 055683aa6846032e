//! Placing buy and sell offers.
//!
//! Funds are not locked at offer creation; funding is re-checked when the
//! offer is accepted. The checks here keep obviously-dead offers out of the
//! ledger and enforce the token's denomination and transferability rules.

use nftbook_core::{flags, keys, AccountId, Amount, Asset, TokenId, TxCode};

use crate::ledger::{holdings, ReadView, Rules, View};
use crate::offers::{self, NftOffer};
use crate::pages;

use super::{is_authorized_minter, ApplyCtx, Transaction};

/// The create-offer payload.
#[derive(Clone, Debug)]
pub struct CreateOffer {
    /// The token the offer is for.
    pub token_id: TokenId,
    /// The offered (buy) or requested (sell) amount.
    pub amount: Amount,
    /// Buy offers only: the token's current owner.
    pub owner: Option<AccountId>,
    /// Sell offers only: the only account allowed to accept.
    pub destination: Option<AccountId>,
    /// Expiration in close-time units; zero is malformed.
    pub expiration: Option<u32>,
    /// Offer flags; [`flags::SELL_OFFER`] selects the side.
    pub flags: u32,
}

impl CreateOffer {
    fn is_sell(&self) -> bool {
        self.flags & flags::SELL_OFFER != 0
    }
}

pub(crate) fn preflight(tx: &Transaction, c: &CreateOffer, rules: &Rules) -> TxCode {
    if !rules.nft_enabled {
        return TxCode::Disabled;
    }
    if c.flags & !flags::CREATE_OFFER_FLAGS != 0 {
        return TxCode::InvalidFlag;
    }

    if c.token_id.has_flag(flags::ONLY_XRP) && !c.amount.is_native() {
        return TxCode::BadAmount;
    }

    if c.is_sell() {
        // The submitter is the implicit owner of a sell offer.
        if c.owner.is_some() {
            return TxCode::Malformed;
        }
    } else {
        // A buy offer must name the token's owner, and it cannot be the
        // submitter buying from themselves.
        match c.owner {
            None => return TxCode::Malformed,
            Some(owner) if owner == tx.account => return TxCode::Malformed,
            Some(_) => {}
        }
        if c.amount.is_zero() {
            return TxCode::BadAmount;
        }
    }

    if let Some(dest) = c.destination {
        if !c.is_sell() || dest == tx.account {
            return TxCode::Malformed;
        }
    }

    if c.expiration == Some(0) {
        return TxCode::BadExpiration;
    }

    TxCode::Success
}

pub(crate) fn preclaim(tx: &Transaction, c: &CreateOffer, view: &ReadView) -> TxCode {
    let token_owner = if c.is_sell() {
        tx.account
    } else {
        // Present by preflight.
        c.owner.expect("buy offers carry an owner")
    };

    if pages::find_token(view, &token_owner, &c.token_id).is_none() {
        return TxCode::NoEntry;
    }

    if let Some(exp) = c.expiration {
        if exp <= view.close_time() {
            return TxCode::Expired;
        }
    }

    if let Some(dest) = &c.destination {
        if view.account(dest).is_none() {
            return TxCode::NoDst;
        }
    }

    if !c.token_id.has_flag(flags::TRANSFERABLE) {
        let issuer = c.token_id.issuer();
        if tx.account != issuer && !is_authorized_minter(view, &issuer, &tx.account) {
            return TxCode::TokenNotTransferable;
        }
    }

    if let Asset::Issued { currency, issuer } = &c.amount.asset {
        if view.account(issuer).is_none() {
            return TxCode::NoIssuer;
        }
        match view.trust_line(&keys::trust_line(&tx.account, issuer, &currency.0)) {
            Some(line) if line.frozen => return TxCode::Frozen,
            Some(_) => {}
            None if !c.is_sell() && tx.account != *issuer => return TxCode::NoLine,
            None => {}
        }
    }

    if !c.is_sell() && holdings(view, &tx.account, &c.amount.asset) < c.amount.value {
        return TxCode::UnfundedOffer;
    }

    TxCode::Success
}

pub(crate) fn apply(ctx: &mut ApplyCtx, c: &CreateOffer) -> Result<(), TxCode> {
    let account = ctx.account;

    // One more owned object: the reserve must already cover it.
    let count = ctx
        .view
        .account(&account)
        .map(|root| root.owner_count)
        .ok_or(TxCode::Internal)?;
    if ctx.prior_balance < ctx.view.fees().reserve(count + 1) {
        return Err(TxCode::InsufficientReserve);
    }

    offers::create_offer(
        ctx.view,
        NftOffer {
            owner: account,
            token_id: c.token_id,
            amount: c.amount,
            flags: c.flags,
            destination: c.destination,
            expiration: c.expiration,
        },
        ctx.sequence,
    )?;

    Ok(())
}
