//! Burning: destroy a token and every offer on it.

use nftbook_core::{flags, keys, AccountId, TokenId, TxCode};

use crate::ledger::{ReadView, Rules};
use crate::offers;
use crate::pages;

use super::{is_authorized_minter, ApplyCtx, Transaction};

/// The most buy-plus-sell offers a token may carry and still be burned.
pub const MAX_OFFERS_AT_BURN: usize = 500;

/// The burn payload.
#[derive(Clone, Debug)]
pub struct Burn {
    /// The token to burn.
    pub token_id: TokenId,
    /// The token's current owner, when the submitter is burning as the
    /// issuer or its minter rather than as the holder.
    pub owner: Option<AccountId>,
}

pub(crate) fn preflight(_tx: &Transaction, _b: &Burn, rules: &Rules) -> TxCode {
    if !rules.nft_enabled {
        return TxCode::Disabled;
    }
    TxCode::Success
}

pub(crate) fn preclaim(tx: &Transaction, b: &Burn, view: &ReadView) -> TxCode {
    let owner = b.owner.unwrap_or(tx.account);

    if pages::find_token(view, &owner, &b.token_id).is_none() {
        return TxCode::NoEntry;
    }

    if tx.account != owner {
        // Someone other than the holder may burn only if the token was
        // minted burnable, and only the issuer or its authorized minter.
        if !b.token_id.has_flag(flags::BURNABLE) {
            return TxCode::NoPermission;
        }
        let issuer = b.token_id.issuer();
        if tx.account != issuer && !is_authorized_minter(view, &issuer, &tx.account) {
            return TxCode::NoPermission;
        }
    }

    if offers::count_offers(view, &b.token_id) > MAX_OFFERS_AT_BURN {
        return TxCode::TooBig;
    }

    TxCode::Success
}

pub(crate) fn apply(ctx: &mut ApplyCtx, b: &Burn) -> Result<(), TxCode> {
    let owner = b.owner.unwrap_or(ctx.account);

    offers::remove_side_offers(ctx.view, keys::buy_dir(&b.token_id))?;
    offers::remove_side_offers(ctx.view, keys::sell_dir(&b.token_id))?;

    pages::remove_token(ctx.view, &owner, &b.token_id)?;

    let issuer = b.token_id.issuer();
    let Some(root) = ctx.view.account_mut(&issuer) else {
        // An issuer with live tokens cannot be deleted, so it must exist.
        return Err(TxCode::Internal);
    };
    root.burned_tokens = root.burned_tokens.saturating_add(1);

    Ok(())
}
