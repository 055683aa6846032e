//! Minting: create a token in the submitter's directory.
//!
//! The recorded issuer is the submitter unless the transaction names
//! another account, in which case that account must have authorized the
//! submitter as its minter. The reserve is enforced only when the mint
//! grows the submitter's owner count, i.e. when a new page was created;
//! mints that land in an existing page cost only the fee.

use nftbook_core::{flags, AccountId, TokenId, TxCode, MAX_TRANSFER_FEE, MAX_URI_LEN};

use crate::ledger::{ReadView, Rules, View};
use crate::pages::{self, TokenEntry};

use super::{ApplyCtx, Transaction};

/// The mint payload.
#[derive(Clone, Debug)]
pub struct Mint {
    /// The issuer-chosen 32-bit grouping label.
    pub taxon: u32,
    /// Transaction flags; the low 16 bits become the token's flags.
    pub flags: u32,
    /// Transfer fee in basis-point tenths, 0..=50_000.
    pub transfer_fee: u16,
    /// Mint on behalf of this issuer. Requires minter authorization.
    pub issuer: Option<AccountId>,
    /// An opaque URI blob, 1..=256 bytes if present.
    pub uri: Option<Vec<u8>>,
}

pub(crate) fn preflight(tx: &Transaction, m: &Mint, rules: &Rules) -> TxCode {
    if !rules.nft_enabled {
        return TxCode::Disabled;
    }
    if m.flags & !(flags::MINT_FLAGS as u32) != 0 {
        return TxCode::InvalidFlag;
    }
    if m.transfer_fee > MAX_TRANSFER_FEE {
        return TxCode::BadTransferFee;
    }
    // An issuer field names someone else; minting for yourself leaves it
    // empty.
    if m.issuer == Some(tx.account) {
        return TxCode::Malformed;
    }
    if let Some(uri) = &m.uri {
        if uri.is_empty() || uri.len() > MAX_URI_LEN {
            return TxCode::Malformed;
        }
    }
    TxCode::Success
}

pub(crate) fn preclaim(tx: &Transaction, m: &Mint, view: &ReadView) -> TxCode {
    if let Some(issuer) = &m.issuer {
        let Some(root) = view.account(issuer) else {
            return TxCode::NoIssuer;
        };
        if root.minter != Some(tx.account) {
            return TxCode::NoPermission;
        }
    }
    TxCode::Success
}

pub(crate) fn apply(ctx: &mut ApplyCtx, m: &Mint) -> Result<(), TxCode> {
    let account = ctx.account;
    let issuer = m.issuer.unwrap_or(account);

    // Consume the issuer's mint sequence.
    let seq = {
        let Some(root) = ctx.view.account_mut(&issuer) else {
            // Checked in preclaim; the issuer cannot vanish mid-transaction.
            return Err(TxCode::NoIssuer);
        };
        let seq = root.minted_tokens;
        let Some(next) = seq.checked_add(1) else {
            return Err(TxCode::MaxSequenceReached);
        };
        root.minted_tokens = next;
        seq
    };

    let count_before = owner_count(ctx.view, &account)?;

    let id = TokenId::pack(
        (m.flags & 0xffff) as u16,
        m.transfer_fee,
        issuer,
        m.taxon,
        seq,
    );
    pages::insert_token(
        ctx.view,
        &account,
        TokenEntry {
            id,
            uri: m.uri.clone(),
        },
    )?;

    // Only check the reserve if the owner count actually grew; tokens added
    // to an existing page cost just the fee.
    let count_after = owner_count(ctx.view, &account)?;
    if count_after > count_before {
        let required = ctx.view.fees().reserve(count_after);
        if ctx.prior_balance < required {
            return Err(TxCode::InsufficientReserve);
        }
    }

    Ok(())
}

fn owner_count(view: &impl View, account: &AccountId) -> Result<u32, TxCode> {
    view.account(account)
        .map(|root| root.owner_count)
        .ok_or(TxCode::Internal)
}
