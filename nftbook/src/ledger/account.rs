//! Account roots and owner-count bookkeeping.

use log::error;

use nftbook_core::{AccountId, TxCode};

use super::ApplyView;

/// An account root object.
#[derive(Clone, Debug)]
pub struct AccountRoot {
    /// Native balance, in drops.
    pub balance: u64,
    /// Transaction sequence, bumped once per applied transaction.
    pub sequence: u32,
    /// The number of reserve-counted objects the account owns
    /// (NFT pages and offers).
    pub owner_count: u32,
    /// Lifetime count of tokens minted with this account as issuer.
    pub minted_tokens: u32,
    /// Lifetime count of those tokens that have been burned.
    pub burned_tokens: u32,
    /// The account authorized to mint on this account's behalf.
    pub minter: Option<AccountId>,
}

impl AccountRoot {
    pub(crate) fn new(balance: u64) -> Self {
        AccountRoot {
            balance,
            sequence: 0,
            owner_count: 0,
            minted_tokens: 0,
            burned_tokens: 0,
            minter: None,
        }
    }
}

/// Adjust an account's owner count by `delta` objects.
///
/// Called exactly once per page or offer created or destroyed. A missing
/// account or an underflow means the caller's bookkeeping is broken.
pub fn adjust_owner_count(view: &mut ApplyView, owner: &AccountId, delta: i32) -> Result<(), TxCode> {
    let Some(root) = view.account_mut(owner) else {
        error!("owner count adjustment for missing account {:?}", owner);
        return Err(TxCode::Internal);
    };
    let adjusted = root.owner_count as i64 + delta as i64;
    if adjusted < 0 {
        error!(
            "owner count of {:?} would underflow ({} {:+})",
            owner, root.owner_count, delta
        );
        return Err(TxCode::Internal);
    }
    root.owner_count = adjusted as u32;
    Ok(())
}
