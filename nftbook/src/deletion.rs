//! Account-deletion obligations.
//!
//! An account holding NFTs cannot be deleted: the tokens would become
//! unreachable. Neither can the issuer of tokens that still exist, since
//! the identifiers embed the issuer and burning must keep finding its
//! counters. Offers are mere intents and do not block deletion; they are
//! cleared as part of the cleanup.

use log::error;

use nftbook_core::{keys, AccountId, TxCode};

use crate::ledger::{ApplyView, Entry, View};
use crate::offers;
use crate::pages;

/// Whether `account` may be deleted.
pub fn can_delete(view: &impl View, account: &AccountId) -> bool {
    if pages::has_pages(view, account) {
        return false;
    }
    match view.account(account) {
        Some(root) => root.minted_tokens == root.burned_tokens,
        None => false,
    }
}

/// Delete `account` if its obligations allow, clearing its NFT offers.
///
/// Other cleanup (trust lines, balance disposition) belongs to the
/// surrounding ledger's deletion machinery; this hook covers the NFT
/// obligations and objects only.
pub fn delete_account(view: &mut ApplyView, account: &AccountId) -> TxCode {
    if view.account(account).is_none() {
        return TxCode::ObjectNotFound;
    }
    if !can_delete(view, account) {
        return TxCode::NoPermission;
    }

    // Clear remaining NFT offers through the owner directory. The list is
    // cloned first: deleting an offer edits the directory under us.
    let dir_key = keys::owner_dir(account);
    if let Some(dir) = view.directory(&dir_key).cloned() {
        for key in &dir.entries {
            match view.entry(key) {
                Some(Entry::Offer(_)) => {}
                Some(_) => {
                    error!("owner directory of a deletable account names a non-offer");
                    return TxCode::Internal;
                }
                None => {
                    error!("owner directory names a missing object");
                    return TxCode::Internal;
                }
            }
            if let Err(code) = offers::delete_offer(view, key) {
                return code;
            }
        }
    }

    view.erase(&keys::account(account));
    TxCode::Success
}
