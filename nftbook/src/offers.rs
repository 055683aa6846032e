//! NFT offers and the directories that index them.
//!
//! An offer is indexed in three places: the owner's directory (which also
//! feeds account-deletion cleanup), and the token's buy or sell directory
//! depending on the offer's side. Directory nodes are created lazily on
//! first insertion and erased when their last entry leaves. Creating or
//! destroying an offer moves the owner's object count by one; directory
//! nodes themselves are not reserve-counted.

use log::error;

use nftbook_core::{flags, keys, AccountId, Amount, Key, TokenId, TxCode};

use crate::ledger::{adjust_owner_count, ApplyView, Entry, View};

/// An NFT offer object.
#[derive(Clone, Debug)]
pub struct NftOffer {
    /// The account that placed the offer.
    pub owner: AccountId,
    /// The token the offer is for.
    pub token_id: TokenId,
    /// The offered (buy) or requested (sell) amount. May be zero only for
    /// sell offers.
    pub amount: Amount,
    /// Offer flags; [`flags::SELL_OFFER`] distinguishes the side.
    pub flags: u32,
    /// Sell-only: the only account allowed to accept.
    pub destination: Option<AccountId>,
    /// Expiration, in ledger close-time units.
    pub expiration: Option<u32>,
}

impl NftOffer {
    /// Whether this is a sell offer.
    pub fn is_sell(&self) -> bool {
        self.flags & flags::SELL_OFFER != 0
    }

    /// Whether the offer has expired as of `now`.
    pub fn expired_at(&self, now: u32) -> bool {
        self.expiration.map_or(false, |e| e <= now)
    }

    /// The key of the token directory this offer is indexed in.
    pub fn side_dir(&self) -> Key {
        if self.is_sell() {
            keys::sell_dir(&self.token_id)
        } else {
            keys::buy_dir(&self.token_id)
        }
    }
}

/// A directory node: an ordered list of object keys.
#[derive(Clone, Debug, Default)]
pub struct DirNode {
    /// The indexed keys, in insertion order.
    pub entries: Vec<Key>,
}

/// Create an offer and index it.
///
/// The offer key is derived from the owner and the creating transaction's
/// sequence number. Bumps the owner's object count.
pub fn create_offer(view: &mut ApplyView, offer: NftOffer, sequence: u32) -> Result<Key, TxCode> {
    let key = keys::offer(&offer.owner, sequence);
    dir_insert(view, keys::owner_dir(&offer.owner), key);
    dir_insert(view, offer.side_dir(), key);
    adjust_owner_count(view, &offer.owner, 1)?;
    view.insert(key, Entry::Offer(offer));
    Ok(key)
}

/// Delete an offer, unlinking it from all three indexes.
///
/// Callers must have verified the offer exists; a missing offer or index
/// entry here is a broken invariant.
pub fn delete_offer(view: &mut ApplyView, key: &Key) -> Result<(), TxCode> {
    let Some(offer) = view.offer(key).cloned() else {
        error!("deleting offer {} which is not in the ledger", hex(key));
        return Err(TxCode::Internal);
    };

    dir_remove(view, keys::owner_dir(&offer.owner), key)?;
    dir_remove(view, offer.side_dir(), key)?;
    adjust_owner_count(view, &offer.owner, -1)?;
    view.erase(key);
    Ok(())
}

/// Delete every offer in one of a token's side directories.
///
/// Used at burn time. Each offer is unlinked from its owner's directory and
/// its owner's object count decremented; the side directory itself is
/// erased wholesale at the end.
pub fn remove_side_offers(view: &mut ApplyView, dir_key: Key) -> Result<(), TxCode> {
    let Some(dir) = view.directory(&dir_key).cloned() else {
        return Ok(());
    };

    for key in &dir.entries {
        let Some(offer) = view.offer(key).cloned() else {
            error!("offer directory names missing offer {}", hex(key));
            return Err(TxCode::Internal);
        };
        dir_remove(view, keys::owner_dir(&offer.owner), key)?;
        adjust_owner_count(view, &offer.owner, -1)?;
        view.erase(key);
    }

    view.erase(&dir_key);
    Ok(())
}

/// The combined number of buy and sell offers on a token.
pub fn count_offers(view: &impl View, token: &TokenId) -> usize {
    let count = |key: Key| view.directory(&key).map_or(0, |d| d.entries.len());
    count(keys::buy_dir(token)) + count(keys::sell_dir(token))
}

fn dir_insert(view: &mut ApplyView, dir_key: Key, entry: Key) {
    if view.directory(&dir_key).is_some() {
        view.directory_mut(&dir_key)
            .expect("probed above")
            .entries
            .push(entry);
    } else {
        view.insert(
            dir_key,
            Entry::Directory(DirNode {
                entries: vec![entry],
            }),
        );
    }
}

fn dir_remove(view: &mut ApplyView, dir_key: Key, entry: &Key) -> Result<(), TxCode> {
    let Some(dir) = view.directory_mut(&dir_key) else {
        error!("directory {} missing during unlink", hex(&dir_key));
        return Err(TxCode::Internal);
    };
    let Some(pos) = dir.entries.iter().position(|k| k == entry) else {
        error!("entry {} not present in directory {}", hex(entry), hex(&dir_key));
        return Err(TxCode::Internal);
    };
    dir.entries.remove(pos);
    if dir.entries.is_empty() {
        view.erase(&dir_key);
    }
    Ok(())
}

fn hex(key: &Key) -> String {
    key.iter().map(|b| format!("{:02x}", b)).collect()
}
