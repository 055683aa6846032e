//! The ledger key space.
//!
//! Every ledger object is addressed by a 256-bit key, compared as a
//! big-endian integer. NFT directory pages use *structural* keys so that an
//! owner's pages form a contiguous, ordered span of the key space:
//!
//! ```text
//! page key = owner (160 bits) ‖ bound (96 bits)
//! ```
//!
//! where `bound` is an upper bound (inclusive) on the page prefixes of the
//! tokens the page holds. The last page in an owner's chain always has the
//! all-ones bound, so an ordered-successor query over
//! `[owner ‖ prefix, owner ‖ f..f]` lands on the unique page a token can
//! live in.
//!
//! All other objects use hashed keys: blake3 over a one-byte domain tag and
//! the identifying material, so key derivations cannot collide across object
//! types.

use crate::token_id::{PagePrefix, PAGE_PREFIX_LEN};
use crate::{AccountId, TokenId};

/// A ledger object key.
pub type Key = [u8; 32];

const ACCOUNT_TAG: u8 = 0x61;
const OFFER_TAG: u8 = 0x71;
const OWNER_DIR_TAG: u8 = 0x4f;
const BUY_DIR_TAG: u8 = 0x42;
const SELL_DIR_TAG: u8 = 0x53;
const TRUST_LINE_TAG: u8 = 0x72;

fn hashed(tag: u8, parts: &[&[u8]]) -> Key {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[tag]);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// The key of an account root object.
pub fn account(id: &AccountId) -> Key {
    hashed(ACCOUNT_TAG, &[id.as_bytes()])
}

/// The key of an NFT offer, derived from the creating account and its
/// sequence number at creation time.
pub fn offer(owner: &AccountId, sequence: u32) -> Key {
    hashed(OFFER_TAG, &[owner.as_bytes(), &sequence.to_be_bytes()])
}

/// The key of an account's owner directory.
pub fn owner_dir(owner: &AccountId) -> Key {
    hashed(OWNER_DIR_TAG, &[owner.as_bytes()])
}

/// The key of a token's buy-offer directory.
pub fn buy_dir(token: &TokenId) -> Key {
    hashed(BUY_DIR_TAG, &[token.as_bytes()])
}

/// The key of a token's sell-offer directory.
pub fn sell_dir(token: &TokenId) -> Key {
    hashed(SELL_DIR_TAG, &[token.as_bytes()])
}

/// The key of the trust line between `holder` and `issuer` for `currency`.
pub fn trust_line(holder: &AccountId, issuer: &AccountId, currency: &[u8; 3]) -> Key {
    hashed(
        TRUST_LINE_TAG,
        &[holder.as_bytes(), issuer.as_bytes(), currency],
    )
}

/// The page key for `owner` with the given prefix bound.
pub fn page(owner: &AccountId, bound: PagePrefix) -> Key {
    let mut key = [0u8; 32];
    key[0..20].copy_from_slice(owner.as_bytes());
    key[20..32].copy_from_slice(&bound);
    key
}

/// The lowest possible page key for `owner`.
pub fn page_min(owner: &AccountId) -> Key {
    page(owner, [0u8; PAGE_PREFIX_LEN])
}

/// The highest possible page key for `owner`: the key of the last page in
/// the owner's chain.
pub fn page_max(owner: &AccountId) -> Key {
    page(owner, [0xffu8; PAGE_PREFIX_LEN])
}

/// The least page key that can hold `token` for `owner`.
pub fn page_for(owner: &AccountId, token: &TokenId) -> Key {
    page(owner, token.page_prefix())
}

/// The prefix bound encoded in a page key.
pub fn page_bound(key: &Key) -> PagePrefix {
    let mut bound = [0u8; PAGE_PREFIX_LEN];
    bound.copy_from_slice(&key[20..32]);
    bound
}
