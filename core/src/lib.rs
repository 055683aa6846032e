#![warn(missing_docs)]

//! Core protocol types for the nftbook NFT ledger engine.
//!
//! This crate is pure: it defines the 256-bit token identifier codec, the
//! ledger key space, asset amounts, and transaction result codes. It holds no
//! state and performs no I/O; everything here is deterministic and, with the
//! exception of checked arithmetic helpers, infallible.

use std::fmt;

pub mod amount;
pub mod keys;
pub mod result;
pub mod token_id;

pub use amount::{Amount, Asset, CurrencyCode};
pub use keys::Key;
pub use result::{CodeKind, TxCode};
pub use token_id::{TokenId, MAX_TRANSFER_FEE, MAX_URI_LEN};

/// A 160-bit account identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId([u8; 20]);

impl AccountId {
    /// Construct an account identifier from its raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        AccountId(bytes)
    }

    /// The raw bytes of the account identifier.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Token flag bits, stored in the top 16 bits of the identifier.
///
/// These are the low 16 bits of the mint transaction's flags and are immutable
/// for the life of the token.
pub mod flags {
    /// The issuer (or an authorized minter) may burn the token even while it
    /// is held by another account.
    pub const BURNABLE: u16 = 0x0001;
    /// Offers for the token may only be denominated in the native asset.
    pub const ONLY_XRP: u16 = 0x0002;
    /// Transfer-fee payments to the issuer automatically establish a trust
    /// line on the issuer if none exists.
    pub const CREATE_TRUST_LINES: u16 = 0x0004;
    /// The token may be traded between non-issuer accounts.
    pub const TRANSFERABLE: u16 = 0x0008;

    /// Bits that may legally be set in the low 16 bits of a mint transaction.
    pub const MINT_FLAGS: u16 = BURNABLE | ONLY_XRP | CREATE_TRUST_LINES | TRANSFERABLE;

    /// Offer flag: set on sell offers, clear on buy offers.
    pub const SELL_OFFER: u32 = 0x0000_0001;

    /// Bits that may legally be set on a create-offer transaction.
    pub const CREATE_OFFER_FLAGS: u32 = SELL_OFFER;
}
