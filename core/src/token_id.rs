//! The 256-bit NFT identifier and its packed layout.
//!
//! An identifier is a big-endian concatenation of five fields:
//!
//! | offset (bytes) | width | field |
//! |---|---|---|
//! | 0  | 2  | flags (low 16 bits of the mint transaction flags) |
//! | 2  | 2  | transfer fee, in basis-point tenths (0..=50_000) |
//! | 4  | 20 | issuer account identifier |
//! | 24 | 4  | ciphered taxon |
//! | 28 | 4  | mint sequence (per-issuer counter, starting at 0) |
//!
//! The taxon stored in the identifier is *ciphered*: an issuer may mint many
//! tokens with the same taxon, and if the raw taxon fed directly into the
//! identifier, those tokens would share a page prefix and pile onto a single
//! directory page. Mixing the taxon with a linear congruential function of
//! the mint sequence scatters same-taxon tokens across the page space while
//! keeping the raw taxon recoverable (XOR is its own inverse).
//!
//! The low 96 bits (issuer tail, ciphered taxon, sequence) form the token's
//! *page prefix*, which determines the directory page the token sorts into.
//! See [`crate::keys`] for how page keys are built from prefixes.

use crate::AccountId;

/// The maximum transfer fee, in basis-point tenths (50%).
pub const MAX_TRANSFER_FEE: u16 = 50_000;

/// The maximum length of a token URI, in bytes.
pub const MAX_URI_LEN: usize = 256;

/// The width of a token's page prefix, in bytes.
pub const PAGE_PREFIX_LEN: usize = 12;

/// A token's page prefix: the low 96 bits of its identifier.
///
/// Tokens with equal prefixes ("equivalent tokens") are always co-resident
/// on one directory page.
pub type PagePrefix = [u8; PAGE_PREFIX_LEN];

/// A packed 256-bit NFT identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// Pack the five identifier fields.
    ///
    /// The taxon passed here is the issuer's raw taxon; it is ciphered with
    /// the mint sequence before being stored.
    pub fn pack(flags: u16, fee: u16, issuer: AccountId, taxon: u32, seq: u32) -> Self {
        let mut buf = [0u8; 32];
        buf[0..2].copy_from_slice(&flags.to_be_bytes());
        buf[2..4].copy_from_slice(&fee.to_be_bytes());
        buf[4..24].copy_from_slice(issuer.as_bytes());
        buf[24..28].copy_from_slice(&cipher_taxon(seq, taxon).to_be_bytes());
        buf[28..32].copy_from_slice(&seq.to_be_bytes());
        TokenId(buf)
    }

    /// Construct an identifier from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        TokenId(bytes)
    }

    /// The raw bytes of the identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The token's flag bits.
    pub fn flags(&self) -> u16 {
        u16::from_be_bytes([self.0[0], self.0[1]])
    }

    /// Whether the given flag bit is set.
    pub fn has_flag(&self, flag: u16) -> bool {
        self.flags() & flag != 0
    }

    /// The transfer fee, in basis-point tenths.
    pub fn transfer_fee(&self) -> u16 {
        u16::from_be_bytes([self.0[2], self.0[3]])
    }

    /// The issuer account.
    pub fn issuer(&self) -> AccountId {
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&self.0[4..24]);
        AccountId::from_bytes(bytes)
    }

    /// The ciphered taxon, exactly as stored.
    pub fn ciphered_taxon(&self) -> u32 {
        u32::from_be_bytes([self.0[24], self.0[25], self.0[26], self.0[27]])
    }

    /// The raw taxon, recovered by re-applying the cipher.
    pub fn raw_taxon(&self) -> u32 {
        cipher_taxon(self.sequence(), self.ciphered_taxon())
    }

    /// The per-issuer mint sequence.
    pub fn sequence(&self) -> u32 {
        u32::from_be_bytes([self.0[28], self.0[29], self.0[30], self.0[31]])
    }

    /// The token's page prefix: the low 96 bits of the identifier.
    pub fn page_prefix(&self) -> PagePrefix {
        let mut prefix = [0u8; PAGE_PREFIX_LEN];
        prefix.copy_from_slice(&self.0[20..32]);
        prefix
    }
}

impl std::fmt::Debug for TokenId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// Mix a taxon with the mint sequence.
///
/// The mixing function is a fixed linear congruential generator seeded by the
/// sequence: `taxon ^ (384160001 * seq + 2459)`, in wrapping 32-bit
/// arithmetic. By the Hull-Dobell theorem the LCG is a full-period
/// permutation of the 32-bit space, and because the mix is an XOR, applying
/// the same function to a ciphered taxon recovers the raw one. The constants
/// are part of the identifier format and must not change.
pub fn cipher_taxon(seq: u32, taxon: u32) -> u32 {
    taxon ^ seq.wrapping_mul(384_160_001).wrapping_add(2459)
}
