//! Asset amounts.
//!
//! An [`Amount`] pairs an [`Asset`] with a non-negative value. The native
//! asset is counted in indivisible drops; issued assets are identified by a
//! three-byte currency code and the issuing account. Values are unsigned by
//! construction, so "negative amount" bugs are unrepresentable; subtraction
//! is checked.

use crate::AccountId;

/// A three-byte currency code, e.g. `b"XAU"`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CurrencyCode(pub [u8; 3]);

/// The denomination of an amount.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Asset {
    /// The ledger's native asset.
    Native,
    /// An issued asset, held via trust lines with its issuer.
    Issued {
        /// The currency code.
        currency: CurrencyCode,
        /// The issuing account.
        issuer: AccountId,
    },
}

/// A non-negative quantity of a single asset.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Amount {
    /// The asset this amount is denominated in.
    pub asset: Asset,
    /// The value, in drops for the native asset.
    pub value: u64,
}

impl Amount {
    /// An amount of the native asset.
    pub fn native(value: u64) -> Self {
        Amount {
            asset: Asset::Native,
            value,
        }
    }

    /// An amount of an issued asset.
    pub fn issued(currency: CurrencyCode, issuer: AccountId, value: u64) -> Self {
        Amount {
            asset: Asset::Issued { currency, issuer },
            value,
        }
    }

    /// Whether this amount is in the native asset.
    pub fn is_native(&self) -> bool {
        matches!(self.asset, Asset::Native)
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Whether `other` is denominated in the same asset.
    pub fn same_asset(&self, other: &Amount) -> bool {
        self.asset == other.asset
    }

    /// Subtract `other`, which must be in the same asset and no larger.
    pub fn checked_sub(&self, other: &Amount) -> Option<Amount> {
        if !self.same_asset(other) {
            return None;
        }
        Some(Amount {
            asset: self.asset,
            value: self.value.checked_sub(other.value)?,
        })
    }

    /// The issuer's cut of a sale at `fee` basis-point tenths, rounded down.
    ///
    /// `fee` is capped at 50_000 (50%) by mint preflight, so the widened
    /// multiplication cannot overflow.
    pub fn transfer_cut(&self, fee: u16) -> Amount {
        let cut = (self.value as u128 * fee as u128 / 100_000) as u64;
        Amount {
            asset: self.asset,
            value: cut,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xau() -> Asset {
        Asset::Issued {
            currency: CurrencyCode(*b"XAU"),
            issuer: AccountId::from_bytes([9; 20]),
        }
    }

    #[test]
    fn checked_sub_requires_matching_assets() {
        let a = Amount::native(10);
        let b = Amount {
            asset: xau(),
            value: 3,
        };
        assert_eq!(a.checked_sub(&b), None);
        assert_eq!(a.checked_sub(&Amount::native(4)), Some(Amount::native(6)));
        assert_eq!(a.checked_sub(&Amount::native(11)), None);
    }

    #[test]
    fn transfer_cut_rounds_down() {
        // 900 at 50% -> 450 exactly.
        assert_eq!(Amount::native(900).transfer_cut(50_000).value, 450);
        // 999 at 0.1% -> 0.999, floored to 0.
        assert_eq!(Amount::native(999).transfer_cut(100).value, 0);
        // 1 at the maximum fee -> 0.5, floored to 0.
        assert_eq!(Amount::native(1).transfer_cut(50_000).value, 0);
        // Full-range value at the maximum fee must not overflow.
        assert_eq!(
            Amount::native(u64::MAX).transfer_cut(50_000).value,
            u64::MAX / 2
        );
    }
}
