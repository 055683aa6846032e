//! Funds movement: native balances and trust lines.
//!
//! This is the payment primitive settlement delegates to. Values are
//! unsigned, so a "negative payment" cannot be expressed; the checks here
//! are about coverage and line state, not sign.

use log::debug;

use nftbook_core::{keys, AccountId, Amount, Asset, TxCode};

use super::{ApplyView, Entry, View};

/// A trust line between a holder and an asset issuer.
#[derive(Clone, Debug)]
pub struct TrustLine {
    /// The holder's balance of the issuer's asset.
    pub balance: u64,
    /// Whether the line is frozen. Frozen lines refuse all movement.
    pub frozen: bool,
}

/// The spendable holdings of `account` in `asset`.
///
/// For the native asset this is the balance above the account's reserve;
/// for an issued asset it is the trust-line balance, zero if the line is
/// missing or frozen. The issuer of an asset can always pay in it.
pub fn holdings(view: &impl View, account: &AccountId, asset: &Asset) -> u64 {
    match asset {
        Asset::Native => {
            let Some(root) = view.account(account) else {
                return 0;
            };
            root.balance
                .saturating_sub(view.fees().reserve(root.owner_count))
        }
        Asset::Issued { currency, issuer } => {
            if account == issuer {
                return u64::MAX;
            }
            match view.trust_line(&keys::trust_line(account, issuer, &currency.0)) {
                Some(line) if !line.frozen => line.balance,
                _ => 0,
            }
        }
    }
}

/// Move `amount` from `from` to `to`.
///
/// Native movement adjusts balances directly. Issued movement debits the
/// sender's trust line and credits the recipient's; paying the asset issuer
/// retires the balance, and the issuer paying issues fresh balance. A
/// missing recipient line is created iff `auto_create_line` (the
/// trust-line-creating token flag, applied by settlement to the issuer-cut
/// leg only); otherwise the movement refuses with `NoLine`.
pub fn send(
    view: &mut ApplyView,
    from: &AccountId,
    to: &AccountId,
    amount: &Amount,
    auto_create_line: bool,
) -> Result<(), TxCode> {
    if amount.is_zero() || from == to {
        return Ok(());
    }

    match &amount.asset {
        Asset::Native => {
            {
                let Some(sender) = view.account_mut(from) else {
                    return Err(TxCode::Internal);
                };
                if sender.balance < amount.value {
                    debug!("native payment of {} refused: sender short", amount.value);
                    return Err(TxCode::InsufficientFunds);
                }
                sender.balance -= amount.value;
            }
            let Some(recipient) = view.account_mut(to) else {
                return Err(TxCode::NoDst);
            };
            recipient.balance = recipient.balance.saturating_add(amount.value);
            Ok(())
        }
        Asset::Issued { currency, issuer } => {
            if from != issuer {
                let key = keys::trust_line(from, issuer, &currency.0);
                let Some(line) = view.trust_line_mut(&key) else {
                    return Err(TxCode::NoLine);
                };
                if line.frozen {
                    return Err(TxCode::Frozen);
                }
                if line.balance < amount.value {
                    debug!("issued payment of {} refused: line short", amount.value);
                    return Err(TxCode::InsufficientFunds);
                }
                line.balance -= amount.value;
            }
            if to != issuer {
                let key = keys::trust_line(to, issuer, &currency.0);
                let status = view.trust_line(&key).map(|line| line.frozen);
                match status {
                    Some(true) => return Err(TxCode::Frozen),
                    Some(false) => {
                        let line = view.trust_line_mut(&key).expect("probed above");
                        line.balance = line.balance.saturating_add(amount.value);
                    }
                    None if auto_create_line => {
                        view.insert(
                            key,
                            Entry::TrustLine(TrustLine {
                                balance: amount.value,
                                frozen: false,
                            }),
                        );
                    }
                    None => return Err(TxCode::NoLine),
                }
            }
            Ok(())
        }
    }
}
