//! The in-memory ledger: committed state, views, and the apply loop.
//!
//! State is a single ordered map from [`Key`] to [`Entry`]. The map is an
//! [`imbl::OrdMap`], so cloning it for a transaction's private view is O(1)
//! and discarding a failed transaction is dropping the clone. A transaction
//! that succeeds swaps its view's map back into the shared state; one that
//! fails with a claimed code keeps only the fee-and-sequence view.

use std::sync::Arc;

use anyhow::{bail, Result};
use imbl::OrdMap;
use parking_lot::RwLock;

use nftbook_core::{keys, AccountId, Asset, CodeKind, Key, TokenId, TxCode};

use crate::offers::{DirNode, NftOffer};
use crate::pages::{NftPage, TokenEntry};
use crate::tx::{ApplyCtx, Transaction};

mod account;
mod funds;
mod view;

pub use account::{adjust_owner_count, AccountRoot};
pub use funds::{holdings, send, TrustLine};
pub use view::{ApplyView, ReadView, View};

/// A ledger object.
#[derive(Clone, Debug)]
pub enum Entry {
    /// An account root.
    Account(AccountRoot),
    /// An NFT directory page.
    Page(NftPage),
    /// An NFT offer.
    Offer(NftOffer),
    /// A directory node (owner directory or per-token offer directory).
    Directory(DirNode),
    /// A trust line between an account and an asset issuer.
    TrustLine(TrustLine),
}

/// The ledger's fee and reserve schedule.
#[derive(Clone, Copy, Debug)]
pub struct FeeSchedule {
    /// The minimum fee a transaction must declare.
    pub base_fee: u64,
    /// The reserve an account must hold with zero owned objects.
    pub reserve_base: u64,
    /// The additional reserve per owned object.
    pub reserve_increment: u64,
}

impl FeeSchedule {
    /// The reserve required for an account owning `count` objects.
    pub fn reserve(&self, count: u32) -> u64 {
        self.reserve_base + self.reserve_increment * count as u64
    }
}

/// The feature-rule snapshot transactions are validated against.
#[derive(Clone, Copy, Debug)]
pub struct Rules {
    /// Whether the NFT transaction set is enabled.
    pub nft_enabled: bool,
}

impl Default for Rules {
    fn default() -> Self {
        Rules { nft_enabled: true }
    }
}

pub(crate) struct LedgerState {
    pub(crate) entries: OrdMap<Key, Entry>,
    pub(crate) parent_close_time: u32,
    pub(crate) fees: FeeSchedule,
    pub(crate) rules: Rules,
}

/// A handle to the shared ledger state.
///
/// Cloning the handle is cheap; all clones observe the same state. Apply is
/// serialized by the inner lock, matching the one-worker-per-round model.
#[derive(Clone)]
pub struct Ledger {
    shared: Arc<RwLock<LedgerState>>,
}

impl Ledger {
    /// Create an empty ledger with the given schedule and rules.
    pub fn new(fees: FeeSchedule, rules: Rules) -> Self {
        Ledger {
            shared: Arc::new(RwLock::new(LedgerState {
                entries: OrdMap::new(),
                parent_close_time: 0,
                fees,
                rules,
            })),
        }
    }

    /// Create a funded account. Fails if the account already exists.
    pub fn create_account(&self, id: AccountId, balance: u64) -> Result<()> {
        let mut state = self.shared.write();
        let key = keys::account(&id);
        if state.entries.contains_key(&key) {
            bail!("account {:?} already exists", id);
        }
        state.entries.insert(key, Entry::Account(AccountRoot::new(balance)));
        Ok(())
    }

    /// Credit native funds to an existing account, outside any transaction.
    /// A genesis/bootstrap helper; in-ledger funds only move through
    /// settlement.
    pub fn credit_account(&self, id: &AccountId, amount: u64) -> Result<()> {
        let mut state = self.shared.write();
        match state.entries.get_mut(&keys::account(id)) {
            Some(Entry::Account(root)) => {
                root.balance = root.balance.saturating_add(amount);
                Ok(())
            }
            _ => bail!("account {:?} does not exist", id),
        }
    }

    /// Force an account's mint counter, e.g. when restoring state from a
    /// snapshot.
    pub fn set_minted_tokens(&self, id: &AccountId, minted: u32) -> Result<()> {
        let mut state = self.shared.write();
        match state.entries.get_mut(&keys::account(id)) {
            Some(Entry::Account(root)) => {
                root.minted_tokens = minted;
                Ok(())
            }
            _ => bail!("account {:?} does not exist", id),
        }
    }

    /// Set or clear an account's authorized minter.
    pub fn set_minter(&self, id: &AccountId, minter: Option<AccountId>) -> Result<()> {
        let mut state = self.shared.write();
        match state.entries.get_mut(&keys::account(id)) {
            Some(Entry::Account(root)) => {
                root.minter = minter;
                Ok(())
            }
            _ => bail!("account {:?} does not exist", id),
        }
    }

    /// Establish (or overwrite) a trust line with a starting balance.
    /// A genesis helper for tests and bootstrapping; real balances move
    /// through settlement.
    pub fn create_trust_line(
        &self,
        holder: AccountId,
        currency: [u8; 3],
        issuer: AccountId,
        balance: u64,
    ) -> Result<()> {
        let mut state = self.shared.write();
        if !state.entries.contains_key(&keys::account(&holder)) {
            bail!("trust line holder {:?} does not exist", holder);
        }
        let key = keys::trust_line(&holder, &issuer, &currency);
        state
            .entries
            .insert(key, Entry::TrustLine(TrustLine { balance, frozen: false }));
        Ok(())
    }

    /// Freeze or unfreeze an existing trust line.
    pub fn set_trust_line_frozen(
        &self,
        holder: AccountId,
        currency: [u8; 3],
        issuer: AccountId,
        frozen: bool,
    ) -> Result<()> {
        let mut state = self.shared.write();
        let key = keys::trust_line(&holder, &issuer, &currency);
        match state.entries.get_mut(&key) {
            Some(Entry::TrustLine(line)) => {
                line.frozen = frozen;
                Ok(())
            }
            _ => bail!("no such trust line"),
        }
    }

    /// The parent close time transactions observe as "now".
    pub fn close_time(&self) -> u32 {
        self.shared.read().parent_close_time
    }

    /// Advance the parent close time.
    pub fn set_close_time(&self, t: u32) {
        self.shared.write().parent_close_time = t;
    }

    /// Apply one transaction, committing iff it does not fail outright.
    ///
    /// Malformed and retryable results leave the ledger untouched. Claimed
    /// failures commit only the fee and sequence bump. Success commits the
    /// transaction's full write set atomically.
    pub fn apply(&self, tx: &Transaction) -> TxCode {
        let mut state = self.shared.write();
        process(&mut state, tx)
    }

    /// Apply a round of transactions serially, re-queueing retryable
    /// failures until the round makes no further progress.
    ///
    /// Within the round every transaction sees the writes of the ones
    /// applied before it. Returns each transaction's final code, in input
    /// order.
    pub fn apply_round(&self, txs: &[Transaction]) -> Vec<TxCode> {
        let mut state = self.shared.write();
        let mut codes: Vec<TxCode> = txs.iter().map(|tx| process(&mut state, tx)).collect();

        // Retry pass: a transaction that failed transiently may succeed now
        // that later transactions have applied. Loop until a full pass
        // changes nothing.
        loop {
            let mut progressed = false;
            for (i, tx) in txs.iter().enumerate() {
                if codes[i].kind() != CodeKind::Retry {
                    continue;
                }
                let code = process(&mut state, tx);
                if code.kind() != CodeKind::Retry {
                    codes[i] = code;
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
        codes
    }

    // -- read-only queries ---------------------------------------------------

    /// A snapshot copy of an account root.
    pub fn account_root(&self, id: &AccountId) -> Option<AccountRoot> {
        let state = self.shared.read();
        ReadView::new(&state).account(id).cloned()
    }

    /// An account's native balance, zero if the account does not exist.
    pub fn balance(&self, id: &AccountId) -> u64 {
        self.account_root(id).map_or(0, |a| a.balance)
    }

    /// An account's owner count, zero if the account does not exist.
    pub fn owner_count(&self, id: &AccountId) -> u32 {
        self.account_root(id).map_or(0, |a| a.owner_count)
    }

    /// An account's spendable holdings of an asset.
    pub fn holdings(&self, id: &AccountId, asset: &Asset) -> u64 {
        let state = self.shared.read();
        holdings(&ReadView::new(&state), id, asset)
    }

    /// Whether `owner` currently holds `token`.
    pub fn holds_token(&self, owner: &AccountId, token: &TokenId) -> bool {
        let state = self.shared.read();
        crate::pages::find_token(&ReadView::new(&state), owner, token).is_some()
    }

    /// The owner's directory pages in chain order.
    pub fn pages_of(&self, owner: &AccountId) -> Vec<NftPage> {
        let state = self.shared.read();
        crate::pages::walk_chain(&ReadView::new(&state), owner)
            .into_iter()
            .map(|(_, page)| page)
            .collect()
    }

    /// All tokens in the owner's directory, in storage order.
    pub fn tokens_of(&self, owner: &AccountId) -> Vec<TokenEntry> {
        self.pages_of(owner)
            .into_iter()
            .flat_map(|p| p.tokens)
            .collect()
    }

    /// A snapshot copy of an offer.
    pub fn offer(&self, key: &Key) -> Option<NftOffer> {
        let state = self.shared.read();
        ReadView::new(&state).offer(key).cloned()
    }

    /// The identifier the next mint by `issuer` will produce.
    pub fn next_token_id(&self, issuer: &AccountId, taxon: u32, flags: u16, fee: u16) -> TokenId {
        let seq = self.account_root(issuer).map_or(0, |a| a.minted_tokens);
        TokenId::pack(flags, fee, *issuer, taxon, seq)
    }

    /// The key the next offer created by `owner` will be stored under.
    pub fn next_offer_key(&self, owner: &AccountId) -> Key {
        let seq = self.account_root(owner).map_or(0, |a| a.sequence);
        keys::offer(owner, seq)
    }

    /// Run a closure against a read view of the current state.
    pub fn with_view<R>(&self, f: impl FnOnce(&ReadView) -> R) -> R {
        let state = self.shared.read();
        f(&ReadView::new(&state))
    }

    /// Delete an account, subject to its obligations. See [`crate::deletion`].
    pub fn delete_account(&self, id: &AccountId) -> TxCode {
        let mut state = self.shared.write();
        let mut view = ApplyView::new(&state);
        let code = crate::deletion::delete_account(&mut view, id);
        if code.is_success() {
            view.commit(&mut state);
        }
        code
    }
}

/// The full pipeline for one transaction against mutable state.
fn process(state: &mut LedgerState, tx: &Transaction) -> TxCode {
    let code = tx.preflight(&state.rules);
    if !code.is_success() {
        return code;
    }

    if tx.fee < state.fees.base_fee {
        return TxCode::BadFee;
    }

    let (sequence, prior_balance) = {
        let view = ReadView::new(state);
        match view.account(&tx.account) {
            Some(root) => (root.sequence, root.balance),
            None => return TxCode::ObjectNotFound,
        }
    };

    let code = tx.preclaim(&ReadView::new(state));
    match code.kind() {
        CodeKind::Success => {}
        CodeKind::Claimed => {
            // The failure is claimable: charge the fee, keep nothing else.
            let mut view = ApplyView::new(state);
            charge(&mut view, &tx.account, tx.fee);
            view.commit(state);
            return code;
        }
        _ => return code,
    }

    // The fee view holds just the fee and sequence bump; the apply view is
    // layered on top of it so a claimed failure can fall back to fees-only.
    let mut fee_view = ApplyView::new(state);
    charge(&mut fee_view, &tx.account, tx.fee);

    let mut view = fee_view.clone();
    let code = {
        let mut ctx = ApplyCtx {
            view: &mut view,
            account: tx.account,
            sequence,
            prior_balance,
        };
        tx.apply(&mut ctx)
    };
    match code.kind() {
        CodeKind::Success => view.commit(state),
        CodeKind::Claimed => fee_view.commit(state),
        _ => {}
    }
    code
}

/// Deduct the declared fee (clamped to the balance) and bump the sequence.
fn charge(view: &mut ApplyView, account: &AccountId, fee: u64) {
    if let Some(root) = view.account_mut(account) {
        root.balance = root.balance.saturating_sub(fee);
        root.sequence += 1;
    }
}
