//! Read and apply views over the ledger state.
//!
//! A [`ReadView`] borrows the committed state. An [`ApplyView`] owns a
//! cloned copy of the entry map with copy-on-write structural sharing;
//! mutations touch only the clone until [`ApplyView::commit`] swaps it back.

use imbl::OrdMap;

use nftbook_core::{keys, AccountId, Key};

use super::{AccountRoot, Entry, FeeSchedule, LedgerState, Rules, TrustLine};
use crate::offers::{DirNode, NftOffer};
use crate::pages::NftPage;

/// Read-only access to ledger state, shared by both view kinds.
pub trait View {
    /// The entry stored under `key`, if any.
    fn entry(&self, key: &Key) -> Option<&Entry>;

    /// The least key in `[lo, hi]` with an entry present.
    fn succ(&self, lo: Key, hi: Key) -> Option<Key>;

    /// The greatest key in `[lo, hi]` with an entry present.
    fn pred(&self, lo: Key, hi: Key) -> Option<Key>;

    /// The parent ledger's close time, observed as "now".
    fn close_time(&self) -> u32;

    /// The fee and reserve schedule.
    fn fees(&self) -> &FeeSchedule;

    /// The feature-rule snapshot.
    fn rules(&self) -> &Rules;

    /// The account root for `id`.
    fn account(&self, id: &AccountId) -> Option<&AccountRoot> {
        match self.entry(&keys::account(id)) {
            Some(Entry::Account(root)) => Some(root),
            _ => None,
        }
    }

    /// The NFT page stored under `key`.
    fn page(&self, key: &Key) -> Option<&NftPage> {
        match self.entry(key) {
            Some(Entry::Page(page)) => Some(page),
            _ => None,
        }
    }

    /// The offer stored under `key`.
    fn offer(&self, key: &Key) -> Option<&NftOffer> {
        match self.entry(key) {
            Some(Entry::Offer(offer)) => Some(offer),
            _ => None,
        }
    }

    /// The directory node stored under `key`.
    fn directory(&self, key: &Key) -> Option<&DirNode> {
        match self.entry(key) {
            Some(Entry::Directory(dir)) => Some(dir),
            _ => None,
        }
    }

    /// The trust line stored under `key`.
    fn trust_line(&self, key: &Key) -> Option<&TrustLine> {
        match self.entry(key) {
            Some(Entry::TrustLine(line)) => Some(line),
            _ => None,
        }
    }
}

/// A read-only view of committed state.
pub struct ReadView<'a> {
    state: &'a LedgerState,
}

impl<'a> ReadView<'a> {
    pub(crate) fn new(state: &'a LedgerState) -> Self {
        ReadView { state }
    }
}

impl View for ReadView<'_> {
    fn entry(&self, key: &Key) -> Option<&Entry> {
        self.state.entries.get(key)
    }

    fn succ(&self, lo: Key, hi: Key) -> Option<Key> {
        self.state.entries.range(lo..=hi).next().map(|(k, _)| *k)
    }

    fn pred(&self, lo: Key, hi: Key) -> Option<Key> {
        self.state
            .entries
            .range(lo..=hi)
            .next_back()
            .map(|(k, _)| *k)
    }

    fn close_time(&self) -> u32 {
        self.state.parent_close_time
    }

    fn fees(&self) -> &FeeSchedule {
        &self.state.fees
    }

    fn rules(&self) -> &Rules {
        &self.state.rules
    }
}

/// A private mutable view for one transaction's apply phase.
///
/// Dropping the view discards every write.
#[derive(Clone)]
pub struct ApplyView {
    entries: OrdMap<Key, Entry>,
    parent_close_time: u32,
    fees: FeeSchedule,
    rules: Rules,
}

impl ApplyView {
    pub(crate) fn new(state: &LedgerState) -> Self {
        ApplyView {
            entries: state.entries.clone(),
            parent_close_time: state.parent_close_time,
            fees: state.fees,
            rules: state.rules,
        }
    }

    /// Swap this view's writes into the shared state.
    pub(crate) fn commit(self, state: &mut LedgerState) {
        state.entries = self.entries;
    }

    /// Insert a new entry.
    pub fn insert(&mut self, key: Key, entry: Entry) {
        self.entries.insert(key, entry);
    }

    /// Remove the entry under `key`.
    pub fn erase(&mut self, key: &Key) {
        self.entries.remove(key);
    }

    /// Mutable access to the entry under `key`.
    pub fn entry_mut(&mut self, key: &Key) -> Option<&mut Entry> {
        self.entries.get_mut(key)
    }

    /// Mutable access to an account root.
    pub fn account_mut(&mut self, id: &AccountId) -> Option<&mut AccountRoot> {
        match self.entries.get_mut(&keys::account(id)) {
            Some(Entry::Account(root)) => Some(root),
            _ => None,
        }
    }

    /// Mutable access to an NFT page.
    pub fn page_mut(&mut self, key: &Key) -> Option<&mut NftPage> {
        match self.entries.get_mut(key) {
            Some(Entry::Page(page)) => Some(page),
            _ => None,
        }
    }

    /// Mutable access to a directory node.
    pub fn directory_mut(&mut self, key: &Key) -> Option<&mut DirNode> {
        match self.entries.get_mut(key) {
            Some(Entry::Directory(dir)) => Some(dir),
            _ => None,
        }
    }

    /// Mutable access to a trust line.
    pub fn trust_line_mut(&mut self, key: &Key) -> Option<&mut TrustLine> {
        match self.entries.get_mut(key) {
            Some(Entry::TrustLine(line)) => Some(line),
            _ => None,
        }
    }
}

impl View for ApplyView {
    fn entry(&self, key: &Key) -> Option<&Entry> {
        self.entries.get(key)
    }

    fn succ(&self, lo: Key, hi: Key) -> Option<Key> {
        self.entries.range(lo..=hi).next().map(|(k, _)| *k)
    }

    fn pred(&self, lo: Key, hi: Key) -> Option<Key> {
        self.entries.range(lo..=hi).next_back().map(|(k, _)| *k)
    }

    fn close_time(&self) -> u32 {
        self.parent_close_time
    }

    fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    fn rules(&self) -> &Rules {
        &self.rules
    }
}
