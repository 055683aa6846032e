//! The per-owner NFT directory: a doubly-linked chain of token pages.
//!
//! Each owner's tokens live in pages of at most [`MAX_TOKENS_PER_PAGE`]
//! entries, sorted by page prefix, with pages chained in ascending key
//! order. Pages hold *keys* to their neighbors, never references; the chain
//! is walked through the view, which matches the on-ledger representation
//! and keeps the structure acyclic.
//!
//! Placement rule: token T belongs to the first page whose key is greater
//! than or equal to `page_for(owner, T)`. The last page in a chain carries
//! the all-ones bound, so the rule is total for any owner with at least one
//! page. Splits choose boundaries between prefix groups, which keeps
//! equivalent tokens (equal prefixes) co-resident — the one insertion that
//! can fail is into a full page holding a single prefix group
//! ([`TxCode::NoSuitablePage`]).
//!
//! A `prev`/`next` key that cannot be loaded is a broken chain: the
//! operation fails with [`TxCode::Internal`] and the transaction's writes
//! are discarded.

use log::{error, warn};

use nftbook_core::{keys, AccountId, Key, TokenId, TxCode};

use crate::ledger::{adjust_owner_count, ApplyView, Entry, View};

/// The maximum number of tokens a directory page holds.
pub const MAX_TOKENS_PER_PAGE: usize = 32;

/// A token and its optional URI blob, as stored in a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenEntry {
    /// The token identifier.
    pub id: TokenId,
    /// The URI blob recorded at mint, if any.
    pub uri: Option<Vec<u8>>,
}

/// One page of an owner's token directory.
#[derive(Clone, Debug, Default)]
pub struct NftPage {
    /// The tokens on this page, sorted ascending by page prefix.
    pub tokens: Vec<TokenEntry>,
    /// The key of the preceding page in the chain.
    pub prev: Option<Key>,
    /// The key of the following page in the chain.
    pub next: Option<Key>,
}

/// Locate the key of the only page that could hold `token` for `owner`.
///
/// The page's existence does not imply the token is present; callers scan.
pub fn locate(view: &impl View, owner: &AccountId, token: &TokenId) -> Option<Key> {
    let first = keys::page_for(owner, token);
    let last = keys::page_max(owner);
    view.succ(first, last)
}

/// Find a token in the owner's directory.
pub fn find_token(view: &impl View, owner: &AccountId, token: &TokenId) -> Option<TokenEntry> {
    let key = locate(view, owner, token)?;
    let page = view.page(&key)?;
    page.tokens.iter().find(|t| t.id == *token).cloned()
}

/// Whether the owner's directory contains any page at all.
pub fn has_pages(view: &impl View, owner: &AccountId) -> bool {
    view.succ(keys::page_min(owner), keys::page_max(owner))
        .is_some()
}

/// The owner's pages in chain order, with their keys.
///
/// Used by read-side queries and invariant checks; follows `next` links from
/// the lowest-keyed page.
pub fn walk_chain(view: &impl View, owner: &AccountId) -> Vec<(Key, NftPage)> {
    let mut out = Vec::new();
    let mut cursor = view.succ(keys::page_min(owner), keys::page_max(owner));
    while let Some(key) = cursor {
        let Some(page) = view.page(&key) else {
            break;
        };
        cursor = page.next;
        out.push((key, page.clone()));
    }
    out
}

/// Insert a token into the owner's directory.
///
/// Creates or splits pages as needed; each page created bumps the owner
/// count by one, which is the only reserve-affecting path during mint.
pub fn insert_token(
    view: &mut ApplyView,
    owner: &AccountId,
    entry: TokenEntry,
) -> Result<(), TxCode> {
    let page_key = page_for_token(view, owner, &entry.id)?;
    let Some(page) = view.page_mut(&page_key) else {
        error!("token page {} vanished during insert", hex32(&page_key));
        return Err(TxCode::Internal);
    };

    let prefix = entry.id.page_prefix();
    let pos = page
        .tokens
        .partition_point(|t| t.id.page_prefix() <= prefix);
    page.tokens.insert(pos, entry);
    Ok(())
}

/// Remove a token from the owner's directory, coalescing pages where
/// possible.
pub fn remove_token(view: &mut ApplyView, owner: &AccountId, token: &TokenId) -> Result<(), TxCode> {
    let Some(cur_key) = locate(view, owner, token) else {
        return Err(TxCode::NoEntry);
    };
    let Some(cur) = view.page(&cur_key).cloned() else {
        return Err(TxCode::NoEntry);
    };
    let Some(pos) = cur.tokens.iter().position(|t| t.id == *token) else {
        return Err(TxCode::NoEntry);
    };

    // Resolve both neighbors up front; a dangling link is a broken chain.
    let prev_key = cur.prev;
    let next_key = cur.next;
    for link in [prev_key, next_key].into_iter().flatten() {
        if view.page(&link).is_none() {
            error!(
                "token page {} links to missing page {}",
                hex32(&cur_key),
                hex32(&link)
            );
            return Err(TxCode::Internal);
        }
    }

    let mut remaining = cur.tokens.clone();
    remaining.remove(pos);

    if !remaining.is_empty() {
        view.page_mut(&cur_key)
            .expect("page read above; still present")
            .tokens = remaining;

        // Coalesce with both neighbors. Either merge (or both) may fire;
        // a merge erases the lower page, so the current key survives the
        // first merge and stays valid for the second.
        let mut removed = 0;
        if let Some(prev) = prev_key {
            if try_merge(view, prev, cur_key)? {
                removed += 1;
            }
        }
        if let Some(next) = next_key {
            if try_merge(view, cur_key, next)? {
                removed += 1;
            }
        }
        if removed != 0 {
            adjust_owner_count(view, owner, -removed)?;
        }
        return Ok(());
    }

    // The page is now empty: unlink it from the chain and erase it.
    if let Some(prev) = prev_key {
        view.page_mut(&prev)
            .expect("neighbor checked above")
            .next = next_key;
    }
    if let Some(next) = next_key {
        view.page_mut(&next)
            .expect("neighbor checked above")
            .prev = prev_key;
    }
    view.erase(&cur_key);

    let mut removed = 1;

    // The two surviving neighbors are now adjacent; try coalescing them.
    // Tokens leave one at a time, so a page emptying between two pages that
    // fit in one should be impossible — but if the analysis is ever wrong,
    // coalescing here keeps the chain invariant intact.
    if let (Some(prev), Some(next)) = (prev_key, next_key) {
        if try_merge(view, prev, next)? {
            warn!("coalesced the neighbors of an emptied token page");
            removed += 1;
        }
    }

    adjust_owner_count(view, owner, -removed)?;
    Ok(())
}

/// The page that should receive `token`, creating or splitting as needed.
fn page_for_token(view: &mut ApplyView, owner: &AccountId, token: &TokenId) -> Result<Key, TxCode> {
    let first = keys::page_for(owner, token);
    let last = keys::page_max(owner);

    let Some(found) = view.succ(first, last) else {
        // No page can hold the token; lazily create the chain's last page.
        // If lower pages survive from an earlier erasure of the last page,
        // the new page must rejoin the chain behind them.
        let prev = view.pred(keys::page_min(owner), first);
        if let Some(prev_key) = prev {
            let Some(page) = view.page_mut(&prev_key) else {
                error!("page index returned non-page entry {}", hex32(&prev_key));
                return Err(TxCode::Internal);
            };
            page.next = Some(last);
        }
        view.insert(
            last,
            Entry::Page(NftPage {
                tokens: Vec::new(),
                prev,
                next: None,
            }),
        );
        adjust_owner_count(view, owner, 1)?;
        return Ok(last);
    };

    let Some(page) = view.page(&found) else {
        error!("page index returned non-page entry {}", hex32(&found));
        return Err(TxCode::Internal);
    };
    if page.tokens.len() < MAX_TOKENS_PER_PAGE {
        return Ok(found);
    }

    split_page(view, owner, found, token)
}

/// Split the full page at `cur_key` and return the page that should receive
/// `token`.
///
/// The lower half moves to a freshly-created page keyed by the largest
/// prefix it contains; because the split index sits on a prefix-group
/// boundary, that bound is strictly below every prefix kept in the upper
/// page and the placement rule stays deterministic.
fn split_page(
    view: &mut ApplyView,
    owner: &AccountId,
    cur_key: Key,
    token: &TokenId,
) -> Result<Key, TxCode> {
    let cur = view
        .page(&cur_key)
        .cloned()
        .expect("caller located this page");
    debug_assert_eq!(cur.tokens.len(), MAX_TOKENS_PER_PAGE);

    // Prefer to split at the midpoint, rounded up to the end of the prefix
    // group straddling it so equivalent tokens stay together. If the whole
    // upper half is one group, fall back to the group's start; if the group
    // spans the entire page, there is nowhere to split.
    let half = MAX_TOKENS_PER_PAGE / 2;
    let cmp = cur.tokens[half - 1].id.page_prefix();
    let split_at = match cur.tokens[half..]
        .iter()
        .position(|t| t.id.page_prefix() != cmp)
    {
        Some(i) => half + i,
        None => {
            match cur
                .tokens
                .iter()
                .position(|t| t.id.page_prefix() == cmp)
            {
                Some(0) => return Err(TxCode::NoSuitablePage),
                Some(i) => i,
                // tokens[half - 1] matches cmp by construction.
                None => {
                    error!("split scan lost its own comparison prefix");
                    return Err(TxCode::Internal);
                }
            }
        }
    };

    let lower_tokens = cur.tokens[..split_at].to_vec();
    let upper_tokens = cur.tokens[split_at..].to_vec();
    let lower_key = keys::page(
        owner,
        lower_tokens
            .last()
            .expect("split index is nonzero")
            .id
            .page_prefix(),
    );

    if let Some(prev) = cur.prev {
        let Some(page) = view.page_mut(&prev) else {
            error!(
                "token page {} links to missing page {}",
                hex32(&cur_key),
                hex32(&prev)
            );
            return Err(TxCode::Internal);
        };
        page.next = Some(lower_key);
    }

    view.insert(
        lower_key,
        Entry::Page(NftPage {
            tokens: lower_tokens,
            prev: cur.prev,
            next: Some(cur_key),
        }),
    );

    let page = view.page_mut(&cur_key).expect("cloned above");
    page.tokens = upper_tokens;
    page.prev = Some(lower_key);

    adjust_owner_count(view, owner, 1)?;

    if keys::page_for(owner, token) <= lower_key {
        Ok(lower_key)
    } else {
        Ok(cur_key)
    }
}

/// Merge two adjacent pages if their combined contents fit in one.
///
/// On success the lower page is erased and its tokens move to the upper
/// page, which inherits the lower page's `prev` link. Returns whether the
/// merge happened.
fn try_merge(view: &mut ApplyView, lower_key: Key, upper_key: Key) -> Result<bool, TxCode> {
    let (Some(lower), Some(upper)) = (
        view.page(&lower_key).cloned(),
        view.page(&upper_key).cloned(),
    ) else {
        error!(
            "merge of {} into {} found a missing page",
            hex32(&lower_key),
            hex32(&upper_key)
        );
        return Err(TxCode::Internal);
    };

    if lower_key >= upper_key
        || lower.next != Some(upper_key)
        || upper.prev != Some(lower_key)
    {
        error!(
            "chain linkage broken between {} and {}",
            hex32(&lower_key),
            hex32(&upper_key)
        );
        return Err(TxCode::Internal);
    }

    if lower.tokens.len() + upper.tokens.len() > MAX_TOKENS_PER_PAGE {
        return Ok(false);
    }

    let mut merged = Vec::with_capacity(lower.tokens.len() + upper.tokens.len());
    let mut a = lower.tokens.into_iter().peekable();
    let mut b = upper.tokens.into_iter().peekable();
    loop {
        match (a.peek(), b.peek()) {
            (Some(x), Some(y)) => {
                if x.id.page_prefix() <= y.id.page_prefix() {
                    merged.push(a.next().expect("peeked"));
                } else {
                    merged.push(b.next().expect("peeked"));
                }
            }
            (Some(_), None) => merged.push(a.next().expect("peeked")),
            (None, Some(_)) => merged.push(b.next().expect("peeked")),
            (None, None) => break,
        }
    }

    if let Some(prev) = lower.prev {
        let Some(page) = view.page_mut(&prev) else {
            error!(
                "token page {} links to missing page {}",
                hex32(&lower_key),
                hex32(&prev)
            );
            return Err(TxCode::Internal);
        };
        page.next = Some(upper_key);
    }

    let page = view.page_mut(&upper_key).expect("cloned above");
    page.tokens = merged;
    page.prev = lower.prev;

    view.erase(&lower_key);
    Ok(true)
}

fn hex32(key: &Key) -> String {
    key.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountRoot, ApplyView, FeeSchedule, LedgerState, Rules};
    use imbl::OrdMap;
    use nftbook_core::TokenId;

    fn acct(fill: u8) -> AccountId {
        AccountId::from_bytes([fill; 20])
    }

    fn test_view(owner: AccountId) -> ApplyView {
        let mut entries = OrdMap::new();
        entries.insert(
            keys::account(&owner),
            Entry::Account(AccountRoot::new(1_000_000_000)),
        );
        let state = LedgerState {
            entries,
            parent_close_time: 0,
            fees: FeeSchedule {
                base_fee: 10,
                reserve_base: 0,
                reserve_increment: 0,
            },
            rules: Rules::default(),
        };
        ApplyView::new(&state)
    }

    // A token whose prefix ordering is controlled through the stored taxon:
    // a shared issuer keeps the prefix head constant, `group` dominates the
    // ordering, and the sequence keeps identifiers unique. Feeding the
    // cipher the target value makes the stored taxon come out as exactly
    // `group << 16`.
    fn token(group: u8, seq: u8) -> TokenEntry {
        let raw = nftbook_core::token_id::cipher_taxon(seq as u32, (group as u32) << 16);
        TokenEntry {
            id: TokenId::pack(0, 0, acct(0x55), raw, seq as u32),
            uri: None,
        }
    }

    // Tokens that are fully equivalent: same prefix, distinguished only by
    // high-bit fields outside the prefix.
    fn equivalent(n: u8) -> TokenEntry {
        TokenEntry {
            id: TokenId::pack(0, n as u16, acct(0x77), 0, 0),
            uri: None,
        }
    }

    fn chain(view: &ApplyView, owner: &AccountId) -> Vec<NftPage> {
        walk_chain(view, owner).into_iter().map(|(_, p)| p).collect()
    }

    #[test]
    fn first_insert_creates_the_last_page() {
        let owner = acct(1);
        let mut view = test_view(owner);

        insert_token(&mut view, &owner, token(0, 0)).unwrap();

        let pages = walk_chain(&view, &owner);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].0, keys::page_max(&owner));
        assert_eq!(pages[0].1.tokens.len(), 1);
        assert_eq!(view.account(&owner).unwrap().owner_count, 1);
    }

    #[test]
    fn inserts_keep_prefix_order() {
        let owner = acct(1);
        let mut view = test_view(owner);

        for n in [5u8, 1, 9, 3, 7] {
            insert_token(&mut view, &owner, token(n, n)).unwrap();
        }

        let pages = chain(&view, &owner);
        let prefixes: Vec<_> = pages[0]
            .tokens
            .iter()
            .map(|t| t.id.page_prefix())
            .collect();
        let mut sorted = prefixes.clone();
        sorted.sort();
        assert_eq!(prefixes, sorted);
    }

    #[test]
    fn full_page_splits_at_the_midpoint_group_boundary() {
        let owner = acct(2);
        let mut view = test_view(owner);

        for n in 0..32u8 {
            insert_token(&mut view, &owner, token(n, n)).unwrap();
        }
        insert_token(&mut view, &owner, token(32, 32)).unwrap();

        let pages = chain(&view, &owner);
        assert_eq!(pages.len(), 2);
        // All 32 prefixes were distinct, so the split lands exactly at 16.
        assert_eq!(pages[0].tokens.len(), 16);
        assert_eq!(pages[1].tokens.len(), 17);
        assert_eq!(view.account(&owner).unwrap().owner_count, 2);

        // Every token remains findable after the split.
        for n in 0..33u8 {
            assert!(find_token(&view, &owner, &token(n, n).id).is_some());
        }
    }

    #[test]
    fn split_keeps_equivalent_tokens_together() {
        let owner = acct(3);
        let mut view = test_view(owner);

        // Fill the upper half of the page with one prefix group straddling
        // the midpoint: 14 singletons, then 18 equivalents.
        for n in 0..14u8 {
            insert_token(&mut view, &owner, token(n, n)).unwrap();
        }
        for n in 0..18u8 {
            insert_token(&mut view, &owner, equivalent(n)).unwrap();
        }
        // One more distinct token forces a split; the scan from the midpoint
        // finds no boundary above it and falls back to the group start.
        insert_token(&mut view, &owner, token(200, 0)).unwrap();

        let pages = chain(&view, &owner);
        assert_eq!(pages.len(), 2);
        let group_prefix = equivalent(0).id.page_prefix();
        for page in &pages {
            let count = page
                .tokens
                .iter()
                .filter(|t| t.id.page_prefix() == group_prefix)
                .count();
            assert!(count == 0 || count == 18, "group split across pages");
        }
    }

    #[test]
    fn monolithic_full_page_rejects_a_33rd_equivalent() {
        let owner = acct(4);
        let mut view = test_view(owner);

        for n in 0..32u8 {
            insert_token(&mut view, &owner, equivalent(n)).unwrap();
        }
        let err = insert_token(&mut view, &owner, equivalent(32)).unwrap_err();
        assert_eq!(err, TxCode::NoSuitablePage);

        // The page cannot split for any incoming token, equivalent or not.
        let err = insert_token(&mut view, &owner, token(9, 9)).unwrap_err();
        assert_eq!(err, TxCode::NoSuitablePage);
    }

    #[test]
    fn removal_of_last_token_erases_the_page() {
        let owner = acct(5);
        let mut view = test_view(owner);

        let t = token(1, 1);
        insert_token(&mut view, &owner, t.clone()).unwrap();
        remove_token(&mut view, &owner, &t.id).unwrap();

        assert!(!has_pages(&view, &owner));
        assert_eq!(view.account(&owner).unwrap().owner_count, 0);
    }

    #[test]
    fn removal_merges_neighbors_when_they_fit() {
        let owner = acct(6);
        let mut view = test_view(owner);

        // Two pages of 16/17 after the split.
        for n in 0..33u8 {
            insert_token(&mut view, &owner, token(n, n)).unwrap();
        }
        assert_eq!(chain(&view, &owner).len(), 2);

        // Removing one token makes 16 + 16 = 32: the pages coalesce.
        remove_token(&mut view, &owner, &token(32, 32).id).unwrap();
        let pages = chain(&view, &owner);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].tokens.len(), 32);
        assert_eq!(view.account(&owner).unwrap().owner_count, 1);
    }

    #[test]
    fn removing_a_missing_token_is_no_entry() {
        let owner = acct(7);
        let mut view = test_view(owner);
        insert_token(&mut view, &owner, token(1, 1)).unwrap();

        let err = remove_token(&mut view, &owner, &token(2, 2).id).unwrap_err();
        assert_eq!(err, TxCode::NoEntry);
    }

    #[test]
    fn chain_links_stay_mutual_across_splits() {
        let owner = acct(8);
        let mut view = test_view(owner);

        for n in 0..96u8 {
            insert_token(&mut view, &owner, token(n, n)).unwrap();
        }

        let pages = walk_chain(&view, &owner);
        assert!(pages.len() > 1);
        for window in pages.windows(2) {
            let (ref k1, ref p1) = window[0];
            let (ref k2, ref p2) = window[1];
            assert!(k1 < k2);
            assert_eq!(p1.next, Some(*k2));
            assert_eq!(p2.prev, Some(*k1));
            let p1_max = p1.tokens.last().unwrap().id.page_prefix();
            let p2_min = p2.tokens.first().unwrap().id.page_prefix();
            assert!(p1_max < p2_min);
        }
    }
}
