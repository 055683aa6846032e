#![warn(missing_docs)]

//! An NFT transaction-processing core for an account-based ledger.
//!
//! The engine implements five transaction types — mint, burn, create-offer,
//! cancel-offer, and accept-offer — together with the machinery they sit on:
//!
//! - a per-owner *token directory* holding each account's NFTs in a
//!   doubly-linked chain of fixed-capacity pages, located through an ordered
//!   key index ([`pages`]);
//! - offer objects indexed per owner and per token ([`offers`]);
//! - an atomic settlement path that routes broker and issuer cuts and moves
//!   the token between directories ([`tx`]);
//! - reserve and owner-count accounting tied to page and offer lifecycle.
//!
//! State lives in an in-memory ledger ([`ledger::Ledger`]) whose apply views
//! have copy-on-write semantics: a transaction either commits atomically or
//! leaves no trace beyond its fee. Transactions within a round are applied
//! serially; there is no in-transaction suspension.

pub mod deletion;
pub mod ledger;
pub mod offers;
pub mod pages;
pub mod tx;

pub use ledger::{FeeSchedule, Ledger, Rules};
pub use nftbook_core::{flags, keys, AccountId, Amount, Asset, CurrencyCode, Key, TokenId, TxCode};
pub use tx::{Transaction, TxKind};
