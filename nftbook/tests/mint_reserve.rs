//! Minting, the page reserve, and mint authorization.

mod common;

use common::{acct, Env, BASE_FEE};
use nftbook::tx::Mint;
use nftbook::{flags, TxCode, TxKind};

fn plain_mint(taxon: u32) -> Mint {
    Mint {
        taxon,
        flags: flags::TRANSFERABLE as u32,
        transfer_fee: 0,
        issuer: None,
        uri: None,
    }
}

#[test]
fn page_reserve_is_charged_once_per_page() {
    let env = Env::new();
    let alice = acct(1);

    // Enough for the first page's reserve, 32 fees, and a little slack.
    let epsilon = 5;
    env.fund_with(alice, env.reserve(1) + 32 * BASE_FEE + epsilon);

    // All 32 mints share one page; only the first one grows the owner
    // count, so only it faces the reserve.
    for fee in 0..32u16 {
        let (code, _) = env.mint_with(
            alice,
            Mint {
                taxon: 0,
                flags: flags::TRANSFERABLE as u32,
                transfer_fee: fee,
                issuer: None,
                uri: None,
            },
        );
        assert_eq!(code, TxCode::Success);
    }
    assert_eq!(env.token_count(&alice), 32);
    assert_eq!(env.ledger.owner_count(&alice), 1);
    assert_eq!(env.page_sizes(&alice), vec![32]);

    // The 33rd token needs a second page, and the balance cannot cover the
    // higher reserve. The failed attempt still costs its fee.
    let (code, _) = env.mint(alice, 0);
    assert_eq!(code, TxCode::InsufficientReserve);
    assert_eq!(env.token_count(&alice), 32);
    assert_eq!(env.ledger.owner_count(&alice), 1);
    assert_eq!(
        env.ledger.account_root(&alice).unwrap().minted_tokens,
        32,
        "a failed mint must not consume a sequence"
    );

    // Top up to the two-page reserve (plus the fee of the retry) and the
    // same mint goes through, creating the second page.
    let balance = env.ledger.balance(&alice);
    env.ledger
        .credit_account(&alice, env.reserve(2) - balance + BASE_FEE)
        .unwrap();
    let (code, _) = env.mint(alice, 0);
    assert_eq!(code, TxCode::Success);
    assert_eq!(env.token_count(&alice), 33);
    assert_eq!(env.ledger.owner_count(&alice), 2);
    assert_eq!(env.ledger.pages_of(&alice).len(), 2);
}

#[test]
fn transfer_fee_boundary() {
    let env = Env::new();
    let alice = acct(1);
    env.fund(alice);

    let (code, _) = env.mint_with(
        alice,
        Mint {
            transfer_fee: 50_000,
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::Success);

    let (code, _) = env.mint_with(
        alice,
        Mint {
            transfer_fee: 50_001,
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::BadTransferFee);
}

#[test]
fn mint_preflight_rejections() {
    let env = Env::new();
    let alice = acct(1);
    env.fund(alice);

    // Reserved flag bits.
    let (code, _) = env.mint_with(
        alice,
        Mint {
            flags: 0x0100,
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::InvalidFlag);

    // Naming yourself as issuer is redundant and rejected.
    let (code, _) = env.mint_with(
        alice,
        Mint {
            issuer: Some(alice),
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::Malformed);

    // URI length limits.
    let (code, _) = env.mint_with(
        alice,
        Mint {
            uri: Some(vec![]),
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::Malformed);
    let (code, _) = env.mint_with(
        alice,
        Mint {
            uri: Some(vec![0x2f; 257]),
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::Malformed);
    let (code, _) = env.mint_with(
        alice,
        Mint {
            uri: Some(b"ipfs://tokens/1".to_vec()),
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::Success);
}

#[test]
fn minting_on_behalf_requires_authorization() {
    let env = Env::new();
    let (alice, bob, mallory) = (acct(1), acct(2), acct(3));
    env.fund(alice);
    env.fund(bob);
    env.fund(mallory);

    let for_alice = Mint {
        issuer: Some(alice),
        ..plain_mint(7)
    };

    // Nobody is authorized yet.
    let (code, _) = env.mint_with(bob, for_alice.clone());
    assert_eq!(code, TxCode::NoPermission);

    env.ledger.set_minter(&alice, Some(bob)).unwrap();

    let (code, id) = env.mint_with(bob, for_alice.clone());
    assert_eq!(code, TxCode::Success);
    // The token lands in the minter's directory but records the issuer.
    assert!(env.ledger.holds_token(&bob, &id));
    assert!(!env.ledger.holds_token(&alice, &id));
    assert_eq!(id.issuer(), alice);
    assert_eq!(env.ledger.account_root(&alice).unwrap().minted_tokens, 1);

    // Authorization is exclusive.
    let (code, _) = env.mint_with(mallory, for_alice.clone());
    assert_eq!(code, TxCode::NoPermission);

    // A missing issuer account is its own failure.
    let (code, _) = env.mint_with(
        bob,
        Mint {
            issuer: Some(acct(99)),
            ..plain_mint(0)
        },
    );
    assert_eq!(code, TxCode::NoIssuer);
}

#[test]
fn exhausted_mint_sequence() {
    let env = Env::new();
    let alice = acct(1);
    env.fund(alice);
    env.ledger.set_minted_tokens(&alice, u32::MAX).unwrap();

    let (code, _) = env.mint(alice, 0);
    assert_eq!(code, TxCode::MaxSequenceReached);
    assert_eq!(env.token_count(&alice), 0);
}

#[test]
fn underfunded_fee_is_retryable() {
    let env = Env::new();
    let alice = acct(1);
    env.fund(alice);
    let before = env.ledger.balance(&alice);

    let code = env.ledger.apply(&nftbook::Transaction {
        account: alice,
        fee: BASE_FEE - 1,
        kind: TxKind::Mint(plain_mint(0)),
    });
    assert_eq!(code, TxCode::BadFee);
    // Retryable failures charge nothing.
    assert_eq!(env.ledger.balance(&alice), before);
    assert_eq!(env.ledger.account_root(&alice).unwrap().sequence, 0);
}

#[test]
fn disabled_rules_reject_everything() {
    let ledger = nftbook::Ledger::new(
        nftbook::FeeSchedule {
            base_fee: BASE_FEE,
            reserve_base: 0,
            reserve_increment: 0,
        },
        nftbook::Rules { nft_enabled: false },
    );
    let alice = acct(1);
    ledger.create_account(alice, 1_000_000).unwrap();

    let code = ledger.apply(&nftbook::Transaction {
        account: alice,
        fee: BASE_FEE,
        kind: TxKind::Mint(plain_mint(0)),
    });
    assert_eq!(code, TxCode::Disabled);
}
