use nftbook::tx::{AcceptOffer, Burn, CancelOffer, CreateOffer, Mint};
use nftbook::{
    flags, AccountId, Amount, CurrencyCode, FeeSchedule, Key, Ledger, Rules, TokenId, Transaction,
    TxCode, TxKind,
};

pub const BASE_FEE: u64 = 10;
pub const RESERVE_BASE: u64 = 200;
pub const RESERVE_INCREMENT: u64 = 50;

#[allow(dead_code)]
pub fn acct(seed: u8) -> AccountId {
    AccountId::from_bytes([seed; 20])
}

#[allow(dead_code)]
pub fn xau(issuer: AccountId, value: u64) -> Amount {
    Amount::issued(CurrencyCode(*b"XAU"), issuer, value)
}

pub struct Env {
    pub ledger: Ledger,
}

#[allow(dead_code)]
impl Env {
    pub fn new() -> Self {
        Env {
            ledger: Ledger::new(
                FeeSchedule {
                    base_fee: BASE_FEE,
                    reserve_base: RESERVE_BASE,
                    reserve_increment: RESERVE_INCREMENT,
                },
                Rules::default(),
            ),
        }
    }

    pub fn reserve(&self, count: u32) -> u64 {
        RESERVE_BASE + RESERVE_INCREMENT * count as u64
    }

    /// Create an account comfortably funded for fees and a few pages.
    pub fn fund(&self, id: AccountId) {
        self.ledger.create_account(id, 1_000_000_000).unwrap();
    }

    pub fn fund_with(&self, id: AccountId, balance: u64) {
        self.ledger.create_account(id, balance).unwrap();
    }

    pub fn submit(&self, account: AccountId, kind: TxKind) -> TxCode {
        self.ledger.apply(&Transaction {
            account,
            fee: BASE_FEE,
            kind,
        })
    }

    /// Mint a plain transferable token and return its identifier.
    pub fn mint(&self, account: AccountId, taxon: u32) -> (TxCode, TokenId) {
        self.mint_with(
            account,
            Mint {
                taxon,
                flags: flags::TRANSFERABLE as u32,
                transfer_fee: 0,
                issuer: None,
                uri: None,
            },
        )
    }

    pub fn mint_with(&self, account: AccountId, mint: Mint) -> (TxCode, TokenId) {
        let issuer = mint.issuer.unwrap_or(account);
        let id = self.ledger.next_token_id(
            &issuer,
            mint.taxon,
            (mint.flags & 0xffff) as u16,
            mint.transfer_fee,
        );
        let code = self.submit(account, TxKind::Mint(mint));
        (code, id)
    }

    pub fn burn(&self, account: AccountId, token: TokenId) -> TxCode {
        self.submit(
            account,
            TxKind::Burn(Burn {
                token_id: token,
                owner: None,
            }),
        )
    }

    pub fn burn_for(&self, account: AccountId, token: TokenId, owner: AccountId) -> TxCode {
        self.submit(
            account,
            TxKind::Burn(Burn {
                token_id: token,
                owner: Some(owner),
            }),
        )
    }

    /// Place a sell offer and return its key.
    pub fn sell(&self, account: AccountId, token: TokenId, amount: Amount) -> (TxCode, Key) {
        self.sell_with(account, token, amount, None, None)
    }

    pub fn sell_with(
        &self,
        account: AccountId,
        token: TokenId,
        amount: Amount,
        destination: Option<AccountId>,
        expiration: Option<u32>,
    ) -> (TxCode, Key) {
        let key = self.ledger.next_offer_key(&account);
        let code = self.submit(
            account,
            TxKind::CreateOffer(CreateOffer {
                token_id: token,
                amount,
                owner: None,
                destination,
                expiration,
                flags: flags::SELL_OFFER,
            }),
        );
        (code, key)
    }

    /// Place a buy offer against `owner`'s token and return its key.
    pub fn buy(
        &self,
        account: AccountId,
        owner: AccountId,
        token: TokenId,
        amount: Amount,
    ) -> (TxCode, Key) {
        let key = self.ledger.next_offer_key(&account);
        let code = self.submit(
            account,
            TxKind::CreateOffer(CreateOffer {
                token_id: token,
                amount,
                owner: Some(owner),
                destination: None,
                expiration: None,
                flags: 0,
            }),
        );
        (code, key)
    }

    pub fn accept_sell(&self, account: AccountId, offer: Key) -> TxCode {
        self.submit(
            account,
            TxKind::AcceptOffer(AcceptOffer {
                buy_offer: None,
                sell_offer: Some(offer),
                broker_fee: None,
            }),
        )
    }

    pub fn accept_buy(&self, account: AccountId, offer: Key) -> TxCode {
        self.submit(
            account,
            TxKind::AcceptOffer(AcceptOffer {
                buy_offer: Some(offer),
                sell_offer: None,
                broker_fee: None,
            }),
        )
    }

    pub fn broker(
        &self,
        account: AccountId,
        buy: Key,
        sell: Key,
        fee: Option<Amount>,
    ) -> TxCode {
        self.submit(
            account,
            TxKind::AcceptOffer(AcceptOffer {
                buy_offer: Some(buy),
                sell_offer: Some(sell),
                broker_fee: fee,
            }),
        )
    }

    pub fn cancel(&self, account: AccountId, offers: Vec<Key>) -> TxCode {
        self.submit(account, TxKind::CancelOffer(CancelOffer { offers }))
    }

    /// Mint with the stored taxon forced to `target`, undoing the cipher.
    /// Tokens minted this way sort by `target` then sequence, which lets a
    /// test control page packing exactly.
    pub fn mint_grouped(&self, account: AccountId, target: u32) -> (TxCode, TokenId) {
        let seq = self
            .ledger
            .account_root(&account)
            .map_or(0, |a| a.minted_tokens);
        let raw = nftbook_core::token_id::cipher_taxon(seq, target);
        self.mint(account, raw)
    }

    /// Total tokens across an owner's pages.
    pub fn token_count(&self, owner: &AccountId) -> usize {
        self.ledger.tokens_of(owner).len()
    }

    /// Page sizes of an owner's chain, in chain order.
    pub fn page_sizes(&self, owner: &AccountId) -> Vec<usize> {
        self.ledger
            .pages_of(owner)
            .iter()
            .map(|p| p.tokens.len())
            .collect()
    }
}
