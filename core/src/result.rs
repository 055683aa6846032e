//! Transaction result codes.
//!
//! Every stage of transaction processing reduces to a single [`TxCode`].
//! Codes fall into five classes ([`CodeKind`]), which is what the
//! surrounding ledger acts on: malformed transactions are dropped without
//! charging a fee, claimed failures charge the fee and keep no other writes,
//! retryable failures are re-queued by the scheduler, and invariant failures
//! mean the engine observed state it believes impossible.

/// The result of one transaction-processing stage.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TxCode {
    /// The stage (or the whole transaction) succeeded.
    Success,

    // Malformed: rejected before any state access, never retried.
    /// Syntactically invalid in a way no more specific code covers.
    Malformed,
    /// Transfer fee above the 50% maximum.
    BadTransferFee,
    /// A present-but-zero expiration.
    BadExpiration,
    /// A negative-equivalent, zero-where-forbidden, or wrong-asset amount.
    BadAmount,
    /// A flag bit outside the type's legal mask.
    InvalidFlag,
    /// The NFT feature is not enabled in the current rules.
    Disabled,

    // Retryable.
    /// The declared fee does not meet the ledger's base fee.
    BadFee,

    // Claimed: the fee is charged, every other write is discarded.
    /// A referenced ledger object does not exist.
    ObjectNotFound,
    /// The token is not present in the named owner's directory.
    NoEntry,
    /// The named issuer account does not exist.
    NoIssuer,
    /// The submitter is not authorized for the operation.
    NoPermission,
    /// A referenced offer (or the offer being created) has expired.
    Expired,
    /// A required trust line is frozen.
    Frozen,
    /// A required trust line does not exist.
    NoLine,
    /// The named destination account does not exist.
    NoDst,
    /// The buying account does not hold the offered amount.
    UnfundedOffer,
    /// A settlement participant cannot cover a payment leg.
    InsufficientFunds,
    /// The brokered amounts cannot satisfy the seller's floor.
    InsufficientPayment,
    /// The owner's balance does not cover the reserve for a new object.
    InsufficientReserve,
    /// The issuer's mint counter is exhausted.
    MaxSequenceReached,
    /// An offer's buy/sell flag does not match its role.
    OfferTypeMismatch,
    /// The brokered offers disagree on token, asset, or destination.
    BuySellMismatch,
    /// An account tried to accept its own offer.
    CantAcceptOwnOffer,
    /// The token is not transferable and no party is its issuer or minter.
    TokenNotTransferable,
    /// The token's page is full of equivalent tokens and cannot split.
    NoSuitablePage,
    /// The token has too many offers to delete at burn time.
    TooBig,

    /// The engine observed state it believes impossible; all writes are
    /// discarded and the condition is logged at error severity.
    Internal,
}

/// The classification of a [`TxCode`].
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CodeKind {
    /// The transaction succeeded and commits.
    Success,
    /// Permanently malformed; no fee charged, never retried.
    Malformed,
    /// Semantically rejected; fee charged, not retried.
    Claimed,
    /// Transient; the scheduler may retry within or across rounds.
    Retry,
    /// An internal invariant failed.
    Invariant,
}

impl TxCode {
    /// The class of this code.
    pub fn kind(self) -> CodeKind {
        use TxCode::*;
        match self {
            Success => CodeKind::Success,
            Malformed | BadTransferFee | BadExpiration | BadAmount | InvalidFlag | Disabled => {
                CodeKind::Malformed
            }
            BadFee => CodeKind::Retry,
            ObjectNotFound | NoEntry | NoIssuer | NoPermission | Expired | Frozen | NoLine
            | NoDst | UnfundedOffer | InsufficientFunds | InsufficientPayment
            | InsufficientReserve | MaxSequenceReached | OfferTypeMismatch | BuySellMismatch
            | CantAcceptOwnOffer | TokenNotTransferable | NoSuitablePage | TooBig => {
                CodeKind::Claimed
            }
            Internal => CodeKind::Invariant,
        }
    }

    /// Whether this code is [`TxCode::Success`].
    pub fn is_success(self) -> bool {
        self == TxCode::Success
    }
}
