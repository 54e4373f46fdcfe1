//! Credit ledger for the kiln media bot core.
//!
//! ```rust
//! use chrono::Utc;
//! use kcommon::UserId;
//! use kledger::{Cost, Ledger};
//!
//! let ledger = Ledger::default();
//! let mut account = ledger.new_account(UserId::new(5), Utc::now());
//!
//! assert!(ledger.can_cover(&account, Cost::credits(5)));
//! assert!(!ledger.can_cover(&account, Cost::diamonds(1)));
//! ledger.charge(&mut account, Cost::credits(2)).expect("charge should succeed");
//! assert_eq!(account.free_credits, 3);
//! ```

mod account;
mod error;
mod ledger;

pub use account::{Cost, Currency, DEFAULT_ASPECT_RATIO, DEFAULT_LANGUAGE_CODE, UserAccount};
pub use error::{LedgerError, LedgerErrorKind};
pub use ledger::{Ledger, LedgerPolicy, ReferralBonus};

pub mod prelude {
    pub use crate::{
        Cost, Currency, Ledger, LedgerError, LedgerErrorKind, LedgerPolicy, ReferralBonus,
        UserAccount,
    };
}
