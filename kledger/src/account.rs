//! Per-user account record: balances, generation settings and referral link.
//!
//! ```rust
//! use chrono::Utc;
//! use kcommon::UserId;
//! use kledger::UserAccount;
//!
//! let account = UserAccount::new(UserId::new(10), Utc::now(), 5)
//!     .with_referrer(UserId::new(3));
//!
//! assert_eq!(account.free_credits, 5);
//! assert_eq!(account.aspect_ratio, "1:1");
//! assert_eq!(account.referrer_id(), Some(UserId::new(3)));
//! ```

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use kcommon::{ParameterBag, UserId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ASPECT_RATIO: &str = "1:1";
pub const DEFAULT_LANGUAGE_CODE: &str = "en";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Credits,
    Diamonds,
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credits => f.write_str("credits"),
            Self::Diamonds => f.write_str("diamonds"),
        }
    }
}

/// Amount and currency of one paid action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cost {
    pub amount: u32,
    pub currency: Currency,
}

impl Cost {
    pub const fn credits(amount: u32) -> Self {
        Self {
            amount,
            currency: Currency::Credits,
        }
    }

    pub const fn diamonds(amount: u32) -> Self {
        Self {
            amount,
            currency: Currency::Diamonds,
        }
    }
}

impl Display for Cost {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub paid_credits: u32,
    pub free_credits: u32,
    pub diamonds: u32,
    pub last_free_reset: DateTime<Utc>,
    pub aspect_ratio: String,
    pub num_outputs: u32,
    /// Flat settings namespace shared by every model the user configures.
    #[serde(with = "settings_json", default)]
    pub custom_settings: ParameterBag,
    pub generated_image_count: u32,
    #[serde(default)]
    referrer_id: Option<UserId>,
    pub language_code: String,
}

impl UserAccount {
    pub fn new(id: UserId, now: DateTime<Utc>, free_grant: u32) -> Self {
        Self {
            id,
            username: None,
            paid_credits: 0,
            free_credits: free_grant,
            diamonds: 0,
            last_free_reset: now,
            aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
            num_outputs: 1,
            custom_settings: ParameterBag::new(),
            generated_image_count: 0,
            referrer_id: None,
            language_code: DEFAULT_LANGUAGE_CODE.to_string(),
        }
    }

    /// Links the account to its referrer. Self-referral is ignored.
    pub fn with_referrer(mut self, referrer: UserId) -> Self {
        if referrer != self.id && self.referrer_id.is_none() {
            self.referrer_id = Some(referrer);
        }
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_language_code(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = language_code.into();
        self
    }

    pub fn referrer_id(&self) -> Option<UserId> {
        self.referrer_id
    }

    pub fn total_credits(&self) -> u64 {
        u64::from(self.free_credits) + u64::from(self.paid_credits)
    }

    pub fn balance(&self, currency: Currency) -> u64 {
        match currency {
            Currency::Credits => self.total_credits(),
            Currency::Diamonds => u64::from(self.diamonds),
        }
    }
}

mod settings_json {
    use kcommon::ParameterBag;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(settings: &ParameterBag, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = serde_json::to_string(settings).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<ParameterBag, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        if encoded.trim().is_empty() {
            return Ok(ParameterBag::new());
        }
        serde_json::from_str(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn account() -> UserAccount {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("valid timestamp");
        UserAccount::new(UserId::new(100), now, 5)
    }

    #[test]
    fn new_account_uses_documented_defaults() {
        let account = account();
        assert_eq!(account.free_credits, 5);
        assert_eq!(account.paid_credits, 0);
        assert_eq!(account.diamonds, 0);
        assert_eq!(account.num_outputs, 1);
        assert_eq!(account.aspect_ratio, "1:1");
        assert_eq!(account.language_code, "en");
        assert_eq!(account.referrer_id(), None);
    }

    #[test]
    fn referrer_is_set_once_and_never_self() {
        let own = account().with_referrer(UserId::new(100));
        assert_eq!(own.referrer_id(), None);

        let referred = account()
            .with_referrer(UserId::new(7))
            .with_referrer(UserId::new(8));
        assert_eq!(referred.referrer_id(), Some(UserId::new(7)));
    }

    #[test]
    fn custom_settings_persist_as_serialized_json_string() {
        let mut account = account();
        account
            .custom_settings
            .insert("seed".to_string(), json!(7));

        let encoded = serde_json::to_value(&account).expect("account should serialize");
        assert_eq!(encoded["custom_settings"], json!("{\"seed\":7}"));

        let decoded: UserAccount =
            serde_json::from_value(encoded).expect("account should deserialize");
        assert_eq!(decoded, account);
    }

    #[test]
    fn empty_settings_string_decodes_to_empty_map() {
        let mut encoded = serde_json::to_value(account()).expect("account should serialize");
        encoded["custom_settings"] = json!("");
        let decoded: UserAccount =
            serde_json::from_value(encoded).expect("account should deserialize");
        assert!(decoded.custom_settings.is_empty());
    }
}
