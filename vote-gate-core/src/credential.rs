//! Session credentials
//!
//! A session credential is the short-lived, address-bound proof a wallet
//! produces by signing a personal message. Gated pools can only be
//! decrypted while one is valid for the connected account.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Address;

/// Default lifetime of a session key, in minutes.
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 10;

/// Longest session key lifetime a config may ask for (one day).
pub const MAX_SESSION_TTL_MINUTES: i64 = 24 * 60;

/// A signed session key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredential {
    pub id: Uuid,
    pub address: Address,
    /// Package whose keys this session may access.
    pub package_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Wallet signature over the request's personal message.
    pub signature: String,
}

impl SessionCredential {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Owned by `account` and not yet expired.
    pub fn is_valid_for(&self, account: &Address, now: DateTime<Utc>) -> bool {
        self.address == *account && !self.is_expired(now)
    }
}

/// The validity predicate. A missing credential or a missing account is never valid.
///
/// Callers must evaluate this at the point of use: `now` moves and the
/// account can change between events.
pub fn is_credential_valid(
    credential: Option<&SessionCredential>,
    account: Option<&Address>,
    now: DateTime<Utc>,
) -> bool {
    match (credential, account) {
        (Some(credential), Some(account)) => credential.is_valid_for(account, now),
        _ => false,
    }
}

/// What the wallet is asked to sign to mint a credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionKeyRequest {
    pub address: Address,
    pub package_id: String,
    pub ttl: Duration,
    pub created_at: DateTime<Utc>,
}

impl SessionKeyRequest {
    pub fn new(
        address: Address,
        package_id: impl Into<String>,
        ttl: Duration,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            address,
            package_id: package_id.into(),
            ttl,
            created_at,
        }
    }

    /// Saturates at the latest representable instant.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.created_at
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Human-readable message shown by the wallet.
    pub fn personal_message(&self) -> String {
        format!(
            "Accessing keys of package {} for {} mins from {}, account {}",
            self.package_id,
            self.ttl.num_minutes(),
            self.created_at.to_rfc3339(),
            self.address
        )
    }

    pub fn into_credential(self, signature: impl Into<String>) -> SessionCredential {
        let expires_at = self.expires_at();
        SessionCredential {
            id: Uuid::new_v4(),
            address: self.address,
            package_id: self.package_id,
            created_at: self.created_at,
            expires_at,
            signature: signature.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn credential(address: &str, expires_at: DateTime<Utc>) -> SessionCredential {
        SessionCredential {
            id: Uuid::new_v4(),
            address: Address::from(address),
            package_id: "0xpkg".into(),
            created_at: expires_at - Duration::minutes(10),
            expires_at,
            signature: "sig".into(),
        }
    }

    #[test]
    fn missing_credential_is_invalid() {
        assert!(!is_credential_valid(None, Some(&Address::from("0xABC")), t0()));
    }

    #[test]
    fn missing_account_is_invalid() {
        let c = credential("0xABC", t0() + Duration::minutes(5));
        assert!(!is_credential_valid(Some(&c), None, t0()));
    }

    #[test]
    fn expired_credential_is_invalid() {
        let c = credential("0xABC", t0() - Duration::seconds(1));
        assert!(!is_credential_valid(
            Some(&c),
            Some(&Address::from("0xABC")),
            t0()
        ));
    }

    #[test]
    fn expiry_instant_itself_is_invalid() {
        let c = credential("0xABC", t0());
        assert!(c.is_expired(t0()));
        assert!(!c.is_valid_for(&Address::from("0xABC"), t0()));
    }

    #[test]
    fn request_builds_credential_with_ttl() {
        let req = SessionKeyRequest::new(
            Address::from("0xABC"),
            "0xpkg",
            Duration::seconds(600),
            t0(),
        );
        assert!(req.personal_message().contains("0xpkg"));
        assert!(req.personal_message().contains("for 10 mins"));

        let c = req.into_credential("deadbeef");
        assert_eq!(c.expires_at, t0() + Duration::seconds(600));
        assert_eq!(c.address, Address::from("0xABC"));
        assert!(c.is_valid_for(&Address::from("0xABC"), t0()));
    }

    #[test]
    fn oversized_ttl_saturates_expiry() {
        let req = SessionKeyRequest::new(
            Address::from("0xABC"),
            "0xpkg",
            Duration::days(100_000_000),
            t0(),
        );
        assert_eq!(req.expires_at(), DateTime::<Utc>::MAX_UTC);
    }

    proptest! {
        #[test]
        fn validity_matches_owner_and_expiry(
            owner in "0x[0-9a-f]{1,4}",
            account in "0x[0-9a-f]{1,4}",
            expiry_offset in -3_600i64..3_600,
        ) {
            let c = credential(&owner, t0() + Duration::seconds(expiry_offset));
            let expected = owner == account && expiry_offset > 0;
            prop_assert_eq!(
                is_credential_valid(Some(&c), Some(&Address::from(account.as_str())), t0()),
                expected
            );
        }
    }
}
