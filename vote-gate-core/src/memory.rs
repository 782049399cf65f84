//! In-memory collaborators, loadable from a YAML fixture.

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::casting::{CastReceipt, CastRequest};
use crate::clock::Clock;
use crate::credential::SessionCredential;
use crate::error::GateError;
use crate::ports::{BallotCaster, Result, SealService, VotePoolQuery};
use crate::types::{Address, BallotContent, DecryptedContent, PoolId, VotePoolRecord};

// ─── Fixture ──────────────────────────────────────────────────

/// Pools, sealed plaintexts and access lists for a fixture-backed session.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    pub pools: Vec<VotePoolRecord>,
    /// Plaintext per ciphertext reference (the `details` of gated pools).
    #[serde(default)]
    pub sealed: HashMap<String, BallotContent>,
    /// Addresses allowed to decrypt a gated pool. Pools without an entry are open to any signer.
    #[serde(default)]
    pub allowlist: HashMap<PoolId, Vec<Address>>,
    /// Accounts the fixture wallet holds keys for.
    #[serde(default)]
    pub accounts: Vec<Address>,
}

impl Fixture {
    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}

// ─── Vote pool query ──────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryVotePoolQuery {
    pools: HashMap<PoolId, VotePoolRecord>,
}

impl MemoryVotePoolQuery {
    pub fn new(pools: impl IntoIterator<Item = VotePoolRecord>) -> Self {
        Self {
            pools: pools.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn from_fixture(fixture: &Fixture) -> Self {
        Self::new(fixture.pools.iter().cloned())
    }
}

#[async_trait]
impl VotePoolQuery for MemoryVotePoolQuery {
    async fn fetch_pool(&self, id: &PoolId) -> Result<Option<VotePoolRecord>> {
        Ok(self.pools.get(id).cloned())
    }
}

// ─── Seal service ─────────────────────────────────────────────

/// Decrypts by lookup. Enforces credential validity and pool allowlists.
pub struct MemorySealService {
    plaintexts: HashMap<String, BallotContent>,
    allowlist: HashMap<PoolId, Vec<Address>>,
    clock: Arc<dyn Clock>,
}

impl MemorySealService {
    pub fn new(plaintexts: HashMap<String, BallotContent>, clock: Arc<dyn Clock>) -> Self {
        Self {
            plaintexts,
            allowlist: HashMap::new(),
            clock,
        }
    }

    pub fn from_fixture(fixture: &Fixture, clock: Arc<dyn Clock>) -> Self {
        Self {
            plaintexts: fixture.sealed.clone(),
            allowlist: fixture.allowlist.clone(),
            clock,
        }
    }
}

#[async_trait]
impl SealService for MemorySealService {
    async fn decrypt(
        &self,
        credential: &SessionCredential,
        record: &VotePoolRecord,
    ) -> Result<DecryptedContent> {
        if credential.is_expired(self.clock.now()) {
            return Err(GateError::Decryption("session key expired".to_string()));
        }
        if !record.is_gated() {
            return Err(GateError::Decryption(format!(
                "pool {} is not sealed",
                record.id
            )));
        }
        if let Some(allowed) = self.allowlist.get(&record.id) {
            if !allowed.contains(&credential.address) {
                return Err(GateError::Decryption(format!(
                    "{} is not on the allowlist of {}",
                    credential.address, record.id
                )));
            }
        }
        let content = self
            .plaintexts
            .get(&record.details)
            .cloned()
            .ok_or_else(|| GateError::Decryption(format!("unknown ciphertext {}", record.details)))?;

        Ok(DecryptedContent {
            pool_id: record.id.clone(),
            credential_id: credential.id,
            content,
        })
    }
}

// ─── Ballot caster ────────────────────────────────────────────

/// Records casts and hands back a digest per cast.
#[derive(Debug, Default)]
pub struct MemoryBallotCaster {
    casts: Mutex<Vec<CastRequest>>,
}

impl MemoryBallotCaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn casts(&self) -> Vec<CastRequest> {
        self.casts.lock().await.clone()
    }
}

#[async_trait]
impl BallotCaster for MemoryBallotCaster {
    async fn cast(&self, request: &CastRequest) -> Result<CastReceipt> {
        let mut casts = self.casts.lock().await;
        let mut hasher = Sha256::new();
        hasher.update(request.ballot_box_id.as_str().as_bytes());
        hasher.update(request.pool_id.as_str().as_bytes());
        hasher.update(request.choice.to_le_bytes());
        hasher.update(casts.len().to_le_bytes());
        casts.push(request.clone());
        Ok(CastReceipt {
            digest: hex::encode(hasher.finalize()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::BallotBoxId;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    const FIXTURE: &str = r#"
pools:
  - id: v1
    title: Lunch
    end: 1767225600000
    visibility: public
    ballot_box_id: box-1
    details: '{"options":["A","B"]}'
  - id: v2
    title: Budget
    end: 1767225600000
    visibility: gated
    ballot_box_id: box-2
    details: "sealed:v2"
sealed:
  "sealed:v2":
    options: ["Yes", "No"]
allowlist:
  v2: ["0xABC"]
accounts: ["0xABC", "0xDEF"]
"#;

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn credential(address: &str) -> SessionCredential {
        SessionCredential {
            id: Uuid::new_v4(),
            address: Address::from(address),
            package_id: "0xpkg".into(),
            created_at: now(),
            expires_at: now() + Duration::minutes(10),
            signature: "sig".into(),
        }
    }

    #[tokio::test]
    async fn fixture_backs_query_and_seal() {
        let fixture = Fixture::from_yaml(FIXTURE).unwrap();
        assert_eq!(fixture.accounts.len(), 2);

        let query = MemoryVotePoolQuery::from_fixture(&fixture);
        let v2 = query.fetch_pool(&PoolId::from("v2")).await.unwrap().unwrap();
        assert!(v2.is_gated());
        assert!(query.fetch_pool(&PoolId::from("v3")).await.unwrap().is_none());

        let clock = Arc::new(ManualClock::new(now()));
        let seal = MemorySealService::from_fixture(&fixture, clock.clone());
        let cred = credential("0xABC");
        let opened = seal.decrypt(&cred, &v2).await.unwrap();
        assert_eq!(opened.content.options, vec!["Yes", "No"]);
        assert_eq!(opened.credential_id, cred.id);

        // Not on the allowlist.
        let err = seal.decrypt(&credential("0xDEF"), &v2).await.unwrap_err();
        assert!(matches!(err, GateError::Decryption(_)));

        // Expired by the time the seal service sees it.
        clock.advance(Duration::minutes(11));
        assert!(seal.decrypt(&cred, &v2).await.is_err());
    }

    #[tokio::test]
    async fn caster_records_each_cast() {
        let caster = MemoryBallotCaster::new();
        let content = BallotContent {
            options: vec!["A".into(), "B".into()],
            description: None,
        };
        let req = CastRequest::new(PoolId::from("v1"), BallotBoxId::from("box-1"), &content, 0)
            .unwrap();
        let first = caster.cast(&req).await.unwrap();
        let second = caster.cast(&req).await.unwrap();
        assert_ne!(first.digest, second.digest);
        assert_eq!(caster.casts().await.len(), 2);
    }
}
