//! **ArtifactStore** — synthesized clips keyed by an opaque filename.
//!
//! A clip is produced by one request and fetched by a later, unrelated one, so the
//! store owns it until the retention policy expires it. Expired clips are invisible
//! to `get` immediately and reclaimed by `sweep_expired`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Opaque identifier of a stored clip, shaped like a filename (`<hex>.wav`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn generate() -> Self {
        Self(format!("{}.wav", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored clip. `bytes` is shared so handing it to a response is cheap.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub id: ArtifactId,
    pub bytes: Arc<[u8]>,
    /// Strategy that produced the clip (e.g. `xtts-clone`, `placeholder`).
    pub voice: String,
    /// True when the primary voice failed and a fallback produced the clip.
    pub degraded: bool,
    pub created_at: DateTime<Utc>,
}

/// How long clips are kept and how many at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub ttl: Duration,
    pub max_artifacts: usize,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600),
            max_artifacts: 512,
        }
    }
}

#[derive(Debug, Default)]
pub struct ArtifactStore {
    entries: DashMap<String, AudioArtifact>,
    policy: RetentionPolicy,
}

impl ArtifactStore {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            entries: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// Store a clip under a fresh identifier. Evicts the oldest clip when full.
    pub fn insert(&self, bytes: Vec<u8>, voice: &str, degraded: bool) -> ArtifactId {
        self.insert_at(bytes, voice, degraded, Utc::now())
    }

    fn insert_at(&self, bytes: Vec<u8>, voice: &str, degraded: bool, now: DateTime<Utc>) -> ArtifactId {
        if self.policy.max_artifacts > 0 {
            while self.entries.len() >= self.policy.max_artifacts {
                if !self.evict_oldest() {
                    break;
                }
            }
        }

        let id = ArtifactId::generate();
        let artifact = AudioArtifact {
            id: id.clone(),
            bytes: Arc::from(bytes),
            voice: voice.to_string(),
            degraded,
            created_at: now,
        };
        debug!(target: "shevanta::store", id = %id, bytes = artifact.bytes.len(), voice, "artifact stored");
        self.entries.insert(id.0.clone(), artifact);
        id
    }

    fn evict_oldest(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().created_at)
            .map(|e| e.key().clone());
        match oldest {
            Some(key) => {
                debug!(target: "shevanta::store", id = %key, "capacity reached, evicting oldest artifact");
                self.entries.remove(&key).is_some()
            }
            None => false,
        }
    }

    fn is_expired(&self, artifact: &AudioArtifact, now: DateTime<Utc>) -> bool {
        // A TTL past the representable range never expires.
        chrono::Duration::from_std(self.policy.ttl)
            .ok()
            .and_then(|ttl| artifact.created_at.checked_add_signed(ttl))
            .map_or(false, |expires| expires <= now)
    }

    /// Look up a clip; unknown and expired identifiers both yield `None`.
    pub fn get(&self, id: &str) -> Option<AudioArtifact> {
        self.get_at(id, Utc::now())
    }

    fn get_at(&self, id: &str, now: DateTime<Utc>) -> Option<AudioArtifact> {
        let entry = self.entries.get(id)?;
        if self.is_expired(entry.value(), now) {
            return None;
        }
        Some(entry.value().clone())
    }

    pub fn remove(&self, id: &str) -> Option<AudioArtifact> {
        self.entries.remove(id).map(|(_, a)| a)
    }

    /// Drop every clip older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, artifact| !self.is_expired(artifact, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            info!(target: "shevanta::store", removed, remaining = self.entries.len(), "expired artifacts swept");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl_secs: u64, max: usize) -> ArtifactStore {
        ArtifactStore::new(RetentionPolicy {
            ttl: Duration::from_secs(ttl_secs),
            max_artifacts: max,
        })
    }

    #[test]
    fn ids_look_like_wav_filenames() {
        let id = ArtifactId::generate();
        assert!(id.as_str().ends_with(".wav"));
        assert_eq!(id.as_str().len(), 36);
        assert_ne!(id, ArtifactId::generate());
    }

    #[test]
    fn insert_then_get_many_times() {
        let s = store(60, 8);
        let id = s.insert(vec![1, 2, 3], "placeholder", true);
        for _ in 0..3 {
            let a = s.get(id.as_str()).unwrap();
            assert_eq!(&*a.bytes, &[1, 2, 3]);
            assert_eq!(a.voice, "placeholder");
            assert!(a.degraded);
        }
        assert!(s.get("never-produced.wav").is_none());
    }

    #[test]
    fn expired_artifacts_are_hidden_and_swept() {
        let s = store(60, 8);
        let t0 = Utc::now();
        let old = s.insert_at(vec![0], "a", false, t0 - chrono::Duration::seconds(120));
        let fresh = s.insert_at(vec![1], "a", false, t0);

        assert!(s.get_at(old.as_str(), t0).is_none());
        assert!(s.get_at(fresh.as_str(), t0).is_some());
        assert_eq!(s.len(), 2);

        assert_eq!(s.sweep_expired_at(t0), 1);
        assert_eq!(s.len(), 1);
        assert_eq!(s.sweep_expired_at(t0 + chrono::Duration::seconds(61)), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let s = store(3600, 2);
        let t0 = Utc::now();
        let first = s.insert_at(vec![0], "a", false, t0);
        let second = s.insert_at(vec![1], "a", false, t0 + chrono::Duration::seconds(1));
        let third = s.insert_at(vec![2], "a", false, t0 + chrono::Duration::seconds(2));

        assert_eq!(s.len(), 2);
        assert!(s.get_at(first.as_str(), t0).is_none());
        assert!(s.get_at(second.as_str(), t0).is_some());
        assert!(s.get_at(third.as_str(), t0).is_some());
    }

    #[test]
    fn huge_ttl_never_expires() {
        let s = store(100_000_000_000_000, 4);
        let t0 = Utc::now();
        let id = s.insert_at(vec![7], "a", false, t0);
        assert!(s.get_at(id.as_str(), t0 + chrono::Duration::days(365)).is_some());
        assert!(s.get(id.as_str()).is_some());
        assert_eq!(s.sweep_expired(), 0);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn remove_returns_artifact() {
        let s = store(60, 0);
        let id = s.insert(vec![9], "a", false);
        assert_eq!(s.remove(id.as_str()).map(|a| a.id), Some(id.clone()));
        assert!(s.get(id.as_str()).is_none());
    }
}
