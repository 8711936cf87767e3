//! In-memory backends for the orchestrator-owned link and pending ports.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use mdm_core::{Ean, MediaId};
use mdm_linking::{
    InsertOutcome, LinkStore, PendingResolution, PendingStore, PortError, ProductMediaLink,
};

#[derive(Debug, Default)]
pub struct InMemoryLinkStore {
    links: RwLock<HashMap<MediaId, ProductMediaLink>>,
}

impl InMemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinkStore for InMemoryLinkStore {
    fn get(&self, media: &MediaId) -> Result<Option<ProductMediaLink>, PortError> {
        let links = self.links.read().unwrap_or_else(PoisonError::into_inner);
        Ok(links.get(media).cloned())
    }

    fn insert(&self, link: ProductMediaLink) -> Result<InsertOutcome, PortError> {
        let mut links = self.links.write().unwrap_or_else(PoisonError::into_inner);
        match links.get(&link.media) {
            Some(existing) => Ok(InsertOutcome::AlreadyLinked(existing.clone())),
            None => {
                links.insert(link.media.clone(), link);
                Ok(InsertOutcome::Inserted)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    pending: RwLock<HashMap<MediaId, PendingResolution>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn drain_where(
        &self,
        mut keep: impl FnMut(&PendingResolution) -> bool,
    ) -> Vec<PendingResolution> {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        let taken: Vec<MediaId> = pending
            .iter()
            .filter(|(_, entry)| !keep(entry))
            .map(|(media, _)| media.clone())
            .collect();
        let mut drained: Vec<PendingResolution> = taken
            .iter()
            .filter_map(|media| pending.remove(media))
            .collect();
        drained.sort_by_key(|entry| entry.first_attempted_at);
        drained
    }
}

impl PendingStore for InMemoryPendingStore {
    fn get(&self, media: &MediaId) -> Result<Option<PendingResolution>, PortError> {
        let pending = self.pending.read().unwrap_or_else(PoisonError::into_inner);
        Ok(pending.get(media).cloned())
    }

    fn upsert(&self, entry: PendingResolution) -> Result<(), PortError> {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        pending.insert(entry.media.clone(), entry);
        Ok(())
    }

    fn remove(&self, media: &MediaId) -> Result<(), PortError> {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        pending.remove(media);
        Ok(())
    }

    fn take_for_ean(&self, ean: &Ean) -> Result<Vec<PendingResolution>, PortError> {
        Ok(self.drain_where(|entry| entry.ean != *ean))
    }

    fn take_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<PendingResolution>, PortError> {
        Ok(self.drain_where(|entry| entry.first_attempted_at > cutoff))
    }

    fn snapshot(&self) -> Result<Vec<PendingResolution>, PortError> {
        let pending = self.pending.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<PendingResolution> = pending.values().cloned().collect();
        entries.sort_by_key(|entry| entry.first_attempted_at);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use mdm_core::Sku;
    use mdm_dam::ParsedFileKey;

    use super::*;

    fn media_id(n: u8) -> MediaId {
        MediaId::new(format!("{n:064x}")).unwrap()
    }

    fn entry(n: u8, ean: &str, at: DateTime<Utc>) -> PendingResolution {
        let ean = Ean::new(ean).unwrap();
        let key = ParsedFileKey {
            ean: Some(ean.clone()),
            sku: None,
            tag: None,
            extension: Some("jpg".to_string()),
        };
        PendingResolution::new(media_id(n), ean, key, at)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn insert_is_put_if_absent() {
        let store = InMemoryLinkStore::new();
        let first = ProductMediaLink::new(
            media_id(1),
            Ean::new("4006381333931").unwrap(),
            None,
            t0(),
        );
        let second = ProductMediaLink::new(
            media_id(1),
            Ean::new("9990000000000").unwrap(),
            Some(Sku::new("X1").unwrap()),
            t0() + Duration::hours(1),
        );

        assert_eq!(store.insert(first.clone()).unwrap(), InsertOutcome::Inserted);
        assert_eq!(
            store.insert(second).unwrap(),
            InsertOutcome::AlreadyLinked(first.clone())
        );
        assert_eq!(store.get(&media_id(1)).unwrap(), Some(first));
    }

    #[test]
    fn take_for_ean_drains_only_matching_markers() {
        let store = InMemoryPendingStore::new();
        store.upsert(entry(1, "4006381333931", t0())).unwrap();
        store.upsert(entry(2, "4006381333931", t0() + Duration::minutes(5))).unwrap();
        store.upsert(entry(3, "9990000000000", t0())).unwrap();

        let taken = store
            .take_for_ean(&Ean::new("4006381333931").unwrap())
            .unwrap();
        assert_eq!(taken.len(), 2);
        assert_eq!(taken[0].media, media_id(1));
        assert_eq!(taken[1].media, media_id(2));

        let rest = store.snapshot().unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].media, media_id(3));
    }

    #[test]
    fn take_expired_uses_the_first_attempt_time() {
        let store = InMemoryPendingStore::new();
        store.upsert(entry(1, "4006381333931", t0())).unwrap();
        store.upsert(entry(2, "9990000000000", t0() + Duration::hours(2))).unwrap();

        let expired = store.take_expired(t0() + Duration::hours(1)).unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].media, media_id(1));
        assert_eq!(store.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn upsert_replaces_the_marker_for_a_media() {
        let store = InMemoryPendingStore::new();
        store.upsert(entry(1, "4006381333931", t0())).unwrap();

        let mut bumped = entry(1, "4006381333931", t0());
        bumped.mark_attempt(t0() + Duration::minutes(10));
        store.upsert(bumped).unwrap();

        let stored = store.get(&media_id(1)).unwrap().unwrap();
        assert_eq!(stored.attempts, 2);
        assert_eq!(store.snapshot().unwrap().len(), 1);
    }
}
