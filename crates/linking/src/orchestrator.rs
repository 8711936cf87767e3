//! Event-driven coordination of product-media linking.
//!
//! The orchestrator is the only component that sees both sides of the
//! house. It consumes their integration events, resolves filename keys
//! against the catalog, and records outcomes through the ports. Every
//! handler is idempotent: redelivered events find the work already done
//! and leave state as it is.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use mdm_core::{Ean, MediaId, Sku};
use mdm_dam::{LinkStatus, ParsedFileKey};
use mdm_events::{LinkFailureReason, MdmEvent};

use crate::link::ProductMediaLink;
use crate::pending::PendingResolution;
use crate::policy::LinkRetryPolicy;
use crate::ports::{
    EventPublisher, InsertOutcome, LinkStore, MediaSink, PendingStore, PortError, ProductLookup,
};
use crate::resolver::{LinkOutcome, LinkResolver, UnmatchedReason};

/// Coordinates resolution between ingested media and the product catalog.
///
/// Owns the retry ledger: assets that cannot resolve yet are parked in the
/// [`PendingStore`] and woken either by a `ProductUpserted` event for their
/// EAN or by the periodic [`expire_overdue`](Self::expire_overdue) sweep.
pub struct MdmOrchestrator {
    resolver: LinkResolver<Arc<dyn ProductLookup>>,
    media: Arc<dyn MediaSink>,
    links: Arc<dyn LinkStore>,
    pending: Arc<dyn PendingStore>,
    publisher: Arc<dyn EventPublisher>,
    policy: LinkRetryPolicy,
}

impl MdmOrchestrator {
    pub fn new(
        products: Arc<dyn ProductLookup>,
        media: Arc<dyn MediaSink>,
        links: Arc<dyn LinkStore>,
        pending: Arc<dyn PendingStore>,
        publisher: Arc<dyn EventPublisher>,
        policy: LinkRetryPolicy,
    ) -> Self {
        Self {
            resolver: LinkResolver::new(products),
            media,
            links,
            pending,
            publisher,
            policy,
        }
    }

    /// Reacts to one integration event. Events the orchestrator does not
    /// coordinate on are ignored.
    pub fn handle(&self, event: &MdmEvent, now: DateTime<Utc>) -> Result<(), PortError> {
        match event {
            MdmEvent::MediaIngested {
                media,
                ean,
                sku,
                tag,
                extension,
                ..
            } => {
                let key = ParsedFileKey {
                    ean: ean.clone(),
                    sku: sku.clone(),
                    tag: tag.clone(),
                    extension: extension.clone(),
                };
                self.resolve_media(media, key, now)
            }
            MdmEvent::ProductUpserted { ean, .. } => self.product_upserted(ean, now),
            _ => Ok(()),
        }
    }

    /// First resolution attempt for a freshly ingested asset.
    pub fn resolve_media(
        &self,
        media: &MediaId,
        key: ParsedFileKey,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        if let Some(link) = self.links.get(media)? {
            debug!(media = %media, ean = %link.ean, "already linked, ignoring redelivery");
            return self.reassert_link(media, link);
        }

        match self.resolver.resolve(&key)? {
            LinkOutcome::Linked { ean, sku } => self.finalize(media, ean, sku, now),
            LinkOutcome::Ambiguous { candidates } => {
                self.fail_terminal(media, LinkFailureReason::AmbiguousEan { candidates }, now)
            }
            LinkOutcome::Unmatched {
                reason: UnmatchedReason::NoEanToken,
            } => self.fail_terminal(media, LinkFailureReason::NoEanToken, now),
            LinkOutcome::Unmatched {
                reason:
                    UnmatchedReason::ProductNotFound { ean }
                    | UnmatchedReason::ArticleNotFound { ean, .. },
            } => self.pend(media, ean, key, now),
        }
    }

    /// A product changed: wake every asset parked on its EAN and try again.
    pub fn product_upserted(&self, ean: &Ean, now: DateTime<Utc>) -> Result<(), PortError> {
        let woken = self.pending.take_for_ean(ean)?;
        if woken.is_empty() {
            return Ok(());
        }
        debug!(ean = %ean, count = woken.len(), "product change woke parked assets");

        for (i, entry) in woken.iter().enumerate() {
            if let Err(err) = self.retry(entry.clone(), now) {
                // Park the unprocessed remainder again so nothing is lost.
                for rest in &woken[i..] {
                    self.pending.upsert(rest.clone())?;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Sweeps the pending ledger and settles every entry whose horizon has
    /// passed. An entry whose link already landed is healed back to `Linked`;
    /// the rest fail terminally. Returns how many entries were settled.
    pub fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize, PortError> {
        let overdue = self.pending.take_expired(self.policy.expiry_cutoff(now))?;
        for (i, entry) in overdue.iter().enumerate() {
            let settled = match self.links.get(&entry.media) {
                Ok(Some(link)) => self.reassert_link(&entry.media, link),
                Ok(None) => self.fail_terminal(
                    &entry.media,
                    LinkFailureReason::RetryHorizonExhausted {
                        attempts: entry.attempts,
                    },
                    now,
                ),
                Err(err) => Err(err),
            };
            if let Err(err) = settled {
                for rest in &overdue[i..] {
                    self.pending.upsert(rest.clone())?;
                }
                return Err(err);
            }
        }
        Ok(overdue.len())
    }

    /// Parked assets, oldest attempt first. For operational inspection.
    pub fn parked(&self) -> Result<Vec<PendingResolution>, PortError> {
        let mut entries = self.pending.snapshot()?;
        entries.sort_by_key(|p| p.first_attempted_at);
        Ok(entries)
    }

    /// One woken retry. Resolution runs before any budget check, so a key
    /// that can resolve now always links even on the final attempt.
    fn retry(&self, mut entry: PendingResolution, now: DateTime<Utc>) -> Result<(), PortError> {
        if let Some(link) = self.links.get(&entry.media)? {
            debug!(media = %entry.media, ean = %link.ean, "link already recorded, re-asserting");
            return self.reassert_link(&entry.media, link);
        }

        match self.resolver.resolve(&entry.key)? {
            LinkOutcome::Linked { ean, sku } => self.finalize(&entry.media, ean, sku, now),
            LinkOutcome::Ambiguous { candidates } => self.fail_terminal(
                &entry.media,
                LinkFailureReason::AmbiguousEan { candidates },
                now,
            ),
            LinkOutcome::Unmatched {
                reason: UnmatchedReason::NoEanToken,
            } => self.fail_terminal(&entry.media, LinkFailureReason::NoEanToken, now),
            LinkOutcome::Unmatched { .. } => {
                entry.mark_attempt(now);
                self.park_or_exhaust(entry, now)
            }
        }
    }

    /// First failure for an asset: open (or refresh) its pending entry.
    fn pend(
        &self,
        media: &MediaId,
        ean: Ean,
        key: ParsedFileKey,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let entry = match self.pending.get(media)? {
            Some(mut existing) => {
                existing.mark_attempt(now);
                existing
            }
            None => PendingResolution::new(media.clone(), ean, key, now),
        };
        self.park_or_exhaust(entry, now)
    }

    fn park_or_exhaust(
        &self,
        entry: PendingResolution,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        if self.policy.should_retry(entry.attempts) && !self.policy.expired(&entry, now) {
            debug!(
                media = %entry.media,
                ean = %entry.ean,
                attempts = entry.attempts,
                "parked for retry"
            );
            self.pending.upsert(entry)
        } else {
            let reason = LinkFailureReason::RetryHorizonExhausted {
                attempts: entry.attempts,
            };
            self.fail_terminal(&entry.media, reason, now)
        }
    }

    /// Records a resolved link. The put-if-absent insert is the idempotence
    /// anchor: only the insertion winner updates status and publishes.
    fn finalize(
        &self,
        media: &MediaId,
        ean: Ean,
        sku: Option<Sku>,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let link = ProductMediaLink::new(media.clone(), ean.clone(), sku.clone(), now);
        match self.links.insert(link)? {
            InsertOutcome::Inserted => {
                self.media.update_link_status(
                    media,
                    LinkStatus::Linked {
                        ean: ean.clone(),
                        sku: sku.clone(),
                    },
                )?;
                self.pending.remove(media)?;
                info!(media = %media, ean = %ean, sku = ?sku, "media linked");
                self.publisher.publish(MdmEvent::MediaLinked {
                    media: media.clone(),
                    ean,
                    sku,
                    occurred_at: now,
                })
            }
            InsertOutcome::AlreadyLinked(existing) => {
                debug!(media = %media, ean = %existing.ean, "link already recorded");
                Ok(())
            }
        }
    }

    /// Completes a finalize that was cut short. The stored link is
    /// authoritative once inserted: re-assert its terminal status and drop
    /// any pending marker, never resolve or fail the asset again.
    fn reassert_link(&self, media: &MediaId, link: ProductMediaLink) -> Result<(), PortError> {
        self.media.update_link_status(
            media,
            LinkStatus::Linked {
                ean: link.ean,
                sku: link.sku,
            },
        )?;
        self.pending.remove(media)
    }

    /// Marks an asset as unresolvable and closes its pending entry.
    fn fail_terminal(
        &self,
        media: &MediaId,
        reason: LinkFailureReason,
        now: DateTime<Utc>,
    ) -> Result<(), PortError> {
        let status = match &reason {
            LinkFailureReason::AmbiguousEan { .. } => LinkStatus::Ambiguous,
            _ => LinkStatus::Failed,
        };
        self.media.update_link_status(media, status)?;
        self.pending.remove(media)?;
        warn!(media = %media, %reason, "media link failed");
        self.publisher.publish(MdmEvent::MediaLinkFailed {
            media: media.clone(),
            reason,
            occurred_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{Duration, TimeZone};

    use super::*;

    #[derive(Default)]
    struct StubCatalog {
        claims: Mutex<HashMap<Ean, u32>>,
        articles: Mutex<Vec<(Ean, Sku)>>,
    }

    impl StubCatalog {
        fn add_product(&self, ean: &str) {
            let mut claims = self.claims.lock().unwrap();
            *claims.entry(Ean::new(ean).unwrap()).or_insert(0) += 1;
        }

        fn add_article(&self, ean: &str, sku: &str) {
            self.articles
                .lock()
                .unwrap()
                .push((Ean::new(ean).unwrap(), Sku::new(sku).unwrap()));
        }
    }

    impl ProductLookup for StubCatalog {
        fn products_with_ean(&self, ean: &Ean) -> Result<Vec<Ean>, PortError> {
            let n = self.claims.lock().unwrap().get(ean).copied().unwrap_or(0);
            Ok(std::iter::repeat_n(ean.clone(), n as usize).collect())
        }

        fn has_article(&self, owner: &Ean, sku: &Sku) -> Result<bool, PortError> {
            Ok(self
                .articles
                .lock()
                .unwrap()
                .iter()
                .any(|(e, s)| e == owner && s == sku))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        statuses: Mutex<HashMap<MediaId, LinkStatus>>,
        failures: Mutex<u32>,
    }

    impl RecordingSink {
        fn status_of(&self, media: &MediaId) -> Option<LinkStatus> {
            self.statuses.lock().unwrap().get(media).cloned()
        }

        fn fail_next_updates(&self, n: u32) {
            *self.failures.lock().unwrap() = n;
        }
    }

    impl MediaSink for RecordingSink {
        fn update_link_status(&self, media: &MediaId, status: LinkStatus) -> Result<(), PortError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(PortError::Timeout);
            }
            self.statuses.lock().unwrap().insert(media.clone(), status);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryLinks {
        inner: Mutex<HashMap<MediaId, ProductMediaLink>>,
    }

    impl LinkStore for MemoryLinks {
        fn get(&self, media: &MediaId) -> Result<Option<ProductMediaLink>, PortError> {
            Ok(self.inner.lock().unwrap().get(media).cloned())
        }

        fn insert(&self, link: ProductMediaLink) -> Result<InsertOutcome, PortError> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(existing) = inner.get(&link.media) {
                return Ok(InsertOutcome::AlreadyLinked(existing.clone()));
            }
            inner.insert(link.media.clone(), link);
            Ok(InsertOutcome::Inserted)
        }
    }

    #[derive(Default)]
    struct MemoryPending {
        inner: Mutex<HashMap<MediaId, PendingResolution>>,
    }

    impl PendingStore for MemoryPending {
        fn get(&self, media: &MediaId) -> Result<Option<PendingResolution>, PortError> {
            Ok(self.inner.lock().unwrap().get(media).cloned())
        }

        fn upsert(&self, pending: PendingResolution) -> Result<(), PortError> {
            self.inner
                .lock()
                .unwrap()
                .insert(pending.media.clone(), pending);
            Ok(())
        }

        fn remove(&self, media: &MediaId) -> Result<(), PortError> {
            self.inner.lock().unwrap().remove(media);
            Ok(())
        }

        fn take_for_ean(&self, ean: &Ean) -> Result<Vec<PendingResolution>, PortError> {
            let mut inner = self.inner.lock().unwrap();
            let ids: Vec<MediaId> = inner
                .values()
                .filter(|p| &p.ean == ean)
                .map(|p| p.media.clone())
                .collect();
            Ok(ids.into_iter().filter_map(|id| inner.remove(&id)).collect())
        }

        fn take_expired(
            &self,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<PendingResolution>, PortError> {
            let mut inner = self.inner.lock().unwrap();
            let ids: Vec<MediaId> = inner
                .values()
                .filter(|p| p.first_attempted_at <= cutoff)
                .map(|p| p.media.clone())
                .collect();
            Ok(ids.into_iter().filter_map(|id| inner.remove(&id)).collect())
        }

        fn snapshot(&self) -> Result<Vec<PendingResolution>, PortError> {
            Ok(self.inner.lock().unwrap().values().cloned().collect())
        }
    }

    #[derive(Default)]
    struct CapturedEvents {
        events: Mutex<Vec<MdmEvent>>,
    }

    impl CapturedEvents {
        fn all(&self) -> Vec<MdmEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl EventPublisher for CapturedEvents {
        fn publish(&self, event: MdmEvent) -> Result<(), PortError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct Harness {
        catalog: Arc<StubCatalog>,
        sink: Arc<RecordingSink>,
        links: Arc<MemoryLinks>,
        pending: Arc<MemoryPending>,
        published: Arc<CapturedEvents>,
        orchestrator: MdmOrchestrator,
    }

    fn harness(policy: LinkRetryPolicy) -> Harness {
        let catalog = Arc::new(StubCatalog::default());
        let sink = Arc::new(RecordingSink::default());
        let links = Arc::new(MemoryLinks::default());
        let pending = Arc::new(MemoryPending::default());
        let published = Arc::new(CapturedEvents::default());
        let orchestrator = MdmOrchestrator::new(
            catalog.clone(),
            sink.clone(),
            links.clone(),
            pending.clone(),
            published.clone(),
            policy,
        );
        Harness {
            catalog,
            sink,
            links,
            pending,
            published,
            orchestrator,
        }
    }

    fn mid(n: u8) -> MediaId {
        MediaId::new(format!("{n:064x}")).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    fn ingested(media: &MediaId, filename: &str) -> MdmEvent {
        let key = ParsedFileKey::parse(filename);
        MdmEvent::MediaIngested {
            media: media.clone(),
            filename: filename.to_string(),
            ean: key.ean,
            sku: key.sku,
            tag: key.tag,
            extension: key.extension,
            occurred_at: t0(),
        }
    }

    fn upserted(ean: &str) -> MdmEvent {
        MdmEvent::ProductUpserted {
            ean: Ean::new(ean).unwrap(),
            typology: "electronics@1".parse().unwrap(),
            revision: 1,
            occurred_at: t0(),
        }
    }

    fn linked_events(events: &[MdmEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, MdmEvent::MediaLinked { .. }))
            .count()
    }

    #[test]
    fn known_product_links_immediately() {
        let h = harness(LinkRetryPolicy::default());
        h.catalog.add_product("4006381333931");
        let media = mid(1);

        h.orchestrator
            .handle(&ingested(&media, "EAN4006381333931_front.jpg"), t0())
            .unwrap();

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("4006381333931").unwrap(),
                sku: None,
            })
        );
        assert!(h.links.get(&media).unwrap().is_some());
        assert!(h.pending.get(&media).unwrap().is_none());
        assert_eq!(linked_events(&h.published.all()), 1);
    }

    #[test]
    fn registered_sku_links_at_article_level() {
        let h = harness(LinkRetryPolicy::default());
        h.catalog.add_product("42");
        h.catalog.add_article("42", "A7");
        let media = mid(2);

        h.orchestrator
            .handle(&ingested(&media, "EAN42_SKUA7_side.jpg"), t0())
            .unwrap();

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("42").unwrap(),
                sku: Some(Sku::new("A7").unwrap()),
            })
        );
    }

    #[test]
    fn unknown_product_parks_the_asset() {
        let h = harness(LinkRetryPolicy::default());
        let media = mid(3);

        h.orchestrator
            .handle(&ingested(&media, "EAN42_front.jpg"), t0())
            .unwrap();

        let entry = h.pending.get(&media).unwrap().unwrap();
        assert_eq!(entry.attempts, 1);
        assert_eq!(entry.ean, Ean::new("42").unwrap());
        assert_eq!(h.sink.status_of(&media), None);
        assert!(h.published.all().is_empty());
    }

    #[test]
    fn product_upserted_wakes_and_links_parked_assets() {
        let h = harness(LinkRetryPolicy::default());
        let media = mid(4);
        h.orchestrator
            .handle(&ingested(&media, "EAN42_front.jpg"), t0())
            .unwrap();

        h.catalog.add_product("42");
        h.orchestrator.handle(&upserted("42"), t0()).unwrap();

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("42").unwrap(),
                sku: None,
            })
        );
        assert!(h.pending.get(&media).unwrap().is_none());
        assert_eq!(linked_events(&h.published.all()), 1);
    }

    #[test]
    fn missing_article_waits_until_it_is_registered() {
        let h = harness(LinkRetryPolicy::default());
        h.catalog.add_product("42");
        let media = mid(5);

        h.orchestrator
            .handle(&ingested(&media, "EAN42_SKUB9.jpg"), t0())
            .unwrap();
        assert!(h.pending.get(&media).unwrap().is_some());

        h.catalog.add_article("42", "B9");
        h.orchestrator.handle(&upserted("42"), t0()).unwrap();

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("42").unwrap(),
                sku: Some(Sku::new("B9").unwrap()),
            })
        );
    }

    #[test]
    fn no_ean_token_fails_immediately() {
        let h = harness(LinkRetryPolicy::default());
        let media = mid(6);

        h.orchestrator
            .handle(&ingested(&media, "banner_spring.jpg"), t0())
            .unwrap();

        assert_eq!(h.sink.status_of(&media), Some(LinkStatus::Failed));
        assert!(h.pending.get(&media).unwrap().is_none());
        match h.published.all().as_slice() {
            [MdmEvent::MediaLinkFailed { reason, .. }] => {
                assert_eq!(reason, &LinkFailureReason::NoEanToken);
            }
            other => panic!("Expected one MediaLinkFailed, got {other:?}"),
        }
    }

    #[test]
    fn ambiguous_ean_fails_terminally() {
        let h = harness(LinkRetryPolicy::default());
        h.catalog.add_product("42");
        h.catalog.add_product("42");
        let media = mid(7);

        h.orchestrator
            .handle(&ingested(&media, "EAN42.jpg"), t0())
            .unwrap();

        assert_eq!(h.sink.status_of(&media), Some(LinkStatus::Ambiguous));
        match h.published.all().as_slice() {
            [MdmEvent::MediaLinkFailed { reason, .. }] => match reason {
                LinkFailureReason::AmbiguousEan { candidates } => {
                    assert_eq!(candidates.len(), 2);
                }
                other => panic!("Expected AmbiguousEan, got {other:?}"),
            },
            other => panic!("Expected one MediaLinkFailed, got {other:?}"),
        }
    }

    #[test]
    fn redelivered_ingestion_changes_nothing() {
        let h = harness(LinkRetryPolicy::default());
        h.catalog.add_product("42");
        let media = mid(8);
        let event = ingested(&media, "EAN42.jpg");

        h.orchestrator.handle(&event, t0()).unwrap();
        h.orchestrator.handle(&event, t0()).unwrap();

        assert_eq!(linked_events(&h.published.all()), 1);
        assert_eq!(h.links.inner.lock().unwrap().len(), 1);
    }

    #[test]
    fn renewed_failures_spend_the_attempt_budget() {
        let policy = LinkRetryPolicy {
            max_attempts: 3,
            horizon: std::time::Duration::from_secs(86_400),
        };
        let h = harness(policy);
        h.catalog.add_product("42");
        let media = mid(9);

        // SKU never registered: every wake re-fails.
        h.orchestrator
            .handle(&ingested(&media, "EAN42_SKUZZ.jpg"), t0())
            .unwrap();
        assert_eq!(h.pending.get(&media).unwrap().unwrap().attempts, 1);

        h.orchestrator.handle(&upserted("42"), t0()).unwrap();
        assert_eq!(h.pending.get(&media).unwrap().unwrap().attempts, 2);

        h.orchestrator.handle(&upserted("42"), t0()).unwrap();

        assert!(h.pending.get(&media).unwrap().is_none());
        assert_eq!(h.sink.status_of(&media), Some(LinkStatus::Failed));
        match h.published.all().as_slice() {
            [MdmEvent::MediaLinkFailed { reason, .. }] => {
                assert_eq!(
                    reason,
                    &LinkFailureReason::RetryHorizonExhausted { attempts: 3 }
                );
            }
            other => panic!("Expected one MediaLinkFailed, got {other:?}"),
        }
    }

    #[test]
    fn sweeper_expires_assets_past_the_horizon() {
        let policy = LinkRetryPolicy {
            max_attempts: 10,
            horizon: std::time::Duration::from_secs(3600),
        };
        let h = harness(policy);
        let media = mid(10);
        h.orchestrator
            .handle(&ingested(&media, "EAN42.jpg"), t0())
            .unwrap();

        let before = t0() + Duration::minutes(59);
        assert_eq!(h.orchestrator.expire_overdue(before).unwrap(), 0);

        let after = t0() + Duration::minutes(61);
        assert_eq!(h.orchestrator.expire_overdue(after).unwrap(), 1);
        assert_eq!(h.sink.status_of(&media), Some(LinkStatus::Failed));
        assert!(h.pending.get(&media).unwrap().is_none());
        match h.published.all().as_slice() {
            [MdmEvent::MediaLinkFailed { reason, .. }] => {
                assert_eq!(
                    reason,
                    &LinkFailureReason::RetryHorizonExhausted { attempts: 1 }
                );
            }
            other => panic!("Expected one MediaLinkFailed, got {other:?}"),
        }
    }

    #[test]
    fn late_wake_still_links_when_resolution_succeeds() {
        let policy = LinkRetryPolicy {
            max_attempts: 2,
            horizon: std::time::Duration::from_secs(3600),
        };
        let h = harness(policy);
        let media = mid(11);
        h.orchestrator
            .handle(&ingested(&media, "EAN42.jpg"), t0())
            .unwrap();

        // Wake arrives past the horizon, but the product now exists;
        // resolution runs before the budget check.
        h.catalog.add_product("42");
        let late = t0() + Duration::hours(2);
        h.orchestrator.handle(&upserted("42"), late).unwrap();

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("42").unwrap(),
                sku: None,
            })
        );
    }

    #[test]
    fn wake_after_partial_finalize_heals_the_stored_status() {
        let h = harness(LinkRetryPolicy::default());
        let media = mid(14);
        h.orchestrator
            .handle(&ingested(&media, "EAN42_front.jpg"), t0())
            .unwrap();

        // The wake records the link, then the status write fails; the
        // entry goes back to the ledger with the link already in place.
        h.catalog.add_product("42");
        h.sink.fail_next_updates(1);
        let err = h.orchestrator.handle(&upserted("42"), t0()).unwrap_err();
        assert_eq!(err, PortError::Timeout);
        assert!(h.links.get(&media).unwrap().is_some());
        assert_eq!(h.sink.status_of(&media), None);
        assert!(h.pending.get(&media).unwrap().is_some());

        // The next wake finishes the cut-short finalize from the stored
        // link instead of dropping the entry.
        h.orchestrator.handle(&upserted("42"), t0()).unwrap();

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("42").unwrap(),
                sku: None,
            })
        );
        assert!(h.pending.get(&media).unwrap().is_none());
        assert!(
            h.published
                .all()
                .iter()
                .all(|e| !matches!(e, MdmEvent::MediaLinkFailed { .. }))
        );
    }

    #[test]
    fn sweeper_heals_a_recorded_link_instead_of_failing_it() {
        let policy = LinkRetryPolicy {
            max_attempts: 10,
            horizon: std::time::Duration::from_secs(3600),
        };
        let h = harness(policy);
        let media = mid(15);
        h.orchestrator
            .handle(&ingested(&media, "EAN42.jpg"), t0())
            .unwrap();

        h.catalog.add_product("42");
        h.sink.fail_next_updates(1);
        h.orchestrator.handle(&upserted("42"), t0()).unwrap_err();
        assert!(h.links.get(&media).unwrap().is_some());

        // Past the horizon the sweeper drains the entry, but the link store
        // already holds the row: the asset must come out Linked, not Failed.
        let late = t0() + Duration::hours(25);
        assert_eq!(h.orchestrator.expire_overdue(late).unwrap(), 1);

        assert_eq!(
            h.sink.status_of(&media),
            Some(LinkStatus::Linked {
                ean: Ean::new("42").unwrap(),
                sku: None,
            })
        );
        assert!(h.pending.get(&media).unwrap().is_none());
        assert!(
            h.published
                .all()
                .iter()
                .all(|e| !matches!(e, MdmEvent::MediaLinkFailed { .. }))
        );
    }

    #[test]
    fn sweeper_reparks_unsettled_entries_when_a_port_fails() {
        let policy = LinkRetryPolicy {
            max_attempts: 10,
            horizon: std::time::Duration::from_secs(3600),
        };
        let h = harness(policy);
        let a = mid(16);
        let b = mid(17);
        h.orchestrator
            .handle(&ingested(&a, "EAN1.jpg"), t0())
            .unwrap();
        h.orchestrator
            .handle(&ingested(&b, "EAN2.jpg"), t0())
            .unwrap();

        h.sink.fail_next_updates(1);
        let late = t0() + Duration::hours(2);
        h.orchestrator.expire_overdue(late).unwrap_err();

        // Nothing was lost: the failed entry and the remainder are parked
        // again and the next sweep settles them all.
        assert_eq!(h.orchestrator.parked().unwrap().len(), 2);
        assert_eq!(h.orchestrator.expire_overdue(late).unwrap(), 2);
        assert_eq!(h.sink.status_of(&a), Some(LinkStatus::Failed));
        assert_eq!(h.sink.status_of(&b), Some(LinkStatus::Failed));
    }

    #[test]
    fn unrelated_events_are_ignored() {
        let h = harness(LinkRetryPolicy::default());
        let event = MdmEvent::TypologyPublished {
            id: "electronics".parse().unwrap(),
            version: mdm_core::SchemaVersion::FIRST,
            occurred_at: t0(),
        };
        h.orchestrator.handle(&event, t0()).unwrap();
        assert!(h.published.all().is_empty());
    }

    #[test]
    fn parked_lists_oldest_first() {
        let h = harness(LinkRetryPolicy::default());
        let a = mid(12);
        let b = mid(13);
        h.orchestrator
            .handle(&ingested(&a, "EAN1.jpg"), t0())
            .unwrap();
        h.orchestrator
            .handle(&ingested(&b, "EAN2.jpg"), t0() - Duration::minutes(5))
            .unwrap();

        let parked = h.orchestrator.parked().unwrap();
        assert_eq!(parked.len(), 2);
        assert_eq!(parked[0].media, b);
        assert_eq!(parked[1].media, a);
    }
}
