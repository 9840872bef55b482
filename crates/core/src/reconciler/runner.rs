//! Reconciler implementation.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::analysis::{AnalysisRecord, AnalysisSource};
use crate::comment::render_comment;
use crate::config::{Config, FilterConfig, RenderConfig};
use crate::helpdesk::HelpdeskConnector;
use crate::matcher::{MatchedTicket, TicketMatcher};
use crate::metrics::{CONTACTS_EXCLUDED, RETRIES_CLEARED, RETRIES_QUEUED, SWEEPS};
use crate::retry::{RetryScan, RetryStore, RetryStoreError};
use crate::updater::TicketUpdater;

use super::{AnalysisOutcome, EventOutcome, ReconcileError, SweepReport, TriggerEvent};

/// How a single matched entry fared during a sweep.
enum SweepItem {
    Cleared,
    /// Note accepted but the store entry could not be removed.
    UpdatedNotCleared,
    /// Left pending for the next sweep.
    Failed,
}

/// Composes matcher, updater and retry store for both triggers.
pub struct Reconciler {
    matcher: TicketMatcher,
    updater: TicketUpdater,
    store: Arc<dyn RetryStore>,
    source: Arc<dyn AnalysisSource>,
    filter: FilterConfig,
    render: RenderConfig,
}

impl Reconciler {
    pub fn new(
        config: &Config,
        connector: Arc<dyn HelpdeskConnector>,
        store: Arc<dyn RetryStore>,
        source: Arc<dyn AnalysisSource>,
    ) -> Self {
        Self {
            matcher: TicketMatcher::new(
                Arc::clone(&connector),
                config.helpdesk.max_query_length,
            ),
            updater: TicketUpdater::new(connector, config.helpdesk.transcript_destination),
            store,
            source,
            filter: config.filter.clone(),
            render: config.render.clone(),
        }
    }

    /// Excluded iff the exclusion marker matched and the inclusion marker did not.
    pub fn is_excluded(&self, analysis: &AnalysisRecord) -> bool {
        let matched = |marker: &Option<String>| {
            marker
                .as_deref()
                .is_some_and(|category| analysis.has_category(category))
        };
        matched(&self.filter.exclusion_category) && !matched(&self.filter.inclusion_category)
    }

    /// Dispatch a trigger event.
    pub async fn handle_event(&self, event: &TriggerEvent) -> Result<EventOutcome, ReconcileError> {
        match event {
            TriggerEvent::ObjectCreated { document_key } => {
                let result = self.on_object_created(document_key).await?;
                Ok(EventOutcome::ObjectCreated { result })
            }
            TriggerEvent::Scheduled => {
                let result = self.sweep().await?;
                Ok(EventOutcome::Scheduled { result })
            }
        }
    }

    /// Fetch a freshly stored analysis document and reconcile it.
    pub async fn on_object_created(
        &self,
        document_key: &str,
    ) -> Result<AnalysisOutcome, ReconcileError> {
        let analysis = self.source.fetch(document_key).await?;
        let contact_id = analysis.contact_id().to_string();
        if contact_id.is_empty() {
            return Err(ReconcileError::MissingContactId(document_key.to_string()));
        }
        self.reconcile_new_analysis(&contact_id, document_key, &analysis)
            .await
    }

    /// Match a single new contact; update its ticket or queue it for retry.
    pub async fn reconcile_new_analysis(
        &self,
        contact_id: &str,
        document_key: &str,
        analysis: &AnalysisRecord,
    ) -> Result<AnalysisOutcome, ReconcileError> {
        if self.is_excluded(analysis) {
            CONTACTS_EXCLUDED.inc();
            info!(contact_id = contact_id, "Contact excluded by category");
            return Ok(AnalysisOutcome::Excluded {
                contact_id: contact_id.to_string(),
            });
        }

        let matches = self
            .matcher
            .find_tickets(&[contact_id.to_string()])
            .await
            .inspect_err(|e| error!(contact_id = contact_id, error = %e, "Cannot search tickets"))?;

        let Some(matched) = matches.into_iter().next() else {
            let stored = match self.store.put(contact_id, document_key) {
                Ok(pending) => {
                    RETRIES_QUEUED.inc();
                    info!(
                        contact_id = contact_id,
                        document_key = document_key,
                        expires_at = pending.expires_at,
                        "No ticket yet, queued for retry"
                    );
                    true
                }
                Err(e) => {
                    warn!(contact_id = contact_id, error = %e, "Failed to queue retry");
                    false
                }
            };
            return Ok(AnalysisOutcome::Deferred {
                contact_id: contact_id.to_string(),
                stored,
            });
        };

        info!(
            contact_id = contact_id,
            ticket_id = matched.ticket_id,
            "Found ticket, updating"
        );
        let comment = render_comment(analysis, &self.render);
        let report = self.updater.update_ticket(&matched, &comment).await?;
        if report.is_success() {
            self.clear_stale_entry(contact_id);
        }
        Ok(AnalysisOutcome::Updated {
            contact_id: contact_id.to_string(),
            success: report.is_success(),
            report,
        })
    }

    /// Retry every pending entry once.
    ///
    /// A failed scan counts as an empty store. Matched entries are processed
    /// concurrently and removed only after their ticket note is accepted.
    pub async fn sweep(&self) -> Result<SweepReport, ReconcileError> {
        match self.store.prune_expired() {
            Ok(0) => {}
            Ok(n) => debug!(pruned = n, "Pruned expired retry entries"),
            Err(e) => warn!(error = %e, "Failed to prune expired retry entries"),
        }

        let scan = match self.store.scan_all() {
            Ok(scan) => scan,
            Err(e) => {
                SWEEPS.with_label_values(&["failed"]).inc();
                warn!(error = %e, "Retry scan failed");
                return Ok(SweepReport::default());
            }
        };
        if scan.is_empty() {
            SWEEPS.with_label_values(&["empty"]).inc();
            debug!("No pending retries");
            return Ok(SweepReport::default());
        }
        info!(pending = scan.count, "Sweeping pending retries");

        let matches = match self.matcher.find_tickets(&scan.contact_ids).await {
            Ok(matches) => matches,
            Err(e) => {
                SWEEPS.with_label_values(&["failed"]).inc();
                error!(error = %e, "Cannot search tickets");
                return Err(e.into());
            }
        };

        let items = join_all(matches.iter().map(|m| self.retry_match(m))).await;

        let mut report = SweepReport {
            pending: scan.count,
            matched: matches.len(),
            ..SweepReport::default()
        };
        for item in items {
            match item {
                SweepItem::Cleared => {
                    report.updated += 1;
                    report.cleared += 1;
                }
                SweepItem::UpdatedNotCleared => report.updated += 1,
                SweepItem::Failed => report.failed += 1,
            }
        }

        SWEEPS.with_label_values(&["processed"]).inc();
        info!(
            pending = report.pending,
            matched = report.matched,
            updated = report.updated,
            cleared = report.cleared,
            "Sweep complete"
        );
        Ok(report)
    }

    /// Drop a pending entry left by an earlier event for a contact whose
    /// ticket was just updated, so the next sweep does not post it again.
    fn clear_stale_entry(&self, contact_id: &str) {
        match self.store.delete(contact_id) {
            Ok(true) => {
                RETRIES_CLEARED.inc();
                info!(contact_id = contact_id, "Cleared pending entry after direct update");
            }
            Ok(false) => {}
            Err(e) => warn!(contact_id = contact_id, error = %e, "Failed to clear pending entry"),
        }
    }

    /// Live pending entries.
    pub fn pending(&self) -> Result<RetryScan, RetryStoreError> {
        self.store.scan_all()
    }

    /// Update the ticket of one pending entry and clear the entry on success.
    async fn retry_match(&self, matched: &MatchedTicket) -> SweepItem {
        let contact_id = matched.contact_id.as_str();

        let document_key = match self.store.get(contact_id) {
            Ok(Some(key)) => key,
            Ok(None) => {
                debug!(contact_id = contact_id, "Retry entry vanished before update");
                return SweepItem::Failed;
            }
            Err(e) => {
                warn!(contact_id = contact_id, error = %e, "Failed to read retry entry");
                return SweepItem::Failed;
            }
        };

        let analysis = match self.source.fetch(&document_key).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!(
                    contact_id = contact_id,
                    document_key = %document_key,
                    error = %e,
                    "Failed to fetch analysis document"
                );
                return SweepItem::Failed;
            }
        };

        let comment = render_comment(&analysis, &self.render);
        let report = match self.updater.update_ticket(matched, &comment).await {
            Ok(report) => report,
            Err(e) => {
                warn!(contact_id = contact_id, error = %e, "Ticket update aborted");
                return SweepItem::Failed;
            }
        };
        if !report.is_success() {
            return SweepItem::Failed;
        }

        match self.store.delete(contact_id) {
            Ok(_) => {
                RETRIES_CLEARED.inc();
                info!(
                    contact_id = contact_id,
                    ticket_id = matched.ticket_id,
                    "Ticket updated, retry entry removed"
                );
                SweepItem::Cleared
            }
            Err(e) => {
                warn!(contact_id = contact_id, error = %e, "Failed to remove retry entry");
                SweepItem::UpdatedNotCleared
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptDestination;
    use crate::testing::{
        fixtures, MockAnalysisSource, MockConnector, MockHelpdesk, MockRetryStore, RecordedRequest,
        RecordedStoreOp,
    };

    struct Harness {
        helpdesk: Arc<MockHelpdesk>,
        connector: Arc<MockConnector>,
        store: Arc<MockRetryStore>,
        source: Arc<MockAnalysisSource>,
        reconciler: Reconciler,
    }

    fn harness_with(config: Config) -> Harness {
        let helpdesk = Arc::new(MockHelpdesk::new());
        let connector = Arc::new(MockConnector::new(Arc::clone(&helpdesk)));
        let store = Arc::new(MockRetryStore::new());
        let source = Arc::new(MockAnalysisSource::new());
        let reconciler = Reconciler::new(
            &config,
            Arc::clone(&connector) as Arc<dyn HelpdeskConnector>,
            Arc::clone(&store) as Arc<dyn RetryStore>,
            Arc::clone(&source) as Arc<dyn AnalysisSource>,
        );
        Harness {
            helpdesk,
            connector,
            store,
            source,
            reconciler,
        }
    }

    fn harness() -> Harness {
        let mut config = Config::default();
        config.filter.exclusion_category = Some("do-not-sync".to_string());
        config.filter.inclusion_category = Some("always-sync".to_string());
        harness_with(config)
    }

    #[test]
    fn test_is_excluded() {
        let h = harness();
        let r = &h.reconciler;
        assert!(!r.is_excluded(&fixtures::analysis_record("C1", &[])));
        assert!(r.is_excluded(&fixtures::analysis_record("C1", &["do-not-sync"])));
        assert!(!r.is_excluded(&fixtures::analysis_record(
            "C1",
            &["do-not-sync", "always-sync"]
        )));
        assert!(!r.is_excluded(&fixtures::analysis_record("C1", &["always-sync"])));
    }

    #[test]
    fn test_nothing_excluded_without_marker() {
        let h = harness_with(Config::default());
        assert!(!h
            .reconciler
            .is_excluded(&fixtures::analysis_record("C1", &["do-not-sync"])));
    }

    #[tokio::test]
    async fn test_excluded_contact_returns_early() {
        let h = harness();
        let analysis = fixtures::analysis_record("C9", &["do-not-sync"]);

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C9", "docs/C9.json", &analysis)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AnalysisOutcome::Excluded {
                contact_id: "C9".to_string()
            }
        );
        assert!(h.helpdesk.recorded_requests().await.is_empty());
        assert!(h.store.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn test_new_analysis_updates_matched_ticket() {
        let h = harness();
        h.helpdesk.add_ticket("C1", 101, None).await;
        let analysis = fixtures::analysis_record("C1", &[]);

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C1", "docs/C1.json", &analysis)
            .await
            .unwrap();

        match outcome {
            AnalysisOutcome::Updated {
                success, report, ..
            } => {
                assert!(success);
                assert_eq!(report.ticket_id, 101);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            h.store.recorded_ops(),
            vec![RecordedStoreOp::Delete {
                contact_id: "C1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_direct_update_clears_earlier_pending_entry() {
        let h = harness();
        h.store.put("C1", "docs/old-C1.json").unwrap();
        h.source
            .add_document("docs/old-C1.json", fixtures::analysis_record("C1", &[]))
            .await;
        h.helpdesk.add_ticket("C1", 101, None).await;

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C1", "docs/C1.json", &fixtures::analysis_record("C1", &[]))
            .await
            .unwrap();
        assert!(matches!(outcome, AnalysisOutcome::Updated { success: true, .. }));
        assert!(h.store.get("C1").unwrap().is_none());

        // the following sweep has nothing left to post
        let report = h.reconciler.sweep().await.unwrap();
        assert_eq!(report, SweepReport::default());
        let updates = h
            .helpdesk
            .recorded_requests()
            .await
            .into_iter()
            .filter(|r| matches!(r, RecordedRequest::UpdateTicket { .. }))
            .count();
        assert_eq!(updates, 1);
    }

    #[tokio::test]
    async fn test_failed_clear_after_direct_update_is_soft() {
        let h = harness();
        h.helpdesk.add_ticket("C1", 101, None).await;
        h.store.fail_writes(true);

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C1", "docs/C1.json", &fixtures::analysis_record("C1", &[]))
            .await
            .unwrap();

        assert!(matches!(outcome, AnalysisOutcome::Updated { success: true, .. }));
    }

    #[tokio::test]
    async fn test_new_analysis_reports_failed_update() {
        let h = harness();
        h.helpdesk.add_ticket("C1", 101, None).await;
        h.helpdesk.set_ticket_update_status(500).await;
        let analysis = fixtures::analysis_record("C1", &[]);

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C1", "docs/C1.json", &analysis)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            AnalysisOutcome::Updated { success: false, .. }
        ));
        assert!(h.store.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn test_unmatched_analysis_is_deferred() {
        let h = harness();
        let analysis = fixtures::analysis_record("C2", &[]);

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C2", "docs/C2.json", &analysis)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AnalysisOutcome::Deferred {
                contact_id: "C2".to_string(),
                stored: true
            }
        );
        assert_eq!(
            h.store.recorded_ops(),
            vec![RecordedStoreOp::Put {
                contact_id: "C2".to_string(),
                document_key: "docs/C2.json".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_failed_retry_write_is_soft() {
        let h = harness();
        h.store.fail_writes(true);
        let analysis = fixtures::analysis_record("C2", &[]);

        let outcome = h
            .reconciler
            .reconcile_new_analysis("C2", "docs/C2.json", &analysis)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AnalysisOutcome::Deferred {
                contact_id: "C2".to_string(),
                stored: false
            }
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_skips_store() {
        let h = harness();
        h.connector.set_connect_error(true);
        let analysis = fixtures::analysis_record("C1", &[]);

        let result = h
            .reconciler
            .reconcile_new_analysis("C1", "docs/C1.json", &analysis)
            .await;

        assert!(matches!(result, Err(ReconcileError::Helpdesk(_))));
        assert!(h.store.recorded_ops().is_empty());
    }

    #[tokio::test]
    async fn test_object_created_reads_contact_from_document() {
        let h = harness();
        h.source
            .add_document("Analysis/C3.json", fixtures::analysis_record("C3", &[]))
            .await;

        let outcome = h
            .reconciler
            .handle_event(&TriggerEvent::ObjectCreated {
                document_key: "Analysis/C3.json".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            EventOutcome::ObjectCreated {
                result: AnalysisOutcome::Deferred {
                    contact_id: "C3".to_string(),
                    stored: true
                }
            }
        );
        assert_eq!(
            h.store.get("C3").unwrap(),
            Some("Analysis/C3.json".to_string())
        );
    }

    #[tokio::test]
    async fn test_object_created_missing_document() {
        let h = harness();
        let result = h.reconciler.on_object_created("Analysis/none.json").await;
        assert!(matches!(result, Err(ReconcileError::Analysis(_))));
    }

    #[tokio::test]
    async fn test_object_created_without_contact_id() {
        let h = harness();
        h.source
            .add_document("Analysis/anon.json", AnalysisRecord::default())
            .await;
        let result = h.reconciler.on_object_created("Analysis/anon.json").await;
        assert!(matches!(result, Err(ReconcileError::MissingContactId(_))));
    }

    #[tokio::test]
    async fn test_empty_sweep_makes_no_requests() {
        let h = harness();

        let outcome = h
            .reconciler
            .handle_event(&TriggerEvent::Scheduled)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Scheduled {
                result: SweepReport::default()
            }
        );
        assert!(h.helpdesk.recorded_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_clears_updated_entry_once() {
        let h = harness();
        h.store.put("C1", "docs/C1.json").unwrap();
        h.source
            .add_document("docs/C1.json", fixtures::analysis_record("C1", &[]))
            .await;
        h.helpdesk.add_ticket("C1", 101, None).await;

        let report = h.reconciler.sweep().await.unwrap();

        assert_eq!(
            report,
            SweepReport {
                pending: 1,
                matched: 1,
                updated: 1,
                cleared: 1,
                failed: 0
            }
        );
        let deletes: Vec<_> = h
            .store
            .recorded_ops()
            .into_iter()
            .filter(|op| matches!(op, RecordedStoreOp::Delete { .. }))
            .collect();
        assert_eq!(
            deletes,
            vec![RecordedStoreOp::Delete {
                contact_id: "C1".to_string()
            }]
        );
        assert!(h.store.scan_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_keeps_failed_updates_pending() {
        let h = harness();
        h.store.put("C1", "docs/C1.json").unwrap();
        h.source
            .add_document("docs/C1.json", fixtures::analysis_record("C1", &[]))
            .await;
        h.helpdesk.add_ticket("C1", 101, None).await;
        h.helpdesk.set_ticket_update_status(429).await;

        let report = h.reconciler.sweep().await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.cleared, 0);
        assert_eq!(h.store.get("C1").unwrap(), Some("docs/C1.json".to_string()));
    }

    #[tokio::test]
    async fn test_sweep_leaves_unmatched_pending() {
        let h = harness();
        h.store.put("C1", "docs/C1.json").unwrap();
        h.store.put("C2", "docs/C2.json").unwrap();
        h.source
            .add_document("docs/C1.json", fixtures::analysis_record("C1", &[]))
            .await;
        h.helpdesk.add_ticket("C1", 101, None).await;

        let report = h.reconciler.sweep().await.unwrap();

        assert_eq!(report.pending, 2);
        assert_eq!(report.matched, 1);
        assert_eq!(report.cleared, 1);
        let scan = h.store.scan_all().unwrap();
        assert_eq!(scan.contact_ids, vec!["C2".to_string()]);
    }

    #[tokio::test]
    async fn test_sweep_skips_missing_document() {
        let h = harness();
        h.store.put("C1", "docs/C1.json").unwrap();
        h.helpdesk.add_ticket("C1", 101, None).await;

        let report = h.reconciler.sweep().await.unwrap();

        assert_eq!(report.failed, 1);
        let requests = h.helpdesk.recorded_requests().await;
        assert!(!requests
            .iter()
            .any(|r| matches!(r, RecordedRequest::UpdateTicket { .. })));
        assert!(h.store.get("C1").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sweep_with_failed_scan_is_empty() {
        let h = harness();
        h.store.put("C1", "docs/C1.json").unwrap();
        h.store.fail_reads(true);

        let report = h.reconciler.sweep().await.unwrap();

        assert_eq!(report, SweepReport::default());
        assert!(h.helpdesk.recorded_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_sweep_with_failed_delete_counts_update() {
        let h = harness();
        h.store.put("C1", "docs/C1.json").unwrap();
        h.source
            .add_document("docs/C1.json", fixtures::analysis_record("C1", &[]))
            .await;
        h.helpdesk.add_ticket("C1", 101, None).await;
        h.store.fail_writes(true);

        let report = h.reconciler.sweep().await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.cleared, 0);
    }

    #[tokio::test]
    async fn test_sweep_authors_as_assignee() {
        let mut config = Config::default();
        config.helpdesk.transcript_destination = TranscriptDestination::Ticket;
        let h = harness_with(config);
        h.store.put("C1", "docs/C1.json").unwrap();
        h.source
            .add_document("docs/C1.json", fixtures::analysis_record("C1", &[]))
            .await;
        h.helpdesk.add_ticket("C1", 101, Some(7)).await;
        h.helpdesk.add_user(7, "agent@acme.com").await;

        h.reconciler.sweep().await.unwrap();

        let requests = h.helpdesk.recorded_requests().await;
        assert!(requests.iter().any(|r| matches!(
            r,
            RecordedRequest::UpdateTicket { identity, .. } if identity == "agent@acme.com"
        )));
    }
}
