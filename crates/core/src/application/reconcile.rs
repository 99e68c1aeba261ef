//! Reconciliation - rebuild a local queue from the sheet
//!
//! The sheet is authoritative for who is queued and in which order, but it
//! only stores labels (surnames). Local state is rebuilt from it wholesale,
//! never merged field by field: an administrator may have edited the sheet.
//!
//! Ordering hazard: a join admitted locally but not yet written to the sheet
//! is dropped by a reconciliation that reads the sheet in between. Joins
//! therefore write to the sheet before reporting success and reconcile again
//! afterwards (see `QueueService::join`).

use crate::application::queue_store::QueueStore;
use crate::domain::roster::normalize;
use crate::domain::{Roster, Subject};
use crate::error::Result;
use crate::port::SheetStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Reconciler {
    queues: Arc<QueueStore>,
}

impl Reconciler {
    pub fn new(queues: Arc<QueueStore>) -> Self {
        Self { queues }
    }

    /// Replace `subject`'s queue with the resolved, deduplicated `labels`.
    ///
    /// `resolve` gets each label together with the identities already placed
    /// earlier in the column. Labels it cannot map are kept verbatim so
    /// nobody is silently dropped. Blank cells are skipped. Returns the
    /// applied queue.
    pub fn reconcile<F>(&self, subject: &str, labels: &[String], resolve: F) -> Vec<String>
    where
        F: Fn(&str, &HashSet<String>) -> Option<String>,
    {
        let mut seen = HashSet::new();
        let mut applied = Vec::with_capacity(labels.len());
        let mut duplicates = 0usize;

        for label in labels {
            let label = normalize(label);
            if label.is_empty() {
                continue;
            }

            let identity = match resolve(label, &seen) {
                Some(identity) => identity,
                None => {
                    debug!(subject, label, "No identity for label, keeping it verbatim");
                    label.to_string()
                }
            };

            if seen.insert(identity.clone()) {
                applied.push(identity);
            } else {
                duplicates += 1;
                warn!(subject, identity = %identity, "Duplicate entry in sheet, discarding");
            }
        }

        let previous = self.queues.replace_all(subject, applied.clone());
        if previous != applied {
            let kept: HashSet<&String> = applied.iter().collect();
            let dropped = previous.iter().filter(|p| !kept.contains(p)).count();
            let before: HashSet<&String> = previous.iter().collect();
            let added = applied.iter().filter(|a| !before.contains(a)).count();
            info!(
                subject,
                size = applied.len(),
                added,
                dropped,
                duplicates,
                "Queue rebuilt from sheet"
            );
        }

        applied
    }

    /// Read the subject's column and reconcile it.
    ///
    /// On read failure the local queue is left untouched and the error is
    /// returned for the caller to log.
    pub async fn sync_subject(
        &self,
        sheet: &dyn SheetStore,
        roster: &Roster,
        subject: &Subject,
    ) -> Result<Vec<String>> {
        let labels = sheet.read_ordered_labels(subject).await?;
        // Shared surnames resolve to whoever already held the place
        let previous = self.queues.snapshot(&subject.name);
        Ok(self.reconcile(&subject.name, &labels, |label, taken| {
            roster.resolve_label(label, &previous, taken)
        }))
    }
}
