// Queue Service - join / leave / show use cases behind the chat transport

use crate::application::queue_store::QueueStore;
use crate::application::reconcile::Reconciler;
use crate::domain::{
    Intent, IntentKind, IntentReply, OutboundEvent, QueueSnapshot, Roster, Subject, SubjectCatalog,
};
use crate::port::{ChatTransport, IntentHandler, SheetStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

/// Handles user intents against the local queues and the sheet.
///
/// Join and leave for one subject are serialized by a per-subject flow lock
/// held across the sheet write, so two users joining the same subject never
/// race on "first empty cell". Reconciliation (show, startup sync) does not
/// take the flow lock and may interleave with a join; joins tolerate that by
/// writing to the sheet before reporting and re-reading afterwards.
pub struct QueueService {
    catalog: Arc<SubjectCatalog>,
    roster: Arc<Roster>,
    queues: Arc<QueueStore>,
    reconciler: Reconciler,
    sheet: Arc<dyn SheetStore>,
    transport: Arc<dyn ChatTransport>,
    confirm_join: bool,
    flows: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl QueueService {
    pub fn new(
        catalog: Arc<SubjectCatalog>,
        roster: Arc<Roster>,
        queues: Arc<QueueStore>,
        sheet: Arc<dyn SheetStore>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            catalog,
            roster,
            reconciler: Reconciler::new(Arc::clone(&queues)),
            queues,
            sheet,
            transport,
            confirm_join: true,
            flows: Mutex::new(HashMap::new()),
        }
    }

    /// Re-read the sheet after a successful append to pick up its real order
    pub fn with_confirm_join(mut self, confirm_join: bool) -> Self {
        self.confirm_join = confirm_join;
        self
    }

    pub fn queues(&self) -> &Arc<QueueStore> {
        &self.queues
    }

    pub async fn join(&self, token: &str, username: Option<&str>) -> IntentReply {
        let (subject, identity) = match self.resolve(token, username) {
            Ok(resolved) => resolved,
            Err(reply) => return reply,
        };
        let flow = self.flow_lock(&subject.name);
        let _flow = flow.lock().await;

        self.refresh(subject).await;

        let admission = self.queues.join(&subject.name, &identity);
        if !admission.admitted {
            return IntentReply::AlreadyQueued {
                position: admission.position,
            };
        }

        let label = Roster::label_of(&identity);
        if let Err(e) = self.sheet.append_label(subject, label).await {
            error!(subject = %subject.name, identity = %identity, error = %e, "Failed to write join to sheet, rolling back");
            self.queues.leave(&subject.name, &identity);
            return IntentReply::StoreUnavailable;
        }

        if self.confirm_join {
            self.refresh(subject).await;
        }

        // A reconciliation that read the sheet before our append landed may
        // have dropped the local admission; the sheet now has it, so restore.
        // A shared surname may instead have come back unattributed: that row
        // is ours, and admitting the identity again would count it twice.
        let info = match self.queues.queue_info(&subject.name, &identity) {
            Some(info) => info,
            None => match self.queues.queue_info(&subject.name, label) {
                Some(info) if self.roster.is_shared_label(label) => {
                    warn!(subject = %subject.name, identity = %identity, label, "Join came back as an unattributed shared surname");
                    info
                }
                _ => {
                    warn!(subject = %subject.name, identity = %identity, "Join lost to concurrent reconciliation, restoring");
                    self.queues.join(&subject.name, &identity);
                    match self.queues.queue_info(&subject.name, &identity) {
                        Some(info) => info,
                        None => return IntentReply::StoreUnavailable,
                    }
                }
            },
        };

        self.announce(OutboundEvent::Joined {
            subject: subject.name.clone(),
            label: label.to_string(),
            position: info.position,
        })
        .await;
        self.publish_snapshot(subject).await;

        IntentReply::Joined {
            position: info.position,
            predecessor: info
                .predecessor
                .as_deref()
                .map(|p| Roster::label_of(p).to_string()),
        }
    }

    pub async fn leave(&self, token: &str, username: Option<&str>) -> IntentReply {
        let (subject, identity) = match self.resolve(token, username) {
            Ok(resolved) => resolved,
            Err(reply) => return reply,
        };
        let flow = self.flow_lock(&subject.name);
        let _flow = flow.lock().await;

        self.refresh(subject).await;

        if !self.queues.leave(&subject.name, &identity) {
            return IntentReply::NotQueued;
        }

        let label = Roster::label_of(&identity);
        if let Err(e) = self.sheet.remove_label(subject, label).await {
            error!(subject = %subject.name, identity = %identity, error = %e, "Failed to remove from sheet");
            // The sheet still lists them; put local state back in line with it
            self.refresh(subject).await;
            return IntentReply::StoreUnavailable;
        }

        self.announce(OutboundEvent::Left {
            subject: subject.name.clone(),
            label: label.to_string(),
        })
        .await;
        self.publish_snapshot(subject).await;

        IntentReply::Left
    }

    pub async fn show(&self, token: &str) -> IntentReply {
        let Some(subject) = self.catalog.by_token(token) else {
            return IntentReply::UnknownSubject;
        };

        self.refresh(subject).await;
        let count = self.publish_snapshot(subject).await;
        IntentReply::Shown { count }
    }

    /// Reconcile every subject from the sheet. Returns how many succeeded.
    pub async fn sync_all(&self) -> usize {
        let mut synced = 0;
        for subject in self.catalog.iter() {
            match self
                .reconciler
                .sync_subject(self.sheet.as_ref(), &self.roster, subject)
                .await
            {
                Ok(queue) => {
                    synced += 1;
                    info!(subject = %subject.name, size = queue.len(), "Queue synced from sheet");
                }
                Err(e) => {
                    warn!(subject = %subject.name, error = %e, "Initial sync failed, starting with empty queue");
                }
            }
        }
        synced
    }

    fn resolve(
        &self,
        token: &str,
        username: Option<&str>,
    ) -> std::result::Result<(&Subject, String), IntentReply> {
        let subject = self
            .catalog
            .by_token(token)
            .ok_or(IntentReply::UnknownSubject)?;
        let identity = username
            .and_then(|u| self.roster.identity_for(u))
            .ok_or_else(|| {
                info!(subject = %subject.name, username = ?username, "Rejected intent from unmapped user");
                IntentReply::UnknownUser
            })?;
        Ok((subject, identity.to_string()))
    }

    fn flow_lock(&self, subject: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut flows = self.flows.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(flows.entry(subject.to_string()).or_default())
    }

    // Fail-open: a failed read keeps whatever is in memory
    async fn refresh(&self, subject: &Subject) {
        if let Err(e) = self
            .reconciler
            .sync_subject(self.sheet.as_ref(), &self.roster, subject)
            .await
        {
            warn!(subject = %subject.name, error = %e, "Sheet read failed, using local queue");
        }
    }

    async fn publish_snapshot(&self, subject: &Subject) -> usize {
        let labels: Vec<String> = self
            .queues
            .snapshot(&subject.name)
            .iter()
            .map(|identity| Roster::label_of(identity).to_string())
            .collect();
        let count = labels.len();

        self.announce(OutboundEvent::Snapshot(QueueSnapshot {
            subject: subject.name.clone(),
            action_token: subject.action_token().to_string(),
            labels,
        }))
        .await;
        count
    }

    async fn announce(&self, event: OutboundEvent) {
        if let Err(e) = self.transport.emit(&event).await {
            warn!(subject = %event.subject(), error = %e, "Failed to deliver chat event");
        }
    }
}

#[async_trait]
impl IntentHandler for QueueService {
    async fn handle(&self, intent: Intent) -> IntentReply {
        let username = intent.username.as_deref();
        let reply = match intent.kind {
            IntentKind::Join => self.join(&intent.token, username).await,
            IntentKind::Leave => self.leave(&intent.token, username).await,
            IntentKind::Show => self.show(&intent.token).await,
        };
        info!(
            kind = %intent.kind,
            token = %intent.token,
            username = ?username,
            reply = ?reply,
            "Intent handled"
        );
        reply
    }
}
