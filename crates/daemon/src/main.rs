//! Lineup Bot - Main Entry Point
//! Queue sign-ups over Telegram buttons, mirrored into a Google Sheet

mod logging;
mod settings;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use lineup_core::application::{
    shutdown_channel, NotificationScheduler, QueueService, QueueStore,
};
use lineup_core::config::{load_roster, load_subjects};
use lineup_core::port::{ChatTransport, IntentHandler, SheetStore, SystemTimeProvider, TimeProvider};
use lineup_infra_sheets::{GoogleSheetsStore, ServiceAccountKey, TokenProvider};
use lineup_infra_telegram::{BotApi, TelegramPoller, TelegramTransport};
use settings::{CredentialSource, Settings};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Logging (guard flushes the log file on exit)
    let _log_guard = logging::init()?;
    info!("Lineup bot v{} starting...", VERSION);

    // 2. Settings and static data
    let settings = Settings::load()?;
    let offset = settings.schedule.offset()?;
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new(offset));

    let catalog = Arc::new(
        load_subjects(shellexpand::tilde(&settings.files.subjects).into_owned())
            .context("failed to load subjects")?,
    );
    for problem in catalog.validate() {
        warn!(error = %problem, "Subject will be skipped by the scheduler");
    }
    let roster = Arc::new(
        load_roster(shellexpand::tilde(&settings.files.user_mapping).into_owned())
            .context("failed to load user mapping")?,
    );
    for (label, identities) in roster.shared_labels() {
        warn!(label, identities = ?identities, "Surname shared by several users, sheet rows matched by queue order");
    }

    // 3. Adapters (DI wiring)
    let key = match settings.credential_source()? {
        CredentialSource::File(path) => ServiceAccountKey::from_file(path)?,
        CredentialSource::Inline(json) => ServiceAccountKey::from_json(json)?,
    };
    info!(service_account = %key.client_email, "Using service account");
    let sheets = Arc::new(
        GoogleSheetsStore::new(
            TokenProvider::service_account(key)?,
            &settings.sheets.spreadsheet_id,
        )?
        .with_range(&settings.sheets.range),
    );
    match sheets.ensure_headers(&catalog).await {
        Ok(0) => {}
        Ok(added) => info!(added, "Restored missing sheet headers"),
        Err(e) => warn!(error = %e, "Could not verify sheet headers"),
    }
    let sheet: Arc<dyn SheetStore> = sheets;

    let poll_timeout = Duration::from_secs(settings.telegram.poll_timeout_secs);
    let api = Arc::new(BotApi::new(&settings.telegram.bot_token, poll_timeout)?);
    let transport: Arc<dyn ChatTransport> =
        Arc::new(TelegramTransport::new(Arc::clone(&api), settings.telegram.chat_id));

    // 4. Core services
    let queues = Arc::new(QueueStore::new());
    let service = Arc::new(
        QueueService::new(
            Arc::clone(&catalog),
            Arc::clone(&roster),
            Arc::clone(&queues),
            Arc::clone(&sheet),
            Arc::clone(&transport),
        )
        .with_confirm_join(settings.schedule.confirm_join),
    );

    // 5. Initial sync from the sheet (fail-open per subject)
    let synced = service.sync_all().await;
    info!(synced, subjects = catalog.len(), users = roster.len(), "Initial sync completed");

    // 6. Scheduler: catch up on reminders missed while down, then tick
    let scheduler = Arc::new(NotificationScheduler::new(
        Arc::clone(&catalog),
        queues,
        sheet,
        transport,
        Arc::clone(&time_provider),
        settings.schedule.scheduler_config(),
    ));
    scheduler.startup_catch_up(time_provider.now()).await;

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let scheduler_handle = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let shutdown = shutdown_rx.clone();
        async move { scheduler.run(shutdown).await }
    });

    // 7. Telegram callbacks
    let poller = TelegramPoller::new(api, poll_timeout);
    let handler: Arc<dyn IntentHandler> = service;
    let poller_handle = tokio::spawn(async move { poller.run(handler, shutdown_rx).await });

    info!(chat_id = settings.telegram.chat_id, "System ready. Press Ctrl+C to shutdown");

    // 8. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 9. Graceful shutdown
    shutdown_tx.shutdown();
    let stopped = tokio::time::timeout(SHUTDOWN_GRACE, async {
        let _ = tokio::join!(scheduler_handle, poller_handle);
    })
    .await;
    if stopped.is_err() {
        warn!("Background tasks did not stop in time");
    }

    info!("Shutdown complete.");
    Ok(())
}
