mod appsettings;

use std::{collections::HashMap, str::FromStr, sync::Arc};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use sprout_scheduler::{ReminderScheduler, delivery::ReminderDeliveryChannel};
use sprout_services::{CareAdvisor, GeminiClient, NominatimClient, OpenWeatherClient, PlantIdClient};
use sprout_storage::{
    CareLogStorage, DocumentStore, PlantStorage, ReminderConfigStorage, SqliteDocumentStore,
    UserStorage, run_migrations,
};
use sprout_telegram::{
    AppContext, TelegramDeliveryChannel, TelegramInteractionInterface, restore_reminders,
    teloxide::Bot,
};
use watering_scheduler::{TimerNotificationDelivery, WateringReminderScheduler, run_fired_events};

const DELIVERY_EVENTS_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::load()?;
    log::info!("Starting sprout");

    let connect_options =
        SqliteConnectOptions::from_str(&settings.database.url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;
    run_migrations(&pool).await?;

    let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool));
    let users = Arc::new(UserStorage::new(Arc::clone(&store)));

    let bot = Bot::new(&settings.telegram.token);
    let channel: Arc<dyn ReminderDeliveryChannel> = Arc::new(TelegramDeliveryChannel::new(
        Arc::clone(&users),
        bot.clone(),
    ));

    let (events_tx, events_rx) = mpsc::channel(DELIVERY_EVENTS_BUFFER);
    let delivery = Arc::new(TimerNotificationDelivery::new(Arc::clone(&channel), events_tx));
    let scheduler: Arc<dyn ReminderScheduler> =
        Arc::new(WateringReminderScheduler::new(delivery, channel));

    let shutdown = CancellationToken::new();
    let events_loop = tokio::spawn(run_fired_events(
        Arc::clone(&scheduler),
        events_rx,
        shutdown.child_token(),
    ));

    let advisor = CareAdvisor::new(
        Arc::new(OpenWeatherClient::new(&settings.weather)?),
        Arc::new(GeminiClient::new(&settings.care_advice)?),
    );

    let context = Arc::new(AppContext {
        users,
        plants: PlantStorage::new(Arc::clone(&store)),
        care_logs: CareLogStorage::new(Arc::clone(&store)),
        reminder_configs: ReminderConfigStorage::new(Arc::clone(&store)),
        scheduler,
        advisor,
        identifier: Arc::new(PlantIdClient::new(&settings.identification)?),
        stores: Arc::new(NominatimClient::new(&settings.store_search)?),
        sensor_settings: settings.sensor,
        monitors: Mutex::new(HashMap::new()),
    });

    if let Err(err) = restore_reminders(&context).await {
        log::error!("Failed to restore reminders: {err:#}");
    }

    TelegramInteractionInterface::start(bot, context).await;

    shutdown.cancel();
    events_loop.await?;
    log::info!("Stopped");

    Ok(())
}
