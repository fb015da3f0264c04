use player_bot_reset::config::{ConfigSource, DEFAULT_CONFIG_FILE, YamlConfig, keys};
use player_bot_reset::guild::{
    GUILD_FLAGS_FILE, GuildFlagStore, GuildStoreRequest, GuildTracker, YamlGuildStore,
    spawn_persistence_task,
};
use player_bot_reset::reset::{Policy, ResetService, RngRoller, Trigger};
use player_bot_reset::world::{SimulatedWorld, World};
use player_bot_reset::{ERROR_TARGET, Error, logging};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Population file for the simulated world
const POPULATION_FILE: &str = "data/population.yaml";
/// Host tick length
const TICK_MS: u32 = 1000;

/// Run the reset daemon against the simulated world
async fn async_main() -> Result<(), Error> {
    let config_path =
        env::var("BOT_RESET_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
    let (config, config_error) = match YamlConfig::load(&config_path).await {
        Ok(config) => (config, None),
        Err(e) => (YamlConfig::default(), Some(e)),
    };

    let log_control = logging::init(config.get_bool(keys::DEBUG_MODE, false))?;
    if let Some(e) = config_error {
        warn!("Could not read {config_path}, using defaults: {e}");
    }

    let policy = Policy::from_source(&config);

    // Guild flags persist across restarts
    let store: Arc<dyn GuildFlagStore> = Arc::new(YamlGuildStore::new(GUILD_FLAGS_FILE));
    let (store_tx, store_handle) = spawn_persistence_task(Arc::clone(&store));
    let mut tracker = GuildTracker::new();
    tracker.set_sender(store_tx.clone());
    // A failed load is already logged; the tracker starts empty
    let _ = tracker.load(store.as_ref()).await;

    let world = match SimulatedWorld::load(POPULATION_FILE).await {
        Ok(world) => world,
        Err(e) => {
            warn!("Could not load {POPULATION_FILE}, starting with an empty world: {e}");
            SimulatedWorld::new()
        }
    };

    let mut service = ResetService::new(
        policy,
        Box::new(world.clone()),
        Box::new(world.clone()),
        Box::new(RngRoller::from_os_rng()),
    )
    .with_tracker(tracker)
    .with_log_control(log_control);

    logging::log_console(format!(
        "Reset daemon started with {} characters online",
        world.len()
    ));

    service.on_login_batch(&world.online_players());

    let mut interval = tokio::time::interval(Duration::from_millis(u64::from(TICK_MS)));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                world.advance_played_time(TICK_MS / 1000);
                service.on_tick(TICK_MS);
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!(target: ERROR_TARGET, "Failed to listen for shutdown signal: {e}");
                }
                break;
            }
        }
    }

    let ledger = service.ledger();
    info!(
        total = ledger.len(),
        login = ledger.count_by_trigger(Trigger::Login),
        level_changed = ledger.count_by_trigger(Trigger::LevelChanged),
        rescan = ledger.count_by_trigger(Trigger::Rescan),
        "Shutting down"
    );

    if let Err(e) = store_tx.send(GuildStoreRequest::Shutdown).await {
        error!(target: ERROR_TARGET, "Guild persistence task already stopped: {e}");
    }
    if let Err(e) = store_handle.await {
        error!(target: ERROR_TARGET, "Guild persistence task failed: {e}");
    }

    Ok(())
}

fn main() {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error building runtime: {e}");
            return;
        }
    };

    if let Err(err) = runtime.block_on(async_main()) {
        logging::log_fatal(&err);
        eprintln!("Error: {err}");
    }
}
