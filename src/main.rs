mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod registry;
mod store;
mod tasks;
mod voting;

use config::Config;
use db::Database;
use error::RegistryError;
use log::{error, info};
use registry::PollRegistry;
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tasks::PollDisplays;

struct Bot {
    registry: Arc<PollRegistry>,
    displays: Arc<PollDisplays>,
    refresher_started: AtomicBool,
}

#[async_trait]
impl EventHandler for Bot {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let registry = Arc::clone(&self.registry);
        let displays = Arc::clone(&self.displays);

        // Spawn a task to handle the interaction concurrently
        tokio::spawn(async move {
            handlers::handle_interaction(&registry, &displays, &ctx, interaction).await;
        });
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        match commands::register_global_commands(&ctx).await {
            Ok(_) => info!("Successfully registered global slash commands."),
            Err(why) => error!("Failed to register slash commands: {:?}", why),
        }

        // Ready fires again on reconnect; one refresher is enough.
        if !self.refresher_started.swap(true, Ordering::SeqCst) {
            let registry = Arc::clone(&self.registry);
            let displays = Arc::clone(&self.displays);
            let http = Arc::clone(&ctx.http);
            tokio::spawn(async move {
                tasks::tally_refresher::refresh_tallies_task(registry, displays, http).await;
            });
        }
    }
}

async fn deploy_registry(config: &Config) -> Result<PollRegistry, RegistryError> {
    match &config.database_url {
        Some(url) => {
            let database = Database::connect(url, config.max_connections).await?;
            info!("Poll registry deployed at {}", url);
            Ok(PollRegistry::with_store(Arc::new(database)))
        }
        None => {
            info!("Poll registry deployed in memory; polls are lost on restart");
            Ok(PollRegistry::new())
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let registry = match deploy_registry(&config).await {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Failed to initialize poll registry: {}", e);
            return;
        }
    };

    let bot = Bot {
        registry,
        displays: Arc::new(PollDisplays::new()),
        refresher_started: AtomicBool::new(false),
    };

    // Interactions arrive without message content
    let intents = GatewayIntents::GUILDS;

    let mut client = match Client::builder(&config.discord_token, intents).event_handler(bot).await {
        Ok(client) => client,
        Err(why) => {
            error!("Error creating client: {:?}", why);
            return;
        }
    };

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
