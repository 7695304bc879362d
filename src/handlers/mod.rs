pub mod card;
pub mod messages;
mod vote;

pub use vote::{cast_vote, voter_for};

use crate::registry::PollRegistry;
use crate::tasks::PollDisplays;
use log::{error, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::prelude::*;

// Handle slash commands
pub async fn handle_command(
    registry: &PollRegistry,
    displays: &PollDisplays,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Received command: {}", command.data.name);
    match command.data.name.as_str() {
        "poll" => crate::commands::poll::handle_poll_command(registry, displays, ctx, command).await?,
        _ => {
            command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content("Unknown command").ephemeral(true))
                })
                .await?;
        }
    }
    Ok(())
}

pub async fn handle_component(
    registry: &PollRegistry,
    ctx: &Context,
    component: &MessageComponentInteraction,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let custom_id = &component.data.custom_id;
    info!("Received component interaction: {}", custom_id);

    match card::parse_vote_button(custom_id) {
        Some((poll_id, option_index)) => {
            vote::handle_vote_button(registry, ctx, component, poll_id, option_index).await?;
        }
        None => {
            warn!("Unhandled component custom_id: {}", custom_id);
            component
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| message.content("Unknown button action.").ephemeral(true))
                })
                .await?;
        }
    }

    Ok(())
}

pub async fn handle_interaction(
    registry: &PollRegistry,
    displays: &PollDisplays,
    ctx: &Context,
    interaction: Interaction,
) {
    let result = match interaction {
        Interaction::ApplicationCommand(command) => handle_command(registry, displays, ctx, &command).await,
        Interaction::MessageComponent(component) => handle_component(registry, ctx, &component).await,
        _ => {
            warn!("Unhandled interaction type: {:?}", interaction.kind());
            Ok(())
        }
    };

    if let Err(why) = result {
        error!("Interaction handler error: {:?}", why);
    }
}
