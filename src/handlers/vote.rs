use crate::handlers::messages::{self, Locale};
use crate::models::{PollId, VoterId};
use crate::registry::PollRegistry;
use log::{info, warn};
use serenity::model::application::interaction::{
    message_component::MessageComponentInteraction, InteractionResponseType,
};
use serenity::model::id::UserId;
use serenity::prelude::*;

pub fn voter_for(user_id: UserId) -> VoterId {
    VoterId::new(user_id.to_string())
}

/// Submit a vote and turn the outcome into the text shown to the voter.
pub async fn cast_vote(
    registry: &PollRegistry,
    poll_id: PollId,
    option_index: usize,
    voter: &VoterId,
    locale: Locale,
) -> String {
    match registry.vote(poll_id, option_index, voter).await {
        Ok(()) => messages::vote_accepted(locale),
        Err(e) => {
            warn!(
                "Vote rejected: poll_id={}, option_index={}, voter={}: {}",
                poll_id, option_index, voter, e
            );
            messages::vote_failed(locale, &e)
        }
    }
}

pub async fn handle_vote_button(
    registry: &PollRegistry,
    ctx: &Context,
    component: &MessageComponentInteraction,
    poll_id: PollId,
    option_index: usize,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Processing vote button: poll_id={}, option_index={}", poll_id, option_index);

    let locale = Locale::from_tag(&component.locale);
    let voter = voter_for(component.user.id);
    let reply = cast_vote(registry, poll_id, option_index, &voter, locale).await;

    component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(&reply).ephemeral(true))
        })
        .await?;

    Ok(())
}
