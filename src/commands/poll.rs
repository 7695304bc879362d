use crate::handlers::card;
use crate::handlers::messages::{self, Locale};
use crate::handlers::{cast_vote, voter_for};
use crate::models::{PollId, PollSnapshot};
use crate::registry::PollRegistry;
use crate::tasks::{PollDisplays, TrackedCard};
use crate::voting::PollTally;
use log::info;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::*;

const POLLS_PER_PAGE: u64 = 10;
const MAX_FIELD_NAME_CHARS: usize = 256;

pub fn create_poll_command(command: &mut CreateApplicationCommand) -> &mut CreateApplicationCommand {
    command
        .name("poll")
        .description("Create, browse and vote in polls")
        .create_option(|option| {
            option
                .name("create")
                .description("Create a new poll")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("question")
                        .description("The poll question")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("options")
                        .description("Comma-separated list of options")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("list")
                .description("List all polls")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("page")
                        .description("Page number")
                        .kind(CommandOptionType::Integer)
                        .min_int_value(1)
                        .required(false)
                })
        })
        .create_option(|option| {
            option
                .name("view")
                .description("Show a poll and vote in it")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("id")
                        .description("ID of the poll")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("vote")
                .description("Vote for an option by number")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("id")
                        .description("ID of the poll")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("option")
                        .description("Option number, starting at 1")
                        .kind(CommandOptionType::Integer)
                        .min_int_value(1)
                        .required(true)
                })
        })
}

fn option_str<'a>(options: &'a [CommandDataOption], name: &str) -> Option<&'a str> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
}

fn option_int(options: &[CommandDataOption], name: &str) -> Option<i64> {
    options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_i64())
}

/// Split a comma-separated option list, dropping blank entries.
pub fn parse_options(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(str::to_string)
        .collect()
}

/// Id range `[start, end)` shown on a 1-based page, and the page count.
pub fn page_bounds(total: u64, page: u64) -> Option<(u64, u64, u64)> {
    let pages = total.div_ceil(POLLS_PER_PAGE).max(1);
    if page == 0 || page > pages {
        return None;
    }
    let start = (page - 1) * POLLS_PER_PAGE;
    let end = (start + POLLS_PER_PAGE).min(total);
    Some((start, end, pages))
}

pub async fn handle_poll_command(
    registry: &PollRegistry,
    displays: &PollDisplays,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let locale = Locale::from_tag(&command.locale);

    let subcommand = match command.data.options.first() {
        Some(option) => option,
        None => {
            send_ephemeral(ctx, command, &messages::no_subcommand(locale)).await?;
            return Ok(());
        }
    };
    let args = subcommand.options.as_slice();

    match subcommand.name.as_str() {
        "create" => handle_create_poll(registry, displays, ctx, command, args, locale).await?,
        "list" => handle_list_polls(registry, ctx, command, args, locale).await?,
        "view" => handle_view_poll(registry, displays, ctx, command, args, locale).await?,
        "vote" => handle_vote_command(registry, ctx, command, args, locale).await?,
        name => {
            send_ephemeral(ctx, command, &messages::unknown_subcommand(locale, name)).await?;
        }
    }

    Ok(())
}

async fn handle_create_poll(
    registry: &PollRegistry,
    displays: &PollDisplays,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    args: &[CommandDataOption],
    locale: Locale,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let question = option_str(args, "question").unwrap_or_default().trim();
    let options = parse_options(option_str(args, "options").unwrap_or_default());

    let poll_id = match registry.create_poll(question, &options).await {
        Ok(id) => id,
        Err(e) => {
            info!("Rejected poll from {}: {}", command.user.id, e);
            send_ephemeral(ctx, command, &messages::creation_failed(locale, &e)).await?;
            return Ok(());
        }
    };

    let snapshot = registry.get_poll(poll_id).await?;
    let content = messages::poll_created(locale, poll_id);
    post_card(displays, ctx, command, poll_id, &snapshot, locale, Some(content)).await
}

async fn handle_list_polls(
    registry: &PollRegistry,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    args: &[CommandDataOption],
    locale: Locale,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let total = registry.total_polls().await?;
    if total == 0 {
        send_ephemeral(ctx, command, &messages::no_polls(locale)).await?;
        return Ok(());
    }

    let page = option_int(args, "page").unwrap_or(1).max(0) as u64;
    let (start, end, pages) = match page_bounds(total, page) {
        Some(bounds) => bounds,
        None => {
            let pages = total.div_ceil(POLLS_PER_PAGE);
            send_ephemeral(ctx, command, &messages::page_out_of_range(locale, page, pages)).await?;
            return Ok(());
        }
    };

    let mut rows = Vec::new();
    for poll_id in start..end {
        let tally = PollTally::from_snapshot(&registry.get_poll(poll_id).await?);
        let winners: Vec<&str> = tally.winners().iter().map(|o| o.label.as_str()).collect();
        rows.push((
            card::truncate(&format!("#{} {}", poll_id, tally.question), MAX_FIELD_NAME_CHARS),
            format!(
                "{} • {}",
                messages::votes(locale, tally.total_votes),
                card::truncate(&messages::leading(locale, &winners), 900)
            ),
        ));
    }

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message.embed(|e| {
                        e.title(messages::polls_title(locale));
                        for (name, value) in &rows {
                            e.field(name, value, false);
                        }
                        e.footer(|f| f.text(messages::page_footer(locale, page, pages)))
                    })
                })
        })
        .await?;

    Ok(())
}

async fn handle_view_poll(
    registry: &PollRegistry,
    displays: &PollDisplays,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    args: &[CommandDataOption],
    locale: Locale,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let raw_id = option_str(args, "id").unwrap_or_default();
    let poll_id = match existing_poll_id(registry, raw_id).await? {
        Some(id) => id,
        None => {
            send_ephemeral(ctx, command, &messages::invalid_poll_id(locale, raw_id)).await?;
            return Ok(());
        }
    };

    let snapshot = registry.get_poll(poll_id).await?;
    post_card(displays, ctx, command, poll_id, &snapshot, locale, None).await
}

async fn handle_vote_command(
    registry: &PollRegistry,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    args: &[CommandDataOption],
    locale: Locale,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let raw_id = option_str(args, "id").unwrap_or_default();
    let poll_id = match existing_poll_id(registry, raw_id).await? {
        Some(id) => id,
        None => {
            send_ephemeral(ctx, command, &messages::invalid_poll_id(locale, raw_id)).await?;
            return Ok(());
        }
    };

    let option_index = match option_int(args, "option").and_then(|n| usize::try_from(n).ok()) {
        Some(n) if n >= 1 => n - 1,
        _ => {
            send_ephemeral(ctx, command, &messages::invalid_option_number(locale)).await?;
            return Ok(());
        }
    };

    let voter = voter_for(command.user.id);
    let reply = cast_vote(registry, poll_id, option_index, &voter, locale).await;
    send_ephemeral(ctx, command, &reply).await?;
    Ok(())
}

/// Parse a user-supplied id and make sure it is below `total_polls`.
async fn existing_poll_id(
    registry: &PollRegistry,
    raw_id: &str,
) -> Result<Option<PollId>, Box<dyn std::error::Error + Send + Sync>> {
    let Some(poll_id) = card::parse_poll_id(raw_id) else {
        return Ok(None);
    };
    let total = registry.total_polls().await?;
    Ok((poll_id < total).then_some(poll_id))
}

async fn post_card(
    displays: &PollDisplays,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    poll_id: PollId,
    snapshot: &PollSnapshot,
    locale: Locale,
    content: Option<String>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let tally = PollTally::from_snapshot(snapshot);
    let fits_buttons = card::fits_buttons(&tally);
    let content = match (content, fits_buttons) {
        (content, true) => content,
        (Some(content), false) => Some(format!("{}\n{}", content, messages::use_vote_command(locale, poll_id))),
        (None, false) => Some(messages::use_vote_command(locale, poll_id)),
    };

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message.embed(|e| card::render_card(e, poll_id, &tally, locale));
                    if let Some(content) = &content {
                        message.content(content);
                    }
                    if fits_buttons {
                        message.components(|c| card::add_vote_buttons(c, poll_id, &tally));
                    }
                    message
                })
        })
        .await?;

    let posted = command.get_interaction_response(&ctx.http).await?;
    displays
        .track(
            poll_id,
            TrackedCard {
                channel_id: posted.channel_id,
                message_id: posted.id,
                locale,
            },
        )
        .await;

    Ok(())
}

async fn send_ephemeral(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    text: &str,
) -> Result<(), serenity::Error> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(text).ephemeral(true))
        })
        .await
}
