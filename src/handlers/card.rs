use crate::handlers::messages::{self, Locale};
use crate::models::PollId;
use crate::voting::PollTally;
use lazy_static::lazy_static;
use regex::Regex;
use serenity::builder::{CreateComponents, CreateEmbed};
use serenity::model::application::component::ButtonStyle;

/// Discord allows 5 rows of 5 buttons.
pub const MAX_VOTE_BUTTONS: usize = 25;
const BUTTONS_PER_ROW: usize = 5;
const BAR_WIDTH: u64 = 10;
const MAX_DESCRIPTION_CHARS: usize = 4096;
const MAX_BUTTON_LABEL_CHARS: usize = 80;
const MAX_TITLE_CHARS: usize = 256;

lazy_static! {
    static ref POLL_ID_RE: Regex = Regex::new(r"^\d+$").unwrap();
    static ref VOTE_BUTTON_RE: Regex = Regex::new(r"^vote_(\d+)_(\d+)$").unwrap();
}

/// Accepts only non-negative integers that fit a poll id.
pub fn parse_poll_id(raw: &str) -> Option<PollId> {
    let raw = raw.trim();
    if !POLL_ID_RE.is_match(raw) {
        return None;
    }
    raw.parse().ok()
}

pub fn vote_button_id(poll_id: PollId, option_index: usize) -> String {
    format!("vote_{}_{}", poll_id, option_index)
}

pub fn parse_vote_button(custom_id: &str) -> Option<(PollId, usize)> {
    let caps = VOTE_BUTTON_RE.captures(custom_id)?;
    let poll_id = caps[1].parse().ok()?;
    let option_index = caps[2].parse().ok()?;
    Some((poll_id, option_index))
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn progress_bar(percent: u64) -> String {
    let filled = (percent.min(100) * BAR_WIDTH + 50) / 100;
    let mut bar = "█".repeat(filled as usize);
    bar.push_str(&"░".repeat((BAR_WIDTH - filled) as usize));
    bar
}

pub fn card_description(tally: &PollTally) -> String {
    let mut description = String::new();
    for option in &tally.options {
        let marker = if option.is_winner { "🏆 " } else { "" };
        description.push_str(&format!(
            "{}**{}. {}**\n`{}` {} • {}%\n",
            marker,
            option.index + 1,
            option.label,
            progress_bar(option.percent),
            option.count,
            option.percent
        ));
    }
    truncate(&description, MAX_DESCRIPTION_CHARS)
}

pub fn render_card<'a>(
    embed: &'a mut CreateEmbed,
    poll_id: PollId,
    tally: &PollTally,
    locale: Locale,
) -> &'a mut CreateEmbed {
    embed
        .title(truncate(&format!("#{} {}", poll_id, tally.question), MAX_TITLE_CHARS))
        .description(card_description(tally))
        .field("Poll ID", poll_id, true)
        .footer(|footer| footer.text(messages::votes(locale, tally.total_votes)))
}

pub fn fits_buttons(tally: &PollTally) -> bool {
    tally.options.len() <= MAX_VOTE_BUTTONS
}

pub fn add_vote_buttons<'a>(
    components: &'a mut CreateComponents,
    poll_id: PollId,
    tally: &PollTally,
) -> &'a mut CreateComponents {
    for chunk in tally.options.chunks(BUTTONS_PER_ROW).take(MAX_VOTE_BUTTONS / BUTTONS_PER_ROW) {
        components.create_action_row(|row| {
            for option in chunk {
                row.create_button(|btn| {
                    btn.custom_id(vote_button_id(poll_id, option.index))
                        .label(truncate(
                            &format!("{}. {}", option.index + 1, option.label),
                            MAX_BUTTON_LABEL_CHARS,
                        ))
                        .style(ButtonStyle::Primary)
                });
            }
            row
        });
    }
    components
}
