use crate::error::RegistryError;
use crate::models::PollId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    Russian,
}

impl Locale {
    /// Discord locale tags look like `en-US`, `ru`.
    pub fn from_tag(tag: &str) -> Self {
        if tag.to_ascii_lowercase().starts_with("ru") {
            Locale::Russian
        } else {
            Locale::English
        }
    }
}

pub fn no_subcommand(locale: Locale) -> String {
    match locale {
        Locale::English => "No subcommand provided.".to_string(),
        Locale::Russian => "Подкоманда не указана".to_string(),
    }
}

pub fn unknown_subcommand(locale: Locale, name: &str) -> String {
    match locale {
        Locale::English => format!("Unknown subcommand: {}", name),
        Locale::Russian => format!("Неизвестная подкоманда: {}", name),
    }
}

pub fn vote_accepted(locale: Locale) -> String {
    match locale {
        Locale::English => "Your vote has been recorded.".to_string(),
        Locale::Russian => "Голос отправлен".to_string(),
    }
}

/// Known failures get a friendly message, anything else a generic one.
pub fn vote_failed(locale: Locale, err: &RegistryError) -> String {
    match (err, locale) {
        (RegistryError::AlreadyVoted, Locale::English) => "You have already voted in this poll.".to_string(),
        (RegistryError::AlreadyVoted, Locale::Russian) => "Вы уже голосовали в этом опросе".to_string(),
        (_, Locale::English) => format!("Transaction error: {}", err),
        (_, Locale::Russian) => format!("Ошибка транзакции: {}", err),
    }
}

pub fn creation_failed(locale: Locale, err: &RegistryError) -> String {
    match locale {
        Locale::English => format!("Could not create the poll: {}", err),
        Locale::Russian => format!("Не удалось создать опрос: {}", err),
    }
}

pub fn poll_created(locale: Locale, poll_id: PollId) -> String {
    match locale {
        Locale::English => format!("Poll #{} created.", poll_id),
        Locale::Russian => format!("Опрос #{} создан", poll_id),
    }
}

pub fn invalid_poll_id(locale: Locale, raw: &str) -> String {
    match locale {
        Locale::English => format!("Invalid poll ID: {}", raw),
        Locale::Russian => format!("Некорректный ID опроса: {}", raw),
    }
}

pub fn invalid_option_number(locale: Locale) -> String {
    match locale {
        Locale::English => "Option numbers start at 1.".to_string(),
        Locale::Russian => "Номера вариантов начинаются с 1".to_string(),
    }
}

pub fn no_polls(locale: Locale) -> String {
    match locale {
        Locale::English => "No polls have been created yet.".to_string(),
        Locale::Russian => "Опросы пока не созданы".to_string(),
    }
}

pub fn page_out_of_range(locale: Locale, page: u64, pages: u64) -> String {
    match locale {
        Locale::English => format!("Page {} does not exist, there are {} pages.", page, pages),
        Locale::Russian => format!("Страницы {} нет, всего страниц: {}", page, pages),
    }
}

pub fn polls_title(locale: Locale) -> &'static str {
    match locale {
        Locale::English => "Polls",
        Locale::Russian => "Опросы",
    }
}

pub fn page_footer(locale: Locale, page: u64, pages: u64) -> String {
    match locale {
        Locale::English => format!("Page {} of {}", page, pages),
        Locale::Russian => format!("Страница {} из {}", page, pages),
    }
}

pub fn votes(locale: Locale, count: u64) -> String {
    match locale {
        Locale::English if count == 1 => "1 vote".to_string(),
        Locale::English => format!("{} votes", count),
        Locale::Russian => format!("{} голосов", count),
    }
}

pub fn leading(locale: Locale, labels: &[&str]) -> String {
    if labels.is_empty() {
        return match locale {
            Locale::English => "No votes yet".to_string(),
            Locale::Russian => "Голосов пока нет".to_string(),
        };
    }
    match locale {
        Locale::English => format!("Leading: {}", labels.join(", ")),
        Locale::Russian => format!("Лидирует: {}", labels.join(", ")),
    }
}

pub fn use_vote_command(locale: Locale, poll_id: PollId) -> String {
    match locale {
        Locale::English => format!(
            "This poll has too many options for buttons. Vote with `/poll vote id:{} option:<number>`.",
            poll_id
        ),
        Locale::Russian => format!(
            "В опросе слишком много вариантов для кнопок. Голосуйте командой `/poll vote id:{} option:<номер>`",
            poll_id
        ),
    }
}
