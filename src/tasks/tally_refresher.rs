use crate::handlers::card;
use crate::handlers::messages::Locale;
use crate::models::{PollId, VoteCast};
use crate::registry::PollRegistry;
use crate::voting::PollTally;
use log::{debug, error, info, warn};
use serenity::http::Http;
use serenity::model::id::{ChannelId, MessageId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;

/// Only the most recent cards of a poll follow the tally.
const MAX_CARDS_PER_POLL: usize = 10;

/// A posted poll card that should follow the live tally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedCard {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub locale: Locale,
}

#[derive(Default)]
pub struct PollDisplays {
    cards: RwLock<HashMap<PollId, Vec<TrackedCard>>>,
}

impl PollDisplays {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn track(&self, poll_id: PollId, card: TrackedCard) {
        let mut cards = self.cards.write().await;
        let entry = cards.entry(poll_id).or_default();
        if entry.iter().any(|c| c.message_id == card.message_id) {
            return;
        }
        entry.push(card);
        if entry.len() > MAX_CARDS_PER_POLL {
            let excess = entry.len() - MAX_CARDS_PER_POLL;
            entry.drain(..excess);
        }
    }

    pub async fn cards_for(&self, poll_id: PollId) -> Vec<TrackedCard> {
        self.cards.read().await.get(&poll_id).cloned().unwrap_or_default()
    }

    pub async fn forget(&self, poll_id: PollId, message_id: MessageId) {
        let mut cards = self.cards.write().await;
        if let Some(entry) = cards.get_mut(&poll_id) {
            entry.retain(|c| c.message_id != message_id);
            if entry.is_empty() {
                cards.remove(&poll_id);
            }
        }
    }
}

pub async fn refresh_tallies_task(registry: Arc<PollRegistry>, displays: Arc<PollDisplays>, http: Arc<Http>) {
    info!("Starting background task to refresh poll cards on new votes...");
    let mut events = registry.subscribe();

    loop {
        match events.recv().await {
            Ok(event) => refresh_poll(&registry, &displays, &http, &event).await,
            Err(RecvError::Lagged(skipped)) => {
                // Later events still carry the latest tally.
                warn!("Tally refresher skipped {} vote events", skipped);
            }
            Err(RecvError::Closed) => {
                info!("Vote event stream closed, stopping tally refresher.");
                break;
            }
        }
    }
}

async fn refresh_poll(registry: &PollRegistry, displays: &PollDisplays, http: &Arc<Http>, event: &VoteCast) {
    let cards = displays.cards_for(event.poll_id).await;
    if cards.is_empty() {
        return;
    }

    let snapshot = match registry.get_poll(event.poll_id).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to read poll {} for refresh: {}", event.poll_id, e);
            return;
        }
    };
    let tally = PollTally::from_snapshot(&snapshot);
    debug!("Poll {} tally: {}", event.poll_id, tally.raw_results());

    for tracked in cards {
        let result = tracked
            .channel_id
            .edit_message(http, tracked.message_id, |message| {
                message.embed(|e| card::render_card(e, event.poll_id, &tally, tracked.locale))
            })
            .await;

        if let Err(e) = result {
            warn!(
                "Failed to refresh card {} for poll {}, no longer tracking it: {}",
                tracked.message_id, event.poll_id, e
            );
            displays.forget(event.poll_id, tracked.message_id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(message: u64) -> TrackedCard {
        TrackedCard {
            channel_id: ChannelId(1),
            message_id: MessageId(message),
            locale: Locale::English,
        }
    }

    #[tokio::test]
    async fn tracks_each_message_once() {
        let displays = PollDisplays::new();
        displays.track(0, card(10)).await;
        displays.track(0, card(10)).await;
        displays.track(0, card(11)).await;
        assert_eq!(displays.cards_for(0).await, vec![card(10), card(11)]);
        assert!(displays.cards_for(1).await.is_empty());
    }

    #[tokio::test]
    async fn keeps_only_most_recent_cards() {
        let displays = PollDisplays::new();
        for message in 0..10_000 {
            displays.track(0, card(message)).await;
        }

        let kept = displays.cards_for(0).await;
        let expected: Vec<TrackedCard> = (9_990..10_000).map(card).collect();
        assert_eq!(kept.len(), MAX_CARDS_PER_POLL);
        assert_eq!(kept, expected);
    }

    #[tokio::test]
    async fn forgets_cards() {
        let displays = PollDisplays::new();
        displays.track(0, card(10)).await;
        displays.forget(0, MessageId(10)).await;
        assert!(displays.cards_for(0).await.is_empty());
    }
}
