//! services/client/src/controller/playback.rs
//!
//! Video playback: the queue of playable items, the selected quality tier, and
//! position-preserving quality switches.

use elearn_core::domain::{ContentId, ContentItem, ContentKind, QualityTier, VideoSources};
use elearn_core::ports::MediaPlayer;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("No playable URI for quality {0}")]
    NoValidUri(QualityTier),
    #[error("No video at position {0}")]
    NoSuchItem(usize),
}

//=========================================================================================
// PlaybackQueue
//=========================================================================================

/// Ordered video items and the index of the one playing.
/// The index always points at an item unless the queue is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackQueue {
    items: Vec<ContentItem>,
    index: usize,
}

impl PlaybackQueue {
    /// Keeps only the video items. `start_index` refers to `items` as given and
    /// must name a video; it is remapped onto the filtered list.
    pub fn new(items: Vec<ContentItem>, start_index: usize) -> Option<Self> {
        if items.get(start_index)?.kind() != ContentKind::Video {
            return None;
        }
        let index = items[..start_index]
            .iter()
            .filter(|item| item.kind() == ContentKind::Video)
            .count();
        let items = items
            .into_iter()
            .filter(|item| item.kind() == ContentKind::Video)
            .collect();
        Some(Self { items, index })
    }

    pub fn current(&self) -> Option<&ContentItem> {
        self.items.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// The items after the current one.
    pub fn upcoming(&self) -> &[ContentItem] {
        self.items.get(self.index + 1..).unwrap_or_default()
    }
}

//=========================================================================================
// MediaHandoff
//=========================================================================================

/// The media a player screen is opened with: the item to play first, the
/// videos that follow it, and the preferred quality tier.
///
/// Passed by value into exactly one player screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHandoff {
    current: ContentItem,
    upcoming: Vec<ContentItem>,
    quality: QualityTier,
}

impl MediaHandoff {
    /// Builds the handoff for `selected` out of a section's content list.
    pub fn for_selection(section_contents: &[ContentItem], selected: &ContentId) -> Option<Self> {
        let videos: Vec<&ContentItem> = section_contents
            .iter()
            .filter(|item| item.kind() == ContentKind::Video)
            .collect();
        let position = videos.iter().position(|item| &item.id == selected)?;
        Some(Self {
            current: videos[position].clone(),
            upcoming: videos[position + 1..].iter().map(|item| (*item).clone()).collect(),
            quality: QualityTier::default(),
        })
    }

    pub fn current(&self) -> &ContentItem {
        &self.current
    }

    pub fn sources(&self) -> Option<&VideoSources> {
        self.current.video_sources()
    }

    pub fn upcoming(&self) -> &[ContentItem] {
        &self.upcoming
    }

    pub fn quality(&self) -> QualityTier {
        self.quality
    }
}

//=========================================================================================
// PlaybackSession
//=========================================================================================

pub struct PlaybackSession<P> {
    player: P,
    queue: PlaybackQueue,
    /// The tier the user asked for. Every item is started on it when it has one.
    preferred: QualityTier,
    /// The tier the current item is actually playing.
    playing: QualityTier,
}

impl<P: MediaPlayer> PlaybackSession<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            queue: PlaybackQueue::default(),
            preferred: QualityTier::default(),
            playing: QualityTier::default(),
        }
    }

    /// Opens a session from a handoff, consuming it.
    pub fn from_handoff(player: P, handoff: MediaHandoff) -> Self {
        let mut session = Self::new(player);
        session.preferred = handoff.quality;
        let mut items = Vec::with_capacity(handoff.upcoming.len() + 1);
        items.push(handoff.current);
        items.extend(handoff.upcoming);
        if let Err(e) = session.load_queue(items, 0) {
            warn!("Handoff could not be played: {}", e);
        }
        session
    }

    pub fn queue(&self) -> &PlaybackQueue {
        &self.queue
    }

    pub fn current(&self) -> Option<&ContentItem> {
        self.queue.current()
    }

    /// The tier the current item is playing.
    pub fn quality(&self) -> QualityTier {
        self.playing
    }

    pub fn preferred_quality(&self) -> QualityTier {
        self.preferred
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Replaces the queue and starts the item at `start_index`.
    /// Leaves everything untouched if that item does not exist or cannot be played.
    pub fn load_queue(
        &mut self,
        items: Vec<ContentItem>,
        start_index: usize,
    ) -> Result<(), PlaybackError> {
        let queue =
            PlaybackQueue::new(items, start_index).ok_or(PlaybackError::NoSuchItem(start_index))?;
        let (tier, uri) = queue
            .current()
            .and_then(|item| self.resolve(item))
            .ok_or(PlaybackError::NoValidUri(self.preferred))?;

        self.queue = queue;
        self.start(tier, uri);
        info!(
            "Loaded {} video(s), starting at {}",
            self.queue.len(),
            self.queue.index()
        );
        Ok(())
    }

    /// Switches the current item to `tier` at the same playback position.
    pub fn select_quality(&mut self, tier: QualityTier) -> Result<(), PlaybackError> {
        let uri = self
            .queue
            .current()
            .and_then(|item| item.video_sources())
            .and_then(|sources| sources.playable_uri(tier))
            .map(str::to_string);
        let Some(uri) = uri else {
            warn!("No valid URL for {}; staying on {}", tier, self.playing);
            return Err(PlaybackError::NoValidUri(tier));
        };
        self.preferred = tier;
        if tier == self.playing {
            return Ok(());
        }

        let position = self.player.position();
        self.player.prepare(&uri);
        self.player.seek_to(position);
        self.player.play();
        self.playing = tier;
        debug!("Quality switched to {} at {:?}", tier, position);
        Ok(())
    }

    /// Called when the current item finishes. Moves to the next item if there
    /// is one; at the end of the queue it holds.
    pub fn advance_on_completion(&mut self) -> Option<&ContentItem> {
        let next = self.queue.index() + 1;
        self.play_index(next).ok()?;
        self.queue.current()
    }

    /// Jumps to an item of the queue, e.g. picked from the "up next" list.
    pub fn select_item(&mut self, index: usize) -> Result<(), PlaybackError> {
        self.play_index(index)
    }

    /// The current item and what follows it, for opening another player screen.
    pub fn handoff_to_next_screen(&self) -> Option<MediaHandoff> {
        let current = self.queue.current()?.clone();
        Some(MediaHandoff {
            current,
            upcoming: self.queue.upcoming().to_vec(),
            quality: self.preferred,
        })
    }

    fn play_index(&mut self, index: usize) -> Result<(), PlaybackError> {
        let item = self
            .queue
            .items
            .get(index)
            .ok_or(PlaybackError::NoSuchItem(index))?;
        let (tier, uri) = self.resolve(item).ok_or_else(|| {
            warn!("Item {} has no playable URI; holding", item.id);
            PlaybackError::NoValidUri(self.preferred)
        })?;
        self.queue.index = index;
        self.start(tier, uri);
        Ok(())
    }

    /// The URI to start `item` with: the preferred tier, or the best available one.
    fn resolve(&self, item: &ContentItem) -> Option<(QualityTier, String)> {
        let sources = item.video_sources()?;
        if let Some(uri) = sources.playable_uri(self.preferred) {
            return Some((self.preferred, uri.to_string()));
        }
        let fallback = sources.first_available()?;
        warn!(
            "{} unavailable for {}; using {}",
            self.preferred, item.id, fallback
        );
        Some((fallback, sources.uri(fallback).to_string()))
    }

    fn start(&mut self, tier: QualityTier, uri: String) {
        self.playing = tier;
        self.player.prepare(&uri);
        self.player.play();
    }
}
