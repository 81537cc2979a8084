//! Per-participant voice state.

mod atomic;
mod state;
mod stream;

pub use self::{state::SpeakerState, stream::PlaybackStream};
pub(crate) use self::{atomic::*, state::AtomicState};

use crate::{
    codec::SpeakerDecoders,
    config::Config,
    constants::SILENCE_DB,
    error::Result,
    id::{EntityId, SpeakerId},
};
use parking_lot::{Mutex, RwLock};
use std::sync::{
    atomic::{AtomicBool, AtomicI32, AtomicU64, Ordering},
    Arc,
};

/// Shared handle to a [`Speaker`].
pub type SpeakerHandle = Arc<Speaker>;

/// A position in the game world.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
}

impl Position {
    /// Creates a new position.
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A voice participant, local or remote.
///
/// Fields read by the mixer (mute, volume, channel gains and level) are
/// atomics and never need a lock. Decoders are only touched by the update
/// loop, and the playback stream sits behind its own short-lived lock
/// shared with the mixer.
#[derive(Debug)]
pub struct Speaker {
    id: SpeakerId,
    entity_id: AtomicI32,
    name: RwLock<String>,
    position: AtomicF32Pair,

    muted: AtomicBool,
    volume: AtomicF32,
    channel_volumes: AtomicF32Pair,
    decibel_level: AtomicF32,
    state: AtomicState,

    pub(crate) decoders: Mutex<SpeakerDecoders>,
    pub(crate) stream: Mutex<PlaybackStream>,
    // Engine-relative nanoseconds of the last decoded frame, plus one.
    last_decode: AtomicU64,
}

impl Speaker {
    /// Creates a bound speaker, building its decoders.
    pub fn new(id: SpeakerId, config: &Config) -> Result<Self> {
        Ok(Self {
            id,
            entity_id: AtomicI32::new(0),
            name: RwLock::new("Unnamed".into()),
            position: AtomicF32Pair::default(),
            muted: AtomicBool::new(false),
            volume: AtomicF32::new(1.0),
            channel_volumes: AtomicF32Pair::new([1.0, 1.0]),
            decibel_level: AtomicF32::new(SILENCE_DB),
            state: AtomicState::new(SpeakerState::Bound),
            decoders: Mutex::new(SpeakerDecoders::new()?),
            stream: Mutex::new(PlaybackStream::new(
                config.minimum_play_samples,
                config.max_buffered_samples,
            )),
            last_decode: AtomicU64::new(0),
        })
    }

    /// Network id of this speaker.
    pub fn id(&self) -> SpeakerId {
        self.id
    }

    /// In-world entity controlled by this speaker.
    pub fn entity_id(&self) -> EntityId {
        self.entity_id.load(Ordering::Acquire).into()
    }

    /// Sets the in-world entity controlled by this speaker.
    pub fn set_entity_id(&self, entity_id: EntityId) {
        self.entity_id.store(entity_id.get(), Ordering::Release);
    }

    /// Display name.
    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    /// Sets the display name.
    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.write() = name.into();
    }

    /// World position, used for positional attenuation.
    pub fn position(&self) -> Position {
        let [x, y] = self.position.load();
        Position { x, y }
    }

    /// Sets the world position.
    pub fn set_position(&self, position: Position) {
        self.position.store([position.x, position.y]);
    }

    /// Whether this speaker is excluded from the mix.
    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::Acquire)
    }

    /// Mutes or unmutes this speaker.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::Release);
    }

    /// Per-speaker gain chosen by the local player.
    pub fn volume(&self) -> f32 {
        self.volume.load()
    }

    /// Sets the per-speaker gain.
    pub fn set_volume(&self, volume: f32) {
        self.volume.store(volume.max(0.0));
    }

    /// Left/right gains after positional attenuation.
    pub fn channel_volumes(&self) -> [f32; 2] {
        self.channel_volumes.load()
    }

    pub(crate) fn set_channel_volumes(&self, volumes: [f32; 2]) {
        self.channel_volumes.store(volumes);
    }

    /// Most recent loudness estimate, in decibels.
    pub fn decibel_level(&self) -> f32 {
        self.decibel_level.load()
    }

    pub(crate) fn set_decibel_level(&self, level: f32) {
        self.decibel_level.store(level);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SpeakerState {
        self.state.load()
    }

    pub(crate) fn transition(&self, next: SpeakerState) -> bool {
        self.state.transition(next)
    }

    pub(crate) fn mark_decoded(&self, stamp: u64) {
        self.last_decode
            .store(stamp.saturating_add(1), Ordering::Release);
    }

    pub(crate) fn last_decoded(&self) -> Option<u64> {
        match self.last_decode.load(Ordering::Acquire) {
            0 => None,
            t => Some(t - 1),
        }
    }

    /// Whether decoded audio is currently being played out.
    pub fn playing(&self) -> bool {
        self.state() == SpeakerState::Active && self.stream.lock().is_playing()
    }
}
