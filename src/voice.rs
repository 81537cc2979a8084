//! The voice engine.
//!
//! A [`Voice`] is shared between three independently clocked contexts:
//!
//!  * the capture callback, calling [`Voice::read_audio_data`],
//!  * the game's update loop, calling [`Voice::update`], [`Voice::send`],
//!    [`Voice::receive`] and the settings/speaker controls,
//!  * the output callback, calling [`Voice::mix`].
//!
//! Neither audio callback ever waits on the update loop: each takes only
//! short, bounded locks (or skips its work when a lock is contended), and
//! errors they encounter are queued for the next update tick.

use crate::{
    backend::AudioBackend,
    capture::{decibels, decibels_of_blocks, ActivityGate, CaptureQueue, RawAudioChunk},
    codec::EncoderPipeline,
    config::Config,
    constants::SILENCE_DB,
    error::{Error, Result},
    id::SpeakerId,
    mixer::{self, PositionalAttenuation},
    packet,
    settings::{ChannelMode, InputMode, VoiceSettings},
    speaker::{AtomicF32, Speaker, SpeakerHandle, SpeakerState},
};
use dashmap::DashMap;
use derivative::Derivative;
use flume::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};
use tracing::{debug, error, info, instrument, trace, warn};

const NO_LOCAL_SPEAKER: u32 = u32::MAX;

/// Outcome of a single [`Voice::update`] tick.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct TickReport {
    /// Whether local audio was transmitted this tick.
    pub transmitting: bool,
    /// Loudness of audio captured since the last tick, after input volume.
    pub level: f32,
    /// Frames encoded and queued for [`Voice::send`].
    pub encoded_frames: usize,
    /// Captured chunks discarded without encoding.
    pub dropped_chunks: usize,
    /// Speakers which went idle this tick.
    pub idled: Vec<SpeakerId>,
    /// Errors raised inside audio callbacks since the last tick, or by
    /// this tick's own work.
    pub errors: Vec<Error>,
    /// Settings which should now be written to the config store.
    pub save: Option<VoiceSettings>,
}

#[derive(Debug, Default)]
struct MixScratch {
    acc: Vec<i32>,
    pull: Vec<i16>,
    snapshot: Vec<SpeakerHandle>,
}

/// Real-time voice chat engine.
///
/// Construct with [`Voice::new`], then call [`Voice::init`] before use.
/// Hosts typically hold the engine in an [`Arc`] and hand clones to their
/// audio callbacks. Dropping the last handle (or calling
/// [`Voice::shutdown`]) waits for in-flight callbacks before releasing
/// codec state.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Voice {
    config: Config,
    #[derivative(Debug = "ignore")]
    backend: Arc<dyn AudioBackend>,
    epoch: Instant,

    // Held for reading by each audio callback; taken for writing on teardown.
    lifecycle: RwLock<bool>,
    initialised: AtomicBool,

    settings: Mutex<VoiceSettings>,
    enabled: AtomicBool,
    output_volume: AtomicF32,
    input_volume: AtomicF32,
    next_save: Mutex<Option<Instant>>,

    device_open: AtomicBool,
    device_channels: AtomicUsize,
    capture: Mutex<CaptureQueue>,
    captured_frames: AtomicU64,

    gate: Mutex<ActivityGate>,
    encoder: Mutex<Option<EncoderPipeline>>,

    speakers: DashMap<SpeakerId, SpeakerHandle>,
    local: Mutex<Option<SpeakerHandle>>,
    local_id: AtomicU32,
    active: Mutex<HashMap<SpeakerId, SpeakerHandle>>,
    #[derivative(Debug = "ignore")]
    mix_scratch: Mutex<MixScratch>,

    errors_tx: Sender<Error>,
    errors_rx: Receiver<Error>,
}

impl Voice {
    /// Creates an uninitialised engine.
    pub fn new(backend: Arc<dyn AudioBackend>, config: Config, settings: VoiceSettings) -> Self {
        let (errors_tx, errors_rx) = flume::bounded(config.callback_error_capacity.max(1));
        let gate = ActivityGate::new(
            settings.input_mode,
            settings.threshold,
            config.hold_over,
            config.push_to_talk_window,
        );

        Self {
            backend,
            epoch: Instant::now(),
            lifecycle: RwLock::new(false),
            initialised: AtomicBool::new(false),
            enabled: AtomicBool::new(settings.enabled),
            output_volume: AtomicF32::new(settings.output_volume),
            input_volume: AtomicF32::new(settings.input_volume),
            settings: Mutex::new(settings),
            next_save: Mutex::new(None),
            device_open: AtomicBool::new(false),
            device_channels: AtomicUsize::new(1),
            capture: Mutex::new(CaptureQueue::new(config.max_capture_samples)),
            captured_frames: AtomicU64::new(0),
            gate: Mutex::new(gate),
            encoder: Mutex::new(None),
            speakers: DashMap::new(),
            local: Mutex::new(None),
            local_id: AtomicU32::new(NO_LOCAL_SPEAKER),
            active: Mutex::new(HashMap::new()),
            mix_scratch: Mutex::new(MixScratch::default()),
            errors_tx,
            errors_rx,
            config,
        }
    }

    /// Builds the encoder and opens the capture device.
    ///
    /// Codec construction failure is returned and leaves the engine
    /// disabled. Failure to open the capture device is not fatal: it is
    /// logged, reported by the next [`update`], and capture stays off.
    ///
    /// [`update`]: Voice::update
    #[instrument(skip(self))]
    pub fn init(&self) -> Result<()> {
        if self.is_initialised() {
            return Ok(());
        }

        let mode = self.settings.lock().channel_mode;
        let pipeline = EncoderPipeline::new(mode).map_err(|e| {
            error!("Failed to create voice encoder: {}", e);
            e
        })?;
        *self.encoder.lock() = Some(pipeline);

        *self.lifecycle.write() = true;
        self.initialised.store(true, Ordering::Release);
        info!("Voice engine initialised ({:?}).", mode);

        if let Err(e) = self.open_device() {
            self.report(e);
        }

        Ok(())
    }

    /// Whether [`init`] has succeeded and the engine has not been shut down.
    ///
    /// [`init`]: Voice::init
    pub fn is_initialised(&self) -> bool {
        self.initialised.load(Ordering::Acquire)
    }

    /// Tears the engine down.
    ///
    /// Closes capture, waits for any in-flight audio callbacks to finish,
    /// then releases the encoder and every speaker's decoders. Safe to call
    /// more than once.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        self.close_device();

        // Blocks until every callback holding a read guard has returned.
        *self.lifecycle.write() = false;

        if self.initialised.swap(false, Ordering::AcqRel) {
            debug!("Releasing codec state.");
        }

        self.encoder.lock().take();
        self.active.lock().clear();
        *self.local.lock() = None;
        self.local_id.store(NO_LOCAL_SPEAKER, Ordering::Release);
        for entry in self.speakers.iter() {
            entry.value().transition(SpeakerState::Removed);
        }
        self.speakers.clear();
        self.capture.lock().drain();
    }

    /// Engine tuning in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // ---- Settings ----

    /// Applies a settings document.
    ///
    /// Parse errors are returned and leave all settings untouched. A
    /// capture device failure is returned after all other settings apply.
    pub fn load_json(&self, config: &Value) -> Result<()> {
        let next = VoiceSettings::from_json(config)?;
        self.apply_settings(next)
    }

    /// Serialises the current settings.
    pub fn save_json(&self) -> Value {
        self.settings.lock().to_json()
    }

    /// Snapshot of the current settings.
    pub fn settings(&self) -> VoiceSettings {
        self.settings.lock().clone()
    }

    /// Replaces all settings at once.
    pub fn apply_settings(&self, next: VoiceSettings) -> Result<()> {
        let prev = {
            let mut settings = self.settings.lock();
            std::mem::replace(&mut *settings, next.clone())
        };

        if prev == next {
            return Ok(());
        }

        self.enabled.store(next.enabled, Ordering::Release);
        self.output_volume.store(next.output_volume);
        self.input_volume.store(next.input_volume);
        {
            let mut gate = self.gate.lock();
            gate.set_mode(next.input_mode);
            gate.set_threshold(next.threshold);
        }

        let mut out = Ok(());
        if prev.channel_mode != next.channel_mode {
            out = self.reset_encoder(next.channel_mode);
        }

        if prev.wants_capture() != next.wants_capture()
            || prev.device_name != next.device_name
            || prev.channel_mode != next.channel_mode
        {
            let reopened = self.reopen_device(prev.device_name);
            out = out.and(reopened);
        }

        self.schedule_save();
        out
    }

    fn update_settings(&self, f: impl FnOnce(&mut VoiceSettings)) -> Result<()> {
        let mut next = self.settings();
        f(&mut next);
        self.apply_settings(next)
    }

    /// Enables or disables voice chat entirely.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        self.update_settings(|s| s.enabled = enabled)
    }

    /// Enables or disables microphone capture.
    pub fn set_input_enabled(&self, input_enabled: bool) -> Result<()> {
        self.update_settings(|s| s.input_enabled = input_enabled)
    }

    /// Selects the transmission policy.
    pub fn set_input_mode(&self, input_mode: InputMode) -> Result<()> {
        self.update_settings(|s| s.input_mode = input_mode)
    }

    /// Selects the outbound channel layout, rebuilding the encoder.
    pub fn set_channel_mode(&self, channel_mode: ChannelMode) -> Result<()> {
        self.update_settings(|s| s.channel_mode = channel_mode)
    }

    /// Sets the gain applied to all mixed voices.
    pub fn set_output_volume(&self, volume: f32) -> Result<()> {
        self.update_settings(|s| s.output_volume = volume.max(0.0))
    }

    /// Sets the gain applied to captured audio.
    pub fn set_input_volume(&self, volume: f32) -> Result<()> {
        self.update_settings(|s| s.input_volume = volume.max(0.0))
    }

    /// Sets the voice activity threshold, in decibels.
    pub fn set_threshold(&self, threshold: f32) -> Result<()> {
        self.update_settings(|s| s.threshold = threshold)
    }

    /// Closes and reopens capture on the named device.
    ///
    /// If the device cannot be opened, capture stays disabled, the previous
    /// device name is kept, and the device error is returned.
    pub fn set_device_name(&self, device_name: Option<String>) -> Result<()> {
        let unchanged = self.settings.lock().device_name == device_name;
        if unchanged && !self.device_open() {
            // Same device, but the last open failed: try again.
            return self.open_device();
        }

        self.update_settings(|s| s.device_name = device_name)
    }

    fn schedule_save(&self) {
        *self.next_save.lock() = Some(Instant::now() + self.config.save_delay);
    }

    /// Number of channels currently being encoded.
    pub fn encoder_channels(&self) -> usize {
        self.settings.lock().channel_mode.channels()
    }

    fn reset_encoder(&self, mode: ChannelMode) -> Result<()> {
        if !self.is_initialised() {
            return Ok(());
        }

        let mut encoder = self.encoder.lock();
        let out = match encoder.as_mut() {
            Some(enc) => enc.reset(mode),
            None => EncoderPipeline::new(mode).map(|enc| {
                *encoder = Some(enc);
            }),
        };

        if let Err(e) = &out {
            error!("Failed to rebuild voice encoder: {}", e);
        }

        out
    }

    // ---- Capture device ----

    fn open_device(&self) -> Result<()> {
        self.close_device();

        let (wants, name, channels) = {
            let s = self.settings.lock();
            (s.wants_capture(), s.device_name.clone(), s.channel_mode.channels())
        };

        if !wants || !self.is_initialised() {
            return Ok(());
        }

        match self.backend.open_capture(name.as_deref(), channels as u16) {
            Ok(format) => {
                self.device_channels
                    .store(usize::from(format.channels.max(1)), Ordering::Release);
                self.device_open.store(true, Ordering::Release);
                info!(
                    "Opened capture device {:?} ({} channels).",
                    name.as_deref().unwrap_or("<default>"),
                    format.channels
                );
                Ok(())
            },
            Err(e) => {
                warn!("Failed to open capture device {:?}: {}", name, e);
                Err(e.into())
            },
        }
    }

    fn reopen_device(&self, last_good: Option<String>) -> Result<()> {
        let out = self.open_device();
        if out.is_err() {
            self.settings.lock().device_name = last_good;
        }
        out
    }

    fn close_device(&self) {
        if self.device_open.swap(false, Ordering::AcqRel) {
            self.backend.close_capture();
            debug!("Closed capture device.");
        }
        self.capture.lock().drain();
    }

    /// Whether a capture device is currently open.
    pub fn device_open(&self) -> bool {
        self.device_open.load(Ordering::Acquire)
    }

    // ---- Audio callbacks ----

    fn report(&self, e: Error) {
        if self.errors_tx.try_send(e).is_err() {
            trace!("Callback error backlog full.");
        }
    }

    /// Capture callback entry point.
    ///
    /// Accepts 16-bit little-endian interleaved PCM. Never blocks on the
    /// update loop; errors are queued for the next [`update`].
    ///
    /// [`update`]: Voice::update
    pub fn read_audio_data(&self, bytes: &[u8]) {
        let open = match self.lifecycle.try_read() {
            Some(guard) => guard,
            None => return,
        };

        if !*open || !self.device_open.load(Ordering::Acquire) {
            return;
        }

        if bytes.len() % 2 != 0 {
            self.report(Error::CaptureFormat(bytes.len()));
        }

        let chunk = RawAudioChunk::from_le_bytes(bytes);
        if chunk.is_exhausted() {
            return;
        }

        let frames = chunk.remaining() / self.device_channels.load(Ordering::Acquire).max(1);
        let evicted = self.capture.lock().push(chunk);
        self.captured_frames
            .fetch_add(frames as u64, Ordering::Relaxed);

        if evicted != 0 {
            trace!("Capture backlog full: evicted {} chunks.", evicted);
        }
    }

    /// Total frames delivered by the capture device.
    pub fn captured_frames(&self) -> u64 {
        self.captured_frames.load(Ordering::Relaxed)
    }

    /// Output callback entry point.
    ///
    /// Adds every active, unmuted remote speaker into `buffer`, which holds
    /// `frames * channels` interleaved samples. Existing contents are kept
    /// and mixed over. Never blocks: contended speakers are skipped for
    /// this callback.
    pub fn mix(&self, buffer: &mut [i16], frames: usize, channels: u16) {
        let open = match self.lifecycle.try_read() {
            Some(guard) => guard,
            None => return,
        };

        if !*open || !self.enabled.load(Ordering::Acquire) {
            return;
        }

        if channels == 0 {
            self.report(Error::MixChannels(channels));
            return;
        }

        let channels = usize::from(channels);
        let needed = match frames.checked_mul(channels) {
            Some(n) if n <= buffer.len() => n,
            needed => {
                self.report(Error::MixBuffer {
                    needed: needed.unwrap_or(usize::MAX),
                    available: buffer.len(),
                });
                return;
            },
        };

        let mut scratch = match self.mix_scratch.try_lock() {
            Some(s) => s,
            None => return,
        };
        let MixScratch {
            acc,
            pull,
            snapshot,
        } = &mut *scratch;

        snapshot.clear();
        snapshot.extend(self.active.lock().values().cloned());

        acc.clear();
        acc.resize(needed, 0);
        pull.resize(frames * 2, 0);

        let local = self.local_id.load(Ordering::Acquire);
        let mut mixed = false;

        for speaker in snapshot.drain(..) {
            if u32::from(speaker.id().get()) == local {
                continue;
            }

            let gains = speaker.channel_volumes();
            let volume = speaker.volume();
            if speaker.muted() || !mixer::is_audible(gains, volume) {
                speaker.set_decibel_level(SILENCE_DB);
                continue;
            }

            let n = match speaker.stream.try_lock() {
                Some(mut stream) => stream.pull(&mut pull[..]),
                None => {
                    trace!("Speaker {} busy, skipping this callback.", speaker.id());
                    continue;
                },
            };

            if n == 0 {
                speaker.set_decibel_level(SILENCE_DB);
                continue;
            }

            speaker.set_decibel_level(decibels(&pull[..n]));
            mixer::mix_stereo_into(&pull[..n], acc, channels, gains, volume);
            mixed = true;
        }

        if mixed {
            mixer::finish_into(acc, &mut buffer[..needed], self.output_volume.load());
        }
    }

    // ---- Update loop ----

    /// Records the push-to-talk state.
    ///
    /// Must be renewed every frame while the key is held; each call
    /// expires after the configured window (1 second by default).
    pub fn set_input(&self, active: bool) {
        self.set_input_at(active, Instant::now());
    }

    /// As [`set_input`], at an explicit time.
    ///
    /// [`set_input`]: Voice::set_input
    pub fn set_input_at(&self, active: bool, now: Instant) {
        self.gate.lock().set_input(active, now);
    }

    /// Whether the last tick decided to transmit.
    pub fn is_transmitting(&self) -> bool {
        self.gate.lock().is_transmitting()
    }

    /// Runs one update tick.
    ///
    /// Evaluates the speech-activity gate over audio captured since the last
    /// tick, encodes or discards it, refreshes each speaker's positional
    /// gains (full volume if `attenuation` is `None`), idles silent
    /// speakers, and reports queued callback errors.
    pub fn update(&self, attenuation: Option<PositionalAttenuation<'_>>) -> TickReport {
        self.update_at(Instant::now(), attenuation)
    }

    /// As [`update`], at an explicit time.
    ///
    /// [`update`]: Voice::update
    #[instrument(skip(self, attenuation), level = "trace")]
    pub fn update_at(
        &self,
        now: Instant,
        attenuation: Option<PositionalAttenuation<'_>>,
    ) -> TickReport {
        let mut report = TickReport {
            level: SILENCE_DB,
            errors: self.errors_rx.try_iter().collect(),
            ..Default::default()
        };

        for e in &report.errors {
            warn!("Audio callback error: {}", e);
        }

        if !self.is_initialised() {
            return report;
        }

        self.tick_capture(now, &mut report);
        self.tick_speakers(now, attenuation, &mut report);

        let mut next_save = self.next_save.lock();
        if next_save.map_or(false, |due| now >= due) {
            *next_save = None;
            report.save = Some(self.settings());
        }

        report
    }

    fn tick_capture(&self, now: Instant, report: &mut TickReport) {
        let chunks = self.capture.lock().drain();
        let input_volume = self.input_volume.load();

        report.level = decibels_of_blocks(chunks.iter().map(RawAudioChunk::samples), input_volume);
        if let Some(local) = self.local.lock().as_ref() {
            local.set_decibel_level(report.level);
        }

        let capturing = self.device_open.load(Ordering::Acquire);
        report.transmitting = self.gate.lock().evaluate(report.level, now) && capturing;

        let mut encoder = self.encoder.lock();
        let enc = match encoder.as_mut() {
            Some(enc) => enc,
            None => {
                report.dropped_chunks += chunks.len();
                return;
            },
        };

        if !report.transmitting {
            report.dropped_chunks += chunks.len();
            enc.clear_partial();
            return;
        }

        let device_channels = self.device_channels.load(Ordering::Acquire);
        for mut chunk in chunks {
            if enc.pending_bytes() >= self.config.max_pending_bytes {
                report.dropped_chunks += 1;
                continue;
            }

            report.encoded_frames += enc.push_chunk(&mut chunk, device_channels, input_volume);
        }
    }

    fn tick_speakers(
        &self,
        now: Instant,
        attenuation: Option<PositionalAttenuation<'_>>,
        report: &mut TickReport,
    ) {
        for entry in self.speakers.iter() {
            let speaker = entry.value();
            let gains = match attenuation {
                Some(f) => {
                    let pos = speaker.position();
                    mixer::gains_from_attenuation(f(0, pos, 1.0), f(1, pos, 1.0))
                },
                None => [1.0, 1.0],
            };
            speaker.set_channel_volumes(gains);
        }

        let now_stamp = self.stamp(now);
        let idle_after = self.config.speaker_idle_timeout.as_nanos() as u64;
        let mut idled = vec![];

        self.active.lock().retain(|id, speaker| {
            let alive = speaker
                .last_decoded()
                .map_or(false, |t| now_stamp.saturating_sub(t) < idle_after);
            if !alive {
                speaker.transition(SpeakerState::Idle);
                idled.push(speaker.clone());
                report.idled.push(*id);
            }
            alive
        });

        for speaker in idled {
            if speaker.state() == SpeakerState::Idle {
                speaker.stream.lock().clear();
                speaker.set_decibel_level(SILENCE_DB);
            }
            debug!("Speaker {} is now idle.", speaker.id());
        }
    }

    fn stamp(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.epoch).as_nanos() as u64
    }

    // ---- Network ----

    /// Writes pending encoded audio into `out`, up to `budget` bytes.
    ///
    /// See [`packet::send`] for the exact contract. Returns the number of
    /// frames written.
    pub fn send(&self, out: &mut Vec<u8>, budget: usize) -> usize {
        match self.encoder.lock().as_mut() {
            Some(enc) => packet::send(enc, out, budget),
            None => 0,
        }
    }

    /// Number of encoded frames awaiting [`send`].
    ///
    /// [`send`]: Voice::send
    pub fn pending_frames(&self) -> usize {
        self.encoder.lock().as_ref().map_or(0, EncoderPipeline::pending_len)
    }

    /// Decodes every frame of a received packet into `speaker`'s stream.
    ///
    /// Frames which fail to decode are logged and skipped. Returns the
    /// number of frames decoded, or the last error if none were.
    pub fn receive(&self, speaker: &SpeakerHandle, packet: &[u8]) -> Result<usize> {
        self.receive_at(speaker, packet, Instant::now())
    }

    /// As [`receive`], at an explicit time.
    ///
    /// [`receive`]: Voice::receive
    pub fn receive_at(&self, speaker: &SpeakerHandle, packet: &[u8], now: Instant) -> Result<usize> {
        if !self.is_initialised() {
            return Err(Error::Uninitialised);
        }

        let mut decoded = 0;
        let mut last_err = None;

        for frame in packet::frames(packet)? {
            let res = frame.and_then(|f| self.receive_frame_at(speaker, f, now));
            match res {
                Ok(()) => decoded += 1,
                Err(e) if e.is_recoverable() || matches!(e, Error::Opus(_)) => {
                    warn!("Dropping frame from speaker {}: {}", speaker.id(), e);
                    last_err = Some(e);
                },
                Err(e) => return Err(e),
            }
        }

        match (decoded, last_err) {
            (0, Some(e)) => Err(e),
            (n, _) => Ok(n),
        }
    }

    /// Decodes a single frame into `speaker`'s playback stream, marking
    /// the speaker active.
    ///
    /// Audio addressed to the local speaker is ignored.
    pub fn receive_frame(&self, speaker: &SpeakerHandle, frame: &[u8]) -> Result<()> {
        self.receive_frame_at(speaker, frame, Instant::now())
    }

    fn receive_frame_at(&self, speaker: &SpeakerHandle, frame: &[u8], now: Instant) -> Result<()> {
        if !self.is_initialised() {
            return Err(Error::Uninitialised);
        }

        if self.is_local(speaker.id()) {
            trace!("Ignoring audio for the local speaker.");
            return Ok(());
        }

        if speaker.state() == SpeakerState::Removed {
            trace!("Ignoring audio for departed speaker {}.", speaker.id());
            return Ok(());
        }

        {
            let mut decoders = speaker.decoders.lock();
            let pcm = decoders.decode(frame)?;
            let dropped = speaker.stream.lock().push(pcm);
            if dropped != 0 {
                trace!("Speaker {} overflowed by {} samples.", speaker.id(), dropped);
            }
        }

        speaker.mark_decoded(self.stamp(now));

        let mut active = self.active.lock();
        match speaker.state() {
            SpeakerState::Bound | SpeakerState::Idle => {
                speaker.transition(SpeakerState::Active);
                active.insert(speaker.id(), speaker.clone());
            },
            SpeakerState::Active => {
                active.entry(speaker.id()).or_insert_with(|| speaker.clone());
            },
            SpeakerState::Removed => {},
        }

        Ok(())
    }

    // ---- Speakers ----

    fn is_local(&self, id: SpeakerId) -> bool {
        self.local_id.load(Ordering::Acquire) == u32::from(id.get())
    }

    /// Looks up a speaker, creating and binding it on first reference.
    pub fn speaker(&self, id: SpeakerId) -> Result<SpeakerHandle> {
        if let Some(existing) = self.speakers.get(&id) {
            return Ok(Arc::clone(existing.value()));
        }

        let speaker = Arc::new(Speaker::new(id, &self.config)?);
        let entry = self.speakers.entry(id).or_insert(speaker);
        debug!("Bound speaker {}.", id);
        Ok(Arc::clone(entry.value()))
    }

    /// Looks up a speaker without creating it.
    pub fn existing_speaker(&self, id: SpeakerId) -> Option<SpeakerHandle> {
        self.speakers.get(&id).map(|s| Arc::clone(s.value()))
    }

    /// Lifecycle state of `id`, or `None` if it was never bound or has
    /// been removed.
    pub fn speaker_state(&self, id: SpeakerId) -> Option<SpeakerState> {
        self.speakers.get(&id).map(|s| s.value().state())
    }

    /// All bound speakers, ordered by id.
    pub fn speakers(&self) -> Vec<SpeakerHandle> {
        let mut out: Vec<SpeakerHandle> =
            self.speakers.iter().map(|s| Arc::clone(s.value())).collect();
        out.sort_by_key(|s| s.id());
        out
    }

    /// Removes a departed participant.
    pub fn remove_speaker(&self, id: SpeakerId) -> Option<SpeakerHandle> {
        let (_, speaker) = self.speakers.remove(&id)?;
        self.active.lock().remove(&id);
        speaker.transition(SpeakerState::Removed);
        speaker.stream.lock().clear();

        if self.is_local(id) {
            *self.local.lock() = None;
            self.local_id.store(NO_LOCAL_SPEAKER, Ordering::Release);
        }

        debug!("Removed speaker {}.", id);
        Some(speaker)
    }

    /// Binds the local player's own speaker. Call on entering a world.
    ///
    /// The local speaker is never mixed. Within a session its id is fixed:
    /// rebinding with the same id returns the existing speaker, and a
    /// different id fails until [`clear_local_speaker`] ends the session.
    ///
    /// [`clear_local_speaker`]: Voice::clear_local_speaker
    pub fn set_local_speaker(&self, id: SpeakerId) -> Result<SpeakerHandle> {
        let mut local = self.local.lock();
        if let Some(existing) = local.as_ref() {
            return if existing.id() == id {
                Ok(existing.clone())
            } else {
                Err(Error::LocalSpeakerBound(existing.id()))
            };
        }

        let speaker = self.speaker(id)?;
        self.local_id.store(u32::from(id.get()), Ordering::Release);
        self.active.lock().remove(&id);
        *local = Some(speaker.clone());
        info!("Local speaker bound to {}.", id);

        Ok(speaker)
    }

    /// The local player's speaker, if bound.
    pub fn local_speaker(&self) -> Option<SpeakerHandle> {
        self.local.lock().clone()
    }

    /// Ends the local session, unbinding and removing the local speaker.
    pub fn clear_local_speaker(&self) -> Option<SpeakerHandle> {
        let id = self.local.lock().as_ref().map(|s| s.id())?;
        self.remove_speaker(id)
    }
}

impl Drop for Voice {
    fn drop(&mut self) {
        self.shutdown();
    }
}
