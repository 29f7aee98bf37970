//! Sequencer and transport: walks the arrangement beat by beat and schedules
//! the synthesizer at tempo-derived intervals
//!
//! All playback state lives on one worker thread. Commands arrive on a
//! channel and the worker blocks in `recv_timeout` until the next beat is
//! due, so a pause or stop is always handled before a stale tick can fire;
//! at most one tick is ever pending.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cadenza_core::{Note, Position, Song};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::synth::{ChordSink, SilentSink, Synthesizer};

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error("Arrangement has no sounding beats")]
    EmptyArrangement,
    #[error("Sequencer worker is no longer running")]
    WorkerGone,
}

/// Transport playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Playing => 1,
            Self::Paused => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Playing,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }
}

enum Command {
    Play,
    Pause,
    Stop,
    Subscribe(Sender<Position>),
    Shutdown,
}

/// State shared between the transport handle and the worker thread. Only the
/// worker mutates `state` and `position`; the handle mutates `song`.
struct SharedState {
    state: AtomicU8,
    position: Mutex<Option<Position>>,
    song: Mutex<Song>,
}

impl SharedState {
    fn new(song: Song) -> Self {
        Self {
            state: AtomicU8::new(TransportState::Stopped.as_u8()),
            position: Mutex::new(None),
            song: Mutex::new(song),
        }
    }

    fn set_state(&self, state: TransportState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn state(&self) -> TransportState {
        TransportState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_position(&self, position: Option<Position>) {
        if let Ok(mut slot) = self.position.lock() {
            *slot = position;
        }
    }
}

/// What the tick found at the cursor after structural skips
enum TickStep {
    /// A beat to sound (or rest through) for this many seconds
    Beat {
        chord: Option<cadenza_core::NashvilleChord>,
        key: Note,
        seconds: f64,
    },
    /// Cursor ran past the last section
    EndOfSong,
}

struct Worker<S: ChordSink> {
    shared: Arc<SharedState>,
    commands: Receiver<Command>,
    sink: S,
    cursor: Position,
    /// When the pending tick fires; None means no tick is pending
    deadline: Option<Instant>,
    subscribers: Vec<Sender<Position>>,
}

impl<S: ChordSink> Worker<S> {
    fn new(shared: Arc<SharedState>, commands: Receiver<Command>, sink: S) -> Self {
        Self {
            shared,
            commands,
            sink,
            cursor: Position::START,
            deadline: None,
            subscribers: Vec::new(),
        }
    }

    fn run(mut self) {
        loop {
            let command = match self.deadline {
                Some(deadline) => {
                    let timeout = deadline.saturating_duration_since(Instant::now());
                    match self.commands.recv_timeout(timeout) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                None => match self.commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => return,
                },
            };

            match command {
                Some(Command::Play) => self.handle_play(),
                Some(Command::Pause) => self.handle_pause(),
                Some(Command::Stop) => self.handle_stop(),
                Some(Command::Subscribe(tx)) => self.subscribers.push(tx),
                Some(Command::Shutdown) => return,
                None => self.tick(),
            }
        }
    }

    fn handle_play(&mut self) {
        match self.shared.state() {
            TransportState::Stopped => {
                self.cursor = Position::START;
                self.shared.set_state(TransportState::Playing);
                self.deadline = Some(Instant::now());
                debug!("Transport: Stopped -> Playing");
            }
            TransportState::Paused => {
                // Resume at the remembered cursor; the immediate tick sounds
                // the beat under it
                self.shared.set_state(TransportState::Playing);
                self.deadline = Some(Instant::now());
                debug!(cursor = %self.cursor, "Transport: Paused -> Playing");
            }
            TransportState::Playing => {}
        }
    }

    fn handle_pause(&mut self) {
        if self.shared.state() != TransportState::Playing {
            return;
        }
        // Cancel the pending tick before any other mutation
        self.deadline = None;
        self.shared.set_state(TransportState::Paused);
        debug!(cursor = %self.cursor, "Transport: Playing -> Paused");
    }

    fn handle_stop(&mut self) {
        self.deadline = None;
        self.cursor = Position::START;
        self.shared.set_position(None);
        self.sink.stop();
        self.shared.set_state(TransportState::Stopped);
        debug!("Transport: Stopped");
    }

    /// Resolve the cursor against the current snapshot, advancing over
    /// exhausted measures and sections with no wall-clock cost
    fn resolve_cursor(&mut self) -> TickStep {
        let Ok(song) = self.shared.song.lock() else {
            return TickStep::EndOfSong;
        };
        loop {
            let Some(section) = song.sections.get(self.cursor.section) else {
                return TickStep::EndOfSong;
            };
            let Some(measure) = section.measures.get(self.cursor.measure) else {
                self.cursor.section += 1;
                self.cursor.measure = 0;
                self.cursor.beat = 0;
                continue;
            };
            let Some(beat) = measure.beats.get(self.cursor.beat) else {
                self.cursor.measure += 1;
                self.cursor.beat = 0;
                continue;
            };
            let beats = if beat.duration > 0.0 { beat.duration } else { 1.0 };
            return TickStep::Beat {
                chord: beat.value.chord().copied(),
                key: song.key,
                seconds: beats as f64 * song.seconds_per_beat(),
            };
        }
    }

    /// One execution per beat while Playing
    fn tick(&mut self) {
        self.deadline = None;

        match self.resolve_cursor() {
            TickStep::EndOfSong => {
                self.cursor = Position::START;
                self.shared.set_position(None);
                self.shared.set_state(TransportState::Stopped);
                debug!("Transport: end of song");
            }
            TickStep::Beat { chord, key, seconds } => {
                // Publish the cursor before any audio is scheduled, so
                // observers always see the beat that is about to sound
                self.shared.set_position(Some(self.cursor));
                let cursor = self.cursor;
                self.subscribers.retain(|tx| tx.send(cursor).is_ok());

                let duration = Duration::from_secs_f64(seconds);
                if let Some(chord) = chord {
                    self.sink.play_chord(&chord, key, duration);
                }

                self.deadline = Some(Instant::now() + duration);
                self.cursor.beat += 1;
            }
        }
    }
}

/// Transport handle exposed to the UI layer.
///
/// Commands are forwarded to the worker thread; `state`, `position` and the
/// song snapshot are shared. Dropping the handle shuts the worker down.
pub struct Sequencer {
    shared: Arc<SharedState>,
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl Sequencer {
    /// Spawn a sequencer backed by the real synthesizer. If the audio
    /// backend cannot be acquired the transport still runs and reports
    /// positions, silently.
    pub fn spawn(song: Song) -> Self {
        Self::with_sink(song, || -> Box<dyn ChordSink> {
            match Synthesizer::new() {
                Ok(synth) => Box::new(synth),
                Err(e) => {
                    warn!("Audio backend unavailable, playback will be silent: {e}");
                    Box::new(SilentSink)
                }
            }
        })
    }

    /// Spawn with a custom audio sink. The factory runs on the worker thread
    /// so the sink itself does not have to be Send.
    pub fn with_sink<S, F>(song: Song, make_sink: F) -> Self
    where
        S: ChordSink + 'static,
        F: FnOnce() -> S + Send + 'static,
    {
        let shared = Arc::new(SharedState::new(song));
        let (commands, command_rx) = unbounded();

        let worker_shared = shared.clone();
        let worker = thread::spawn(move || {
            Worker::new(worker_shared, command_rx, make_sink()).run();
        });
        info!("Sequencer started");

        Self {
            shared,
            commands,
            worker: Some(worker),
        }
    }

    /// Start playback from the top, or resume from the paused cursor
    pub fn play(&self) -> Result<(), SequencerError> {
        let has_sounding = self
            .shared
            .song
            .lock()
            .map(|song| song.has_sounding_beat())
            .unwrap_or(false);
        if !has_sounding {
            return Err(SequencerError::EmptyArrangement);
        }
        self.commands
            .send(Command::Play)
            .map_err(|_| SequencerError::WorkerGone)
    }

    /// Pause, keeping the cursor as the resume point
    pub fn pause(&self) {
        let _ = self.commands.send(Command::Pause);
    }

    /// Stop playback, clear the cursor and cut all in-flight tones
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    pub fn state(&self) -> TransportState {
        self.shared.state()
    }

    pub fn is_playing(&self) -> bool {
        self.state() == TransportState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == TransportState::Paused
    }

    /// Position of the beat currently sounding, if any
    pub fn position(&self) -> Option<Position> {
        self.shared.position.lock().ok().and_then(|slot| *slot)
    }

    /// Replace the song snapshot read by subsequent ticks. A cursor left
    /// stale by the edit is skipped past or stopped on, never fatal.
    pub fn set_song(&self, song: Song) {
        if let Ok(mut slot) = self.shared.song.lock() {
            *slot = song;
        }
    }

    /// Register an observer; every tick publishes the cursor to it before
    /// the corresponding audio is scheduled
    pub fn subscribe(&self) -> Receiver<Position> {
        let (tx, rx) = unbounded();
        let _ = self.commands.send(Command::Subscribe(tx));
        rx
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
