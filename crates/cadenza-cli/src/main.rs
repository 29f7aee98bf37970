//! cadenza-cli: play a chord chart from the terminal
//!
//! Usage: `cadenza [song.json]`. Without an argument a built-in
//! I-V-vi-IV progression in C is played.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use cadenza_core::{Beat, ChordQuality, Measure, NashvilleChord, Note, Section, SectionKind, Song};
use cadenza_services::{Sequencer, TransportState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cadenza=info".parse()?),
        )
        .init();

    let song = match std::env::args().nth(1) {
        Some(path) => {
            let json = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read song file: {path}"))?;
            let song: Song =
                serde_json::from_str(&json).with_context(|| format!("Invalid song JSON: {path}"))?;
            song.validate().context("Song fails its invariants")?;
            song
        }
        None => demo_song(),
    };

    tracing::info!(
        title = %song.title,
        key = %song.key,
        tempo = song.tempo,
        "Playing"
    );

    let sequencer = Sequencer::spawn(song);
    let positions = sequencer.subscribe();

    sequencer.play()?;
    // Block until the first beat sounds (the state flip happens on the
    // worker thread), then print positions until the transport auto-stops
    let Ok(first) = positions.recv() else {
        return Ok(());
    };
    println!("{first}");
    while sequencer.state() != TransportState::Stopped {
        if let Ok(position) = positions.recv_timeout(Duration::from_millis(100)) {
            println!("{position}");
        }
    }

    Ok(())
}

/// Four measures of the I-V-vi-IV progression, one chord per downbeat
fn demo_song() -> Song {
    let mut song = Song::new(Note::C, 120.0);
    song.title = "Demo Progression".to_string();

    let mut section = Section::new(SectionKind::Verse, "Verse 1", 0);
    section.measures = [1u8, 5, 6, 4]
        .into_iter()
        .map(|degree| {
            let quality = if degree == 6 {
                ChordQuality::Minor
            } else {
                ChordQuality::Major
            };
            Measure::from_beats(vec![
                Beat::chord(NashvilleChord::new(degree, quality)).with_duration(4.0),
            ])
        })
        .collect();
    song.sections = vec![section];
    song
}
