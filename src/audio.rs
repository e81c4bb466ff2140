use std::{fs::File, io::BufReader, path::PathBuf, time::Duration};

use log::{info, warn};
use rodio::{source::SineWave, Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use thiserror::Error;

use crate::{alarm::Sound, config::Config};

pub const BEEP_NOTICE: &str = "Could not play alarm sound. Using beep instead.";

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output: {0}")]
    NoOutput(#[from] rodio::StreamError),
    #[error("couldn't open sound file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't decode sound file: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}

/// something that makes the alarm audible
pub trait Player {
    /// starts looping `sound`, replacing whatever was playing
    ///
    /// returns a notice for the user the first time it had to fall back to beeping
    fn play(&mut self, sound: Sound) -> Option<&'static str>;

    fn stop(&mut self);
}

/// what is currently sounding, both stop the same way
pub enum Playback {
    Sound(Sink),
    Beep(Sink),
}

impl std::fmt::Debug for Playback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Sound(_) => "Playback::Sound",
            Self::Beep(_) => "Playback::Beep",
        })
    }
}

impl Playback {
    pub fn stop(self) {
        match self {
            Self::Sound(sink) | Self::Beep(sink) => sink.stop(),
        }
    }
}

/// plays alarm sounds on the default output device
pub struct Audio {
    stream: OutputStream,
    sounds_dir: PathBuf,
    volume: f32,
    playing: Option<Playback>,
    told_about_beep: bool,
}

impl std::fmt::Debug for Audio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Audio")
            .field("sounds_dir", &self.sounds_dir)
            .field("volume", &self.volume)
            .field("playing", &self.playing)
            .finish_non_exhaustive()
    }
}

impl Audio {
    /// # Errors
    /// if there is no output device
    pub fn open(sounds_dir: PathBuf, volume: f32) -> Result<Self, AudioError> {
        let stream = OutputStreamBuilder::open_default_stream()?;
        Ok(Self {
            stream,
            sounds_dir,
            volume: volume.clamp(0.0, 100.0) / 100.0,
            playing: None,
            told_about_beep: false,
        })
    }

    fn sink(&self) -> Sink {
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink
    }

    fn sound(&self, sound: Sound) -> Result<Playback, AudioError> {
        let path = Config::sound_file(&self.sounds_dir, sound);
        let file = File::open(&path).map_err(|source| AudioError::Open { path, source })?;
        // create source that repeatedly plays the sound
        let input = Decoder::new(BufReader::new(file))?.repeat_infinite();
        let sink = self.sink();
        sink.append(input);
        sink.play();
        Ok(Playback::Sound(sink))
    }

    fn beep(&self) -> Playback {
        let (first, rest) = beep_pattern();
        let sink = self.sink();
        sink.append(first);
        sink.append(rest);
        sink.play();
        Playback::Beep(sink)
    }
}

/// an 800 Hz beep every second, sounding straight away and then pausing
fn beep_pattern() -> (impl Source + Send + 'static, impl Source + Send + 'static) {
    let tone = SineWave::new(800.0)
        .take_duration(Duration::from_millis(300))
        .amplify(0.3);
    let rest = tone.clone().delay(Duration::from_millis(700)).repeat_infinite();
    (tone, rest)
}

impl Player for Audio {
    fn play(&mut self, sound: Sound) -> Option<&'static str> {
        self.stop();
        match self.sound(sound) {
            Ok(playback) => {
                info!("playing {sound}");
                self.playing = Some(playback);
                None
            }
            Err(err) => {
                warn!("couldn't play {sound}, beeping instead: {err}");
                self.playing = Some(self.beep());
                if self.told_about_beep {
                    None
                } else {
                    self.told_about_beep = true;
                    Some(BEEP_NOTICE)
                }
            }
        }
    }

    fn stop(&mut self) {
        if let Some(playback) = self.playing.take() {
            playback.stop();
        }
    }
}

/// for machines without an output device, the alarm is only shown
#[derive(Debug, Default)]
pub struct Silent;

impl Player for Silent {
    fn play(&mut self, sound: Sound) -> Option<&'static str> {
        info!("no audio output, not playing {sound}");
        None
    }

    fn stop(&mut self) {}
}
