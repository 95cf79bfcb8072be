//! Break music on the default output device.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;

use narrator_core::model::TrackName;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use services::{BreakAudio, CapabilityError};
use tracing::{debug, info, warn};

type Track = Decoder<BufReader<File>>;

/// Open and decode `track` from `songs_dir`.
pub fn open_track(songs_dir: &Path, track: &TrackName) -> Result<Track, CapabilityError> {
    let path = songs_dir.join(track.as_str());
    let file = File::open(&path)
        .map_err(|err| CapabilityError::Failed(format!("{}: {err}", path.display())))?;
    Decoder::new(BufReader::new(file))
        .map_err(|err| CapabilityError::Failed(format!("{}: {err}", path.display())))
}

/// Keeps the output stream alive. The stream must stay on the thread that
/// opened it; dropping the guard lets that thread exit and closes the device.
struct OutputGuard {
    _hangup: mpsc::Sender<()>,
}

fn open_output() -> Result<(OutputGuard, OutputStreamHandle), CapabilityError> {
    let (ready_tx, ready_rx) = mpsc::sync_channel(1);
    let (hangup_tx, hangup_rx) = mpsc::channel::<()>();

    thread::Builder::new()
        .name("break-audio".into())
        .spawn(move || match OutputStream::try_default() {
            Ok((_stream, handle)) => {
                if ready_tx.send(Ok(handle)).is_ok() {
                    let _ = hangup_rx.recv();
                }
            }
            Err(err) => {
                let _ = ready_tx.send(Err(err.to_string()));
            }
        })
        .map_err(|err| CapabilityError::Failed(err.to_string()))?;

    let handle = ready_rx
        .recv()
        .map_err(|_| CapabilityError::Failed("audio thread exited".into()))?
        .map_err(CapabilityError::Failed)?;
    Ok((OutputGuard { _hangup: hangup_tx }, handle))
}

/// Loops the chosen break track through a rodio `Sink`.
pub struct RodioAudio {
    songs_dir: PathBuf,
    track: Option<TrackName>,
    sink: Sink,
    _output: OutputGuard,
}

impl RodioAudio {
    /// # Errors
    ///
    /// Returns `CapabilityError::Failed` when no output device can be opened.
    pub fn open(songs_dir: impl Into<PathBuf>) -> Result<Self, CapabilityError> {
        let (output, handle) = open_output()?;
        let sink = Sink::try_new(&handle).map_err(|err| CapabilityError::Failed(err.to_string()))?;
        sink.pause();
        Ok(Self {
            songs_dir: songs_dir.into(),
            track: None,
            sink,
            _output: output,
        })
    }

    fn queue(&self, source: Track) {
        self.sink.clear();
        self.sink.append(source.repeat_infinite());
        self.sink.pause();
    }
}

impl BreakAudio for RodioAudio {
    fn load(&mut self, track: &TrackName) -> Result<(), CapabilityError> {
        let source = open_track(&self.songs_dir, track)?;
        self.queue(source);
        self.track = Some(track.clone());
        debug!(%track, "break track loaded");
        Ok(())
    }

    fn play(&mut self) -> Result<(), CapabilityError> {
        let track = self
            .track
            .as_ref()
            .ok_or(CapabilityError::Failed("no track loaded".into()))?;
        self.sink.play();
        info!(%track, "break music playing");
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn reset(&mut self) {
        let Some(track) = &self.track else {
            return;
        };
        match open_track(&self.songs_dir, track) {
            Ok(source) => self.queue(source),
            Err(err) => warn!(%err, "break track could not be rewound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silent_wav(samples: u32) -> Vec<u8> {
        let data_len = samples * 2;
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&8000u32.to_le_bytes());
        wav.extend_from_slice(&16000u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        wav.resize(wav.len() + data_len as usize, 0);
        wav
    }

    #[test]
    fn decodes_wav_tracks() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("calm.wav"), silent_wav(800)).unwrap();

        let track = open_track(dir.path(), &TrackName::new("calm.wav")).unwrap();
        assert_eq!(track.channels(), 1);
        assert_eq!(track.sample_rate(), 8000);
    }

    #[test]
    fn missing_or_corrupt_tracks_fail_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_track(dir.path(), &TrackName::new("absent.mp3")).is_err());

        std::fs::write(dir.path().join("broken.wav"), b"not audio at all").unwrap();
        let Err(err) = open_track(dir.path(), &TrackName::new("broken.wav")) else {
            panic!("garbage decoded as audio");
        };
        assert!(err.to_string().contains("broken.wav"));
    }
}
