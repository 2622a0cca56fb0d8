//! Background music.
//!
//! One looped track, started on the first successful press and kept
//! playing for the life of the process. Failure to open an output device
//! or decode the file is logged and otherwise ignored; the toy is silent
//! but fully playable without audio.

use std::io::BufReader;
use std::path::{Path, PathBuf};

use rodio::Source;

struct Stream {
    // Held so the output device stays open for the sink's lifetime.
    _stream: rodio::OutputStream,
    _sink: rodio::Sink,
}

pub struct Soundtrack {
    path: PathBuf,
    stream: Option<Stream>,
    attempted: bool,
}

impl Soundtrack {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            stream: None,
            attempted: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.stream.is_some()
    }

    /// Start playback if it has not been attempted yet. Fire-and-forget:
    /// one attempt, errors logged.
    pub fn ensure_started(&mut self) {
        if self.attempted {
            return;
        }
        self.attempted = true;
        match start_looped(&self.path) {
            Ok(stream) => {
                log::info!("soundtrack playing: {}", self.path.display());
                self.stream = Some(stream);
            }
            Err(e) => log::warn!("soundtrack unavailable: {}", e),
        }
    }
}

fn start_looped(path: &Path) -> anyhow::Result<Stream> {
    let (stream, handle) = rodio::OutputStream::try_default()?;
    let sink = rodio::Sink::try_new(&handle)?;
    let file = std::fs::File::open(path)?;
    let source = rodio::Decoder::new(BufReader::new(file))?;
    sink.append(source.repeat_infinite());
    Ok(Stream {
        _stream: stream,
        _sink: sink,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_fatal() {
        let mut soundtrack = Soundtrack::new(PathBuf::from("/nonexistent/minecraft.mp3"));
        soundtrack.ensure_started();
        assert!(!soundtrack.is_playing());
        // Second call is a no-op, not a retry.
        soundtrack.ensure_started();
        assert!(!soundtrack.is_playing());
    }
}
