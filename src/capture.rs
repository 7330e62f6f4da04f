//! Device-facing collaborators: speech-to-text, speech synthesis and camera.
//!
//! The engine only sees the traits. The shipped implementations are the
//! console and scripted variants the CLI and the tests use.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

use crate::error::{CoachError, CoachResult};

/// Text captured during one recording.
///
/// Finalized results are kept in order; the interim result is whatever the
/// recognizer is still working on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptBuffer {
    finals: Vec<String>,
    interim: Option<String>,
}

impl TranscriptBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalized result and drops the interim one.
    pub fn push_final(&mut self, text: impl Into<String>) {
        self.finals.push(text.into());
        self.interim = None;
    }

    pub fn set_interim(&mut self, text: impl Into<String>) {
        self.interim = Some(text.into());
    }

    pub fn interim(&self) -> Option<&str> {
        self.interim.as_deref()
    }

    pub fn clear(&mut self) {
        self.finals.clear();
        self.interim = None;
    }

    pub fn is_empty(&self) -> bool {
        self.finals.is_empty()
    }

    /// Finalized results joined with single spaces.
    pub fn joined(&self) -> String {
        self.finals.join(" ")
    }
}

/// Continuous speech recognition.
#[async_trait]
pub trait SpeechToText: Send {
    /// Starts a fresh capture, discarding anything from the previous one.
    async fn start(&mut self) -> CoachResult<()>;

    /// Stops capture and returns what was recognized since `start`.
    async fn stop(&mut self) -> CoachResult<TranscriptBuffer>;

    fn is_listening(&self) -> bool;
}

/// Speech synthesis of one utterance at a time.
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text`, cancelling any utterance in progress.
    fn speak(&self, text: &str);

    fn cancel(&self);

    fn is_speaking(&self) -> bool;
}

/// A local camera preview. Frames are never captured or sent anywhere.
pub trait Camera: Send + Sync {
    fn enable(&mut self) -> CoachResult<()>;

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;
}

/// Transcriber that replays prepared recordings, one per start/stop pair.
#[derive(Debug, Default)]
pub struct ScriptedTranscriber {
    recordings: VecDeque<Vec<String>>,
    buffer: TranscriptBuffer,
    listening: bool,
}

impl ScriptedTranscriber {
    pub fn new<I, R, S>(recordings: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recordings: recordings
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl SpeechToText for ScriptedTranscriber {
    async fn start(&mut self) -> CoachResult<()> {
        self.buffer.clear();
        self.listening = true;
        Ok(())
    }

    async fn stop(&mut self) -> CoachResult<TranscriptBuffer> {
        if self.listening {
            for phrase in self.recordings.pop_front().unwrap_or_default() {
                self.buffer.push_final(phrase);
            }
        }
        self.listening = false;
        Ok(self.buffer.clone())
    }

    fn is_listening(&self) -> bool {
        self.listening
    }
}

/// Transcriber for terminals: each typed line is one finalized result.
///
/// Reading ends at the first blank line or end of input. Clones share one
/// buffered reader, so input read ahead for one answer stays available for
/// the next.
#[derive(Debug, Clone)]
pub struct StdinTranscriber {
    lines: Arc<Mutex<Lines<BufReader<Stdin>>>>,
    listening: bool,
}

impl StdinTranscriber {
    pub fn new() -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines())),
            listening: false,
        }
    }
}

impl Default for StdinTranscriber {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechToText for StdinTranscriber {
    async fn start(&mut self) -> CoachResult<()> {
        self.listening = true;
        eprintln!("Recording. Type your answer, finish with an empty line.");
        Ok(())
    }

    async fn stop(&mut self) -> CoachResult<TranscriptBuffer> {
        let mut buffer = TranscriptBuffer::new();
        if !self.listening {
            return Ok(buffer);
        }

        let mut lines = self.lines.lock().await;
        loop {
            let line = lines.next_line().await.map_err(|e| {
                CoachError::validation("Recording failed", format!("could not read input: {}", e))
            })?;
            match line {
                Some(line) if !line.trim().is_empty() => buffer.push_final(line.trim()),
                _ => break,
            }
        }
        self.listening = false;
        Ok(buffer)
    }

    fn is_listening(&self) -> bool {
        self.listening
    }
}

/// Synthesizer that prints the utterance instead of playing it.
#[derive(Debug, Default)]
pub struct ConsoleSynthesizer {
    speaking: AtomicBool,
}

impl ConsoleSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn speak(&self, text: &str) {
        self.cancel();
        println!("(speaking) {}", text);
        self.speaking.store(true, Ordering::SeqCst);
    }

    fn cancel(&self) {
        self.speaking.store(false, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// Camera with an on/off switch and nothing behind it.
#[derive(Debug, Default)]
pub struct NullCamera {
    enabled: bool,
}

impl NullCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled() -> Self {
        Self { enabled: true }
    }
}

impl Camera for NullCamera {
    fn enable(&mut self) -> CoachResult<()> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
