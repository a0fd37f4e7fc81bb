//! Speech synthesis seam.
//!
//! The engine itself is an external collaborator; the session only needs
//! toggle semantics: speaking while an utterance is in progress cancels
//! it instead of queueing another one.

/// Text-to-speech engine interface.
pub trait SpeechSynth: Send {
    /// True while an utterance is in progress.
    fn is_speaking(&self) -> bool;

    /// Begin speaking `text`. Fire-and-forget.
    fn speak(&mut self, text: &str);

    /// Cancel the in-progress utterance, if any.
    fn cancel(&mut self);
}

/// Engine that swallows speech requests, for headless use.
#[derive(Debug, Default)]
pub struct NullSpeech;

impl SpeechSynth for NullSpeech {
    fn is_speaking(&self) -> bool {
        false
    }

    fn speak(&mut self, _text: &str) {}

    fn cancel(&mut self) {}
}
