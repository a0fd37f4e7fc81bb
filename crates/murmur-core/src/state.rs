//! Microphone/capture state types.

/// The current state of the capture state machine.
///
/// Stopping always lands back in `Idle`; there is no observable
/// "stopping" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Idle, not recording
    Idle,
    /// Microphone access requested, waiting for the grant to resolve
    Starting,
    /// Actively recording audio
    Listening,
}
