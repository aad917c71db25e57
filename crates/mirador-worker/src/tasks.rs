//! Task and result envelopes exchanged with the recognition worker.
//!
//! Tasks carry no reference to their results; a consumer that needs
//! correlation keys the results by its own task-local identifiers (e.g. the
//! frame sequence number).

use mirador_core::{Face, Frame, StoredFace};

/// Work accepted by the recognition worker.
///
/// Closed set: the executor matches exhaustively, so a new variant fails to
/// compile until every handler is extended. The shutdown sentinel is not a
/// task — it lives on the control envelope ([`crate::worker::Control`]) and
/// never reaches the executor.
pub enum Task {
    /// Run the full detect → align → extract → match pipeline over a frame.
    Recognize(Frame),
    /// Trim the gallery to capacity and flush it to disk.
    BackupGallery,
    /// Enroll the faces carried by an earlier recognition result.
    Register(Option<RecognitionResult>),
    /// Drop the most recently registered batch of faces.
    UnregisterMostRecent,
}

/// Faces produced for one frame. Empty when detection found nothing.
#[derive(Debug, Clone, Default)]
pub struct RecognitionResult {
    pub faces: Vec<Face>,
}

/// Faces newly enrolled by a registration task.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    pub persons: Vec<StoredFace>,
}

/// Faces removed by an unregistration task.
#[derive(Debug, Clone)]
pub struct UnregistrationResult {
    pub persons: Vec<StoredFace>,
}

/// Envelope pushed onto the result channel, in task-producing order.
#[derive(Debug, Clone)]
pub enum TaskOutput {
    Recognition(RecognitionResult),
    Registration(RegistrationResult),
    Unregistration(UnregistrationResult),
}
