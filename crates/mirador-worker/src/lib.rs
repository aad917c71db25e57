//! mirador-worker — Recognition worker, channel protocol, and face gallery.
//!
//! A camera source submits frames and gallery commands on the task channel;
//! a dedicated worker thread runs the detect → align → extract → match
//! pipeline against an external model stack and answers on the result
//! channel. Fatal failures surface as a single envelope on a separate error
//! channel and terminate the worker; restarting is the host's decision.

pub mod config;
pub mod gallery;
pub mod recognition;
pub mod tasks;
pub mod worker;

pub use config::Config;
pub use gallery::{FaceGallery, GalleryError};
pub use recognition::{RecognitionError, RecognitionWorker};
pub use tasks::{RecognitionResult, RegistrationResult, Task, TaskOutput, UnregistrationResult};
pub use worker::{spawn, Control, FatalError, SubmitError, TaskExecutor, WorkerHandle};
