//! Recognition worker: the concrete task executor owning the face gallery
//! and the lazily-initialized model stack.

use mirador_core::frame::{self, Frame, FrameError};
use mirador_core::{AlignedCrop, Face, ModelError, ModelFactory, ModelStack};
use thiserror::Error;

use crate::config::Config;
use crate::gallery::{FaceGallery, GalleryError};
use crate::tasks::{
    RecognitionResult, RegistrationResult, Task, TaskOutput, UnregistrationResult,
};
use crate::worker::TaskExecutor;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("model stack: {0}")]
    Model(#[from] ModelError),
    #[error("gallery: {0}")]
    Gallery(#[from] GalleryError),
    #[error("frame: {0}")]
    Frame(#[from] FrameError),
}

/// Owns exactly one gallery and one model stack; executes recognition and
/// gallery tasks dispatched by the supervisor loop.
pub struct RecognitionWorker {
    config: Config,
    gallery: FaceGallery,
    factory: ModelFactory,
    models: Option<Box<dyn ModelStack>>,
}

impl RecognitionWorker {
    /// Construct the worker, loading the gallery from the configured path.
    ///
    /// A corrupt gallery file is a startup error surfaced to the caller.
    /// Model loading is deferred to the first task, on the worker thread,
    /// so spawning stays cheap.
    pub fn new(config: Config, factory: ModelFactory) -> Result<Self, GalleryError> {
        let gallery = FaceGallery::open(config.gallery_path.clone(), config.gallery_capacity)?;
        Ok(Self {
            config,
            gallery,
            factory,
            models: None,
        })
    }

    fn recognize(&mut self, frame: &Frame) -> Result<RecognitionResult, RecognitionError> {
        let models = lazy_models(&mut self.models, &mut self.factory)?;
        let rgb = frame.to_rgb()?;

        let mut faces = detect_faces(models, &rgb, frame)?;
        tracing::debug!(sequence = frame.sequence, count = faces.len(), "detection finished");

        if !faces.is_empty() {
            align_faces(models, &rgb, frame.width, frame.height, &mut faces);
            extract_features(models, &mut faces)?;
            find_matches(models, &self.gallery, self.config.num_matches, &mut faces);
        }

        Ok(RecognitionResult { faces })
    }

    fn register(&mut self, result: Option<RecognitionResult>) -> RegistrationResult {
        let faces = result.map(|r| r.faces).unwrap_or_default();

        let entries: Vec<_> = faces
            .into_iter()
            .filter_map(|face| face.features.map(|features| (features, face.thumbnail)))
            .collect();
        if entries.is_empty() {
            return RegistrationResult {
                persons: Vec::new(),
            };
        }

        let persons = self.gallery.append_batch(entries);
        tracing::info!(count = persons.len(), "registered faces");
        RegistrationResult { persons }
    }
}

impl TaskExecutor for RecognitionWorker {
    type Task = Task;
    type Output = TaskOutput;
    type Error = RecognitionError;

    fn execute(&mut self, task: Task) -> Result<Option<TaskOutput>, RecognitionError> {
        // the model stack comes up on the first task, whatever kind it is
        lazy_models(&mut self.models, &mut self.factory)?;

        match task {
            Task::Recognize(frame) => {
                let result = self.recognize(&frame)?;
                Ok(Some(TaskOutput::Recognition(result)))
            }
            Task::BackupGallery => {
                self.gallery.persist()?;
                Ok(None)
            }
            Task::Register(result) => Ok(Some(TaskOutput::Registration(self.register(result)))),
            Task::UnregisterMostRecent => {
                let persons = self.gallery.remove_most_recent();
                Ok(Some(TaskOutput::Unregistration(UnregistrationResult {
                    persons,
                })))
            }
        }
    }
}

/// First use constructs the model stack, so model memory lives on the
/// thread that uses it.
fn lazy_models<'a>(
    models: &'a mut Option<Box<dyn ModelStack>>,
    factory: &mut ModelFactory,
) -> Result<&'a mut dyn ModelStack, ModelError> {
    if models.is_none() {
        tracing::info!("initializing model stack");
        *models = Some(factory()?);
    }
    Ok(models.as_deref_mut().expect("model stack initialized above"))
}

/// Detection stage: boxes from the RGB view, thumbnails cropped from the
/// original BGR frame. Zero boxes means the frame is done.
fn detect_faces(
    models: &mut dyn ModelStack,
    rgb: &[u8],
    frame: &Frame,
) -> Result<Vec<Face>, ModelError> {
    let boxes = models.detect_faces(rgb, frame.width, frame.height)?;
    Ok(boxes
        .into_iter()
        .map(|bounding_box| {
            let thumbnail = frame::crop_patch(&frame.data, frame.width, frame.height, &bounding_box);
            Face::new(bounding_box, thumbnail)
        })
        .collect())
}

/// Alignment stage. A landmark or crop failure skips that face only;
/// siblings in the same frame continue through the pipeline.
fn align_faces(
    models: &mut dyn ModelStack,
    rgb: &[u8],
    width: u32,
    height: u32,
    faces: &mut [Face],
) {
    for face in faces.iter_mut() {
        let landmarks = match models.find_landmarks(rgb, width, height, &face.bounding_box) {
            Ok(landmarks) => landmarks,
            Err(error) => {
                tracing::warn!(%error, "landmark detection failed, skipping face");
                continue;
            }
        };
        match models.crop_aligned(rgb, width, height, &landmarks) {
            Ok(crop) => {
                face.landmarks = Some(landmarks);
                face.crop = Some(crop);
            }
            Err(error) => {
                tracing::warn!(%error, "aligned crop failed, skipping face");
            }
        }
    }
}

/// Extraction stage: one batched model invocation for all aligned crops,
/// embeddings redistributed in submission order.
fn extract_features(models: &mut dyn ModelStack, faces: &mut [Face]) -> Result<(), ModelError> {
    let crops: Vec<AlignedCrop> = faces.iter().filter_map(|f| f.crop.clone()).collect();
    if crops.is_empty() {
        return Ok(());
    }

    let embeddings = models.extract_features(&crops)?;
    if embeddings.len() != crops.len() {
        return Err(ModelError::BatchMismatch {
            expected: crops.len(),
            got: embeddings.len(),
        });
    }

    let mut embeddings = embeddings.into_iter();
    for face in faces.iter_mut().filter(|f| f.is_aligned()) {
        face.features = embeddings.next();
    }
    Ok(())
}

/// Matching stage: rank the whole gallery per face, keep the best
/// `num_matches`. The gallery itself is never touched here.
fn find_matches(
    models: &mut dyn ModelStack,
    gallery: &FaceGallery,
    num_matches: usize,
    faces: &mut [Face],
) {
    for face in faces.iter_mut() {
        let Some(features) = &face.features else {
            continue;
        };
        let mut matches = models.match_faces(features, gallery.faces());
        matches.truncate(num_matches);
        face.matches = matches;
    }
}
