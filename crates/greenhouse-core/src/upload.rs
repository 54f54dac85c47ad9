//! Image upload and leaf analysis panel
//!
//! The controller owns the single current image. Uploads are encoded off the
//! executor, pixel dimensions are read in a separate task, and analysis
//! results land after a simulated latency. Every background completion is
//! tied to a [`TaskSlot`] generation so a reset or a newer upload makes it a
//! no-op.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisResult, LeafAnalyzer, SimulatedAnalyzer};
use crate::error::{ControlError, Result};
use crate::markup;
use crate::page::{ElementId, Presenter, PLACEHOLDER};
use crate::task::TaskSlot;

/// Fields reset whenever the current image changes
const RESULT_FIELDS: [ElementId; 3] = [ElementId::LeafCount, ElementId::Accuracy, ElementId::Timestamp];

/// A file chosen by the user
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    /// Declared media type, e.g. `image/png`
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Only the declared type is checked, never the content
    pub fn is_image(&self) -> bool {
        self.media_type.trim().to_ascii_lowercase().starts_with("image/")
    }
}

/// The current image held in memory
#[derive(Debug, Clone, Serialize)]
pub struct UploadedImage {
    pub id: Uuid,
    pub name: String,
    pub media_type: String,
    pub byte_len: usize,
    pub uploaded_at: DateTime<Utc>,
    /// Encoded content as a `data:` URL
    #[serde(skip)]
    pub data_url: String,
}

impl UploadedImage {
    pub fn new(name: String, media_type: String, data_url: String, byte_len: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            media_type,
            byte_len,
            uploaded_at: Utc::now(),
            data_url,
        }
    }
}

/// Pixel dimensions of the current image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.width, self.height)
    }
}

/// Snapshot of the upload panel for status reporting
#[derive(Debug, Clone, Serialize)]
pub struct ImageStatus {
    pub image: Option<UploadedImage>,
    pub dimensions: Option<Dimensions>,
    pub analyzing: bool,
    pub last_result: Option<AnalysisResult>,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Simulated latency between an analysis request and its result
    pub analysis_delay: Duration,
    /// Seed for the simulated analyzer (random when unset)
    pub seed: Option<u64>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            analysis_delay: Duration::from_millis(2000),
            seed: None,
        }
    }
}

/// Handle to an analysis in flight
pub struct PendingAnalysis {
    handle: JoinHandle<Option<AnalysisResult>>,
}

impl PendingAnalysis {
    /// Wait for the result; `None` if the analysis was superseded or cancelled
    pub async fn wait(self) -> Option<AnalysisResult> {
        self.handle.await.ok().flatten()
    }
}

struct UploadState {
    image: Option<UploadedImage>,
    dimensions: Option<Dimensions>,
    last_result: Option<AnalysisResult>,
    analyzer: Box<dyn LeafAnalyzer>,
    encode: TaskSlot,
    decode: TaskSlot,
    analysis: TaskSlot,
}

/// Controller for the image upload panel
pub struct ImageUploadController<P: Presenter> {
    presenter: Arc<P>,
    config: UploadConfig,
    state: Arc<Mutex<UploadState>>,
}

impl<P: Presenter> Clone for ImageUploadController<P> {
    fn clone(&self) -> Self {
        Self {
            presenter: self.presenter.clone(),
            config: self.config.clone(),
            state: self.state.clone(),
        }
    }
}

impl<P: Presenter> ImageUploadController<P> {
    /// Create the controller with the simulated analyzer and render the upload prompt
    pub fn new(presenter: Arc<P>, config: UploadConfig) -> Self {
        let analyzer = match config.seed {
            Some(seed) => SimulatedAnalyzer::with_seed(seed),
            None => SimulatedAnalyzer::new(),
        };
        Self::with_analyzer(presenter, config, analyzer)
    }

    pub fn with_analyzer(presenter: Arc<P>, config: UploadConfig, analyzer: impl LeafAnalyzer) -> Self {
        let controller = Self {
            presenter,
            config,
            state: Arc::new(Mutex::new(UploadState {
                image: None,
                dimensions: None,
                last_result: None,
                analyzer: Box::new(analyzer),
                encode: TaskSlot::new(),
                decode: TaskSlot::new(),
                analysis: TaskSlot::new(),
            })),
        };
        controller.render_prompt();
        controller
    }

    /// Validate, encode and store a selected file as the current image
    pub async fn handle_upload(&self, file: SelectedFile) -> Result<UploadedImage> {
        if !file.is_image() {
            warn!(name = %file.name, media_type = %file.media_type, "Rejected non-image upload");
            let err = ControlError::InvalidFileType {
                media_type: file.media_type,
            };
            self.alert_for(&err);
            return Err(err);
        }

        let token = self.state.lock().await.encode.arm();

        let SelectedFile { name, media_type, bytes } = file;
        let byte_len = bytes.len();
        let mime = media_type.clone();
        let (data_url, bytes) = tokio::task::spawn_blocking(move || {
            let url = encode_data_url(&mime, &bytes);
            (url, bytes)
        })
        .await
        .map_err(|e| ControlError::TaskFailed(e.to_string()))?;

        let mut state = self.state.lock().await;
        if !state.encode.complete(token) {
            debug!(name = %name, "Upload superseded before encoding finished");
            return Err(ControlError::Superseded);
        }

        let image = UploadedImage::new(name, media_type, data_url, byte_len);
        state.image = Some(image.clone());
        state.dimensions = None;
        state.last_result = None;
        state.analysis.cancel();

        self.presenter
            .set_markup(ElementId::ImageContainer, &markup::image_preview(&image.data_url));
        self.presenter.set_text(ElementId::ImageSize, PLACEHOLDER);
        for id in RESULT_FIELDS {
            self.presenter.set_text(id, PLACEHOLDER);
        }

        let decode_token = state.decode.arm();
        let presenter = self.presenter.clone();
        let shared = self.state.clone();
        let image_id = image.id;
        let handle = tokio::spawn(async move {
            let decoded = tokio::task::spawn_blocking(move || read_dimensions(&bytes)).await;

            let mut state = shared.lock().await;
            if !state.decode.complete(decode_token) {
                return;
            }
            match decoded {
                Ok(Ok(dimensions)) => {
                    debug!(image = %image_id, %dimensions, "Decoded image dimensions");
                    state.dimensions = Some(dimensions);
                    presenter.set_text(ElementId::ImageSize, &dimensions.to_string());
                }
                Ok(Err(e)) => {
                    warn!(image = %image_id, error = %e, "Could not read image dimensions");
                }
                Err(e) => {
                    warn!(image = %image_id, error = %e, "Dimension decode task failed");
                }
            }
        });
        state.decode.attach(decode_token, handle.abort_handle());

        info!(
            image = %image.id,
            name = %image.name,
            media_type = %image.media_type,
            bytes = image.byte_len,
            "Image uploaded"
        );
        Ok(image)
    }

    /// Start a simulated analysis of the current image
    pub async fn request_analysis(&self) -> Result<PendingAnalysis> {
        let mut state = self.state.lock().await;
        let Some(image_id) = state.image.as_ref().map(|i| i.id) else {
            let err = ControlError::NoImageSelected;
            self.alert_for(&err);
            return Err(err);
        };

        self.presenter
            .set_markup(ElementId::LeafCount, &markup::analyzing("Analyzing..."));
        self.presenter
            .set_markup(ElementId::Accuracy, &markup::analyzing("Processing..."));
        self.presenter
            .set_markup(ElementId::Timestamp, &markup::analyzing("Computing..."));

        let token = state.analysis.arm();
        let delay = self.config.analysis_delay;
        let presenter = self.presenter.clone();
        let shared = self.state.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut state = shared.lock().await;
            if !state.analysis.complete(token) {
                debug!(image = %image_id, "Dropping stale analysis result");
                return None;
            }
            let image = state.image.clone()?;
            let result = state.analyzer.analyze(&image);
            state.last_result = Some(result.clone());

            presenter.set_text(ElementId::LeafCount, &result.leaf_count.to_string());
            presenter.set_text(ElementId::Accuracy, &result.accuracy_label());
            presenter.set_text(ElementId::Timestamp, &result.time_label());
            presenter.alert(&result.summary());

            info!(
                image = %image.id,
                leaves = result.leaf_count,
                accuracy = %result.accuracy_label(),
                "Analysis complete"
            );
            Some(result)
        });
        state.analysis.attach(token, handle.abort_handle());

        info!(image = %image_id, delay_ms = delay.as_millis() as u64, "Analysis started");
        Ok(PendingAnalysis { handle })
    }

    /// Drop the current image and restore the upload prompt
    pub async fn reset_upload_area(&self) {
        let mut state = self.state.lock().await;
        state.encode.cancel();
        state.decode.cancel();
        state.analysis.cancel();
        state.image = None;
        state.dimensions = None;
        state.last_result = None;
        self.render_prompt();
        info!("Upload area reset");
    }

    pub async fn current_image(&self) -> Option<UploadedImage> {
        self.state.lock().await.image.clone()
    }

    pub async fn last_result(&self) -> Option<AnalysisResult> {
        self.state.lock().await.last_result.clone()
    }

    pub async fn status(&self) -> ImageStatus {
        let state = self.state.lock().await;
        ImageStatus {
            image: state.image.clone(),
            dimensions: state.dimensions,
            analyzing: state.analysis.is_pending(),
            last_result: state.last_result.clone(),
        }
    }

    fn render_prompt(&self) {
        self.presenter
            .set_markup(ElementId::ImageContainer, &markup::upload_prompt());
        for id in RESULT_FIELDS {
            self.presenter.set_text(id, PLACEHOLDER);
        }
        self.presenter.set_text(ElementId::ImageSize, PLACEHOLDER);
    }

    fn alert_for(&self, err: &ControlError) {
        if let Some(message) = err.user_message() {
            self.presenter.alert(message);
        }
    }
}

fn encode_data_url(media_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{};base64,{}", media_type, encoded)
}

/// Read only the image header to get its size
fn read_dimensions(bytes: &[u8]) -> image::ImageResult<Dimensions> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Dimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Page, PageEvent};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn controller(delay_ms: u64) -> (Arc<Page>, ImageUploadController<Page>) {
        let page = Arc::new(Page::new());
        let config = UploadConfig {
            analysis_delay: Duration::from_millis(delay_ms),
            seed: Some(1),
        };
        let controller = ImageUploadController::new(page.clone(), config);
        (page, controller)
    }

    fn alerts(rx: &mut tokio::sync::broadcast::Receiver<PageEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let PageEvent::Alert { message } = event {
                out.push(message);
            }
        }
        out
    }

    #[test]
    fn test_is_image() {
        assert!(SelectedFile::new("a.png", "image/png", vec![]).is_image());
        assert!(SelectedFile::new("a.jpg", "IMAGE/JPEG", vec![]).is_image());
        assert!(!SelectedFile::new("a.txt", "text/plain", vec![]).is_image());
        assert!(!SelectedFile::new("a", "", vec![]).is_image());
    }

    #[test]
    fn test_encode_data_url() {
        assert_eq!(encode_data_url("image/png", b"abc"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_read_dimensions() {
        let dims = read_dimensions(&png_bytes(7, 5)).unwrap();
        assert_eq!(dims, Dimensions { width: 7, height: 5 });
        assert_eq!(dims.to_string(), "7 x 5");
        assert!(read_dimensions(b"not an image").is_err());
    }

    #[tokio::test]
    async fn test_initial_render() {
        let (page, _controller) = controller(10);
        assert!(page.text(ElementId::ImageContainer).contains("Upload an image"));
        for id in RESULT_FIELDS {
            assert_eq!(page.text(id), PLACEHOLDER);
        }
    }

    #[tokio::test]
    async fn test_rejects_non_image() {
        let (page, controller) = controller(10);
        let before = page.snapshot();
        let mut rx = page.subscribe();

        let err = controller
            .handle_upload(SelectedFile::new("notes.txt", "text/plain", b"hi".to_vec()))
            .await
            .unwrap_err();

        assert!(matches!(err, ControlError::InvalidFileType { .. }));
        assert!(controller.current_image().await.is_none());
        assert_eq!(page.snapshot(), before);
        assert_eq!(alerts(&mut rx), vec!["Please select a valid image file."]);
    }

    #[tokio::test]
    async fn test_upload_sets_image_and_preview() {
        let (page, controller) = controller(10);
        let image = controller
            .handle_upload(SelectedFile::new("leaf.png", "image/png", png_bytes(4, 3)))
            .await
            .unwrap();

        assert!(image.data_url.starts_with("data:image/png;base64,"));
        assert_eq!(controller.current_image().await.unwrap().id, image.id);
        assert!(page.text(ElementId::ImageContainer).contains("<img src=\"data:image/png"));
        for id in RESULT_FIELDS {
            assert_eq!(page.text(id), PLACEHOLDER);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_without_image() {
        let (page, controller) = controller(10);
        let before = page.snapshot();
        let mut rx = page.subscribe();

        assert!(matches!(
            controller.request_analysis().await,
            Err(ControlError::NoImageSelected)
        ));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(page.snapshot(), before);
        assert_eq!(alerts(&mut rx), vec!["Please upload an image first."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_analysis_writes_results() {
        let (page, controller) = controller(2000);
        controller
            .handle_upload(SelectedFile::new("leaf.png", "image/png", png_bytes(2, 2)))
            .await
            .unwrap();
        let mut rx = page.subscribe();

        let pending = controller.request_analysis().await.unwrap();
        assert!(page.text(ElementId::LeafCount).contains("Analyzing..."));

        let result = pending.wait().await.unwrap();
        assert_eq!(page.text(ElementId::LeafCount), result.leaf_count.to_string());
        assert_eq!(page.text(ElementId::Accuracy), result.accuracy_label());
        assert_eq!(page.text(ElementId::Timestamp), result.time_label());
        assert_eq!(alerts(&mut rx), vec![result.summary()]);
        assert_eq!(controller.last_result().await, Some(result));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_analysis() {
        let (page, controller) = controller(2000);
        controller
            .handle_upload(SelectedFile::new("leaf.png", "image/png", png_bytes(2, 2)))
            .await
            .unwrap();

        let pending = controller.request_analysis().await.unwrap();
        controller.reset_upload_area().await;

        assert!(pending.wait().await.is_none());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(controller.current_image().await.is_none());
        assert!(controller.last_result().await.is_none());
        for id in RESULT_FIELDS {
            assert_eq!(page.text(id), PLACEHOLDER);
        }
        assert!(page.text(ElementId::ImageContainer).contains("Choose Image"));
    }
}
