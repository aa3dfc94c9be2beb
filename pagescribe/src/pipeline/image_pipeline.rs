use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::config::{OcrConfig, UploadConfig};
use crate::error::{ErrorDetail, ErrorKind, PagescribeError};
use crate::imaging::{decode_upload, sniff_mime, DecodedImage};
use crate::ocr::OcrEngine;
use crate::storage::{ArtifactKind, ArtifactStore};
use crate::summarize::Summarizer;

use super::{ImageOutcome, PipelineOptions, UploadedImage};

/// Runs decode → OCR → summarize → store for a batch of uploads.
///
/// A failure in decode or OCR fails only that image. Summary and storage
/// failures leave the image successful and are attached as warnings.
#[derive(Clone)]
pub struct ImagePipeline {
    ocr: Arc<dyn OcrEngine>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn ArtifactStore>,
    ocr_config: Arc<OcrConfig>,
    concurrency: usize,
}

impl ImagePipeline {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn ArtifactStore>,
        ocr_config: &OcrConfig,
        upload_config: &UploadConfig,
    ) -> Self {
        Self {
            ocr,
            summarizer,
            store,
            ocr_config: Arc::new(ocr_config.clone()),
            concurrency: upload_config.concurrency.max(1),
        }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Process every image with bounded concurrency. The output has one entry
    /// per input, in input order.
    pub async fn process(
        &self,
        images: Vec<UploadedImage>,
        options: &PipelineOptions,
    ) -> Vec<ImageOutcome> {
        let total = images.len();
        let mut slots: Vec<Option<ImageOutcome>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        let mut completed = stream::iter(images.into_iter().enumerate())
            .map(|(index, image)| async move { (index, self.process_one(image, options).await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, outcome)) = completed.next().await {
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<ImageOutcome> = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    ImageOutcome::failure(
                        format!("file-{index}"),
                        ErrorDetail::new(ErrorKind::InternalError, "image was not processed"),
                    )
                })
            })
            .collect();

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(total, failed, "Batch processed");
        outcomes
    }

    async fn process_one(&self, image: UploadedImage, options: &PipelineOptions) -> ImageOutcome {
        let UploadedImage {
            filename,
            content_type,
            bytes,
        } = image;

        let (bytes, decoded) = match self.decode(bytes, content_type.clone()).await {
            Ok(result) => result,
            Err(e) => {
                warn!(filename = %filename, error = %e, "Image rejected");
                return ImageOutcome::failure(filename, e.detail());
            }
        };

        debug!(
            filename = %filename,
            width = decoded.width,
            height = decoded.height,
            "Image decoded"
        );

        let text = match self.ocr.extract_text(&decoded.png, &options.language).await {
            Ok(text) => text,
            Err(e) => {
                let e = PagescribeError::from(e);
                warn!(filename = %filename, error = %e, "OCR failed");
                return ImageOutcome::failure(filename, e.detail());
            }
        };
        info!(filename = %filename, chars = text.chars().count(), "Text extracted");

        let mut warnings = Vec::new();

        let summary = if options.summarize && !text.trim().is_empty() {
            match self.summarizer.summarize(&text).await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    let e = PagescribeError::from(e);
                    warn!(filename = %filename, error = %e, "Summary failed");
                    warnings.push(e.detail());
                    None
                }
            }
        } else {
            None
        };

        let stored_url = if options.store_originals {
            let content_type = content_type
                .filter(|ct| ct.starts_with("image/"))
                .or_else(|| sniff_mime(&bytes).map(String::from))
                .or_else(|| {
                    mime_guess::from_path(&filename)
                        .first()
                        .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
                        .map(|mime| mime.essence_str().to_string())
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            match self
                .store
                .put(ArtifactKind::Upload, &filename, bytes, &content_type)
                .await
            {
                Ok(artifact) => {
                    debug!(filename = %filename, key = %artifact.key, "Original stored");
                    Some(artifact.url)
                }
                Err(e) => {
                    let e = PagescribeError::from(e);
                    warn!(filename = %filename, error = %e, "Storing original failed");
                    warnings.push(e.detail());
                    None
                }
            }
        } else {
            None
        };

        ImageOutcome::Success {
            filename,
            text,
            summary,
            stored_url,
            warnings,
        }
    }

    /// Decode on the blocking pool and hand the original bytes back for
    /// storage.
    async fn decode(
        &self,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<(Vec<u8>, DecodedImage), PagescribeError> {
        let config = Arc::clone(&self.ocr_config);

        let (bytes, result) = tokio::task::spawn_blocking(move || {
            let result = decode_upload(&bytes, content_type.as_deref(), &config);
            (bytes, result)
        })
        .await
        .map_err(|e| PagescribeError::Internal(format!("Decode task failed: {e}")))?;

        Ok((bytes, result?))
    }
}
