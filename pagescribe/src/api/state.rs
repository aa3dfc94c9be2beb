use std::sync::Arc;

use crate::config::Config;
use crate::ocr::OcrEngine;
use crate::pdf::EmbeddedFont;
use crate::pipeline::ImagePipeline;
use crate::storage::{ArtifactStore, MemoryArtifactStore};
use crate::summarize::Summarizer;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: ImagePipeline,
    pub store: Arc<dyn ArtifactStore>,
    /// Set only for the in-memory backend, whose artifacts this service serves.
    pub memory_store: Option<Arc<MemoryArtifactStore>>,
    /// Font for generated PDFs; Helvetica when unset.
    pub pdf_font: Option<Arc<EmbeddedFont>>,
}

impl AppState {
    pub fn new(
        config: Config,
        ocr: Arc<dyn OcrEngine>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn ArtifactStore>,
        memory_store: Option<Arc<MemoryArtifactStore>>,
    ) -> Self {
        let pipeline = ImagePipeline::new(
            ocr,
            summarizer,
            Arc::clone(&store),
            &config.ocr,
            &config.upload,
        );

        Self {
            config: Arc::new(config),
            pipeline,
            store,
            memory_store,
            pdf_font: None,
        }
    }

    pub fn with_pdf_font(mut self, font: EmbeddedFont) -> Self {
        self.pdf_font = Some(Arc::new(font));
        self
    }
}
