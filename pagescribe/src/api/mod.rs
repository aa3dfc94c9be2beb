pub mod dto;
mod extractors;
pub mod handlers;
pub mod openapi;
mod routes;
mod state;

pub use extractors::{read_ocr_upload, AppJson, OcrUpload};
pub use routes::create_router;
pub use state::AppState;
