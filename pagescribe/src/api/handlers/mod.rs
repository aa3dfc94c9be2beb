pub mod artifacts;
pub mod health;
pub mod ocr;
pub mod pdf;

pub use artifacts::get_artifact;
pub use health::health_check;
pub use ocr::extract_text;
pub use pdf::generate_pdf;
