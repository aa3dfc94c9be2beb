pub mod api;
pub mod config;
pub mod error;
pub mod imaging;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod storage;
pub mod summarize;
