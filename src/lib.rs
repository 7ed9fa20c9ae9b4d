pub mod core;
pub mod classifier;
pub mod ocr;
pub mod nlp;
pub mod store;
pub mod io;
