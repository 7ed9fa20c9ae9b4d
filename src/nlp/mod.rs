pub mod extractor;
pub mod tokenizer;

pub use extractor::{ExtractedFields, LabelExtractor};
pub use tokenizer::LabelTokenizer;
