pub mod extractor;
pub mod tools;

pub use extractor::{AudioExtractor, ExtractedAudio, Workspace};
pub use tools::{Ffmpeg, MediaTools};
