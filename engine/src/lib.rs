pub mod error;
pub mod generate;
pub mod image_ref;
pub mod normalize;
pub mod output;
pub mod prediction;
pub mod replicate;

pub use error::GenerateError;
pub use generate::{Generator, Prompt};
pub use image_ref::ImageRef;
pub use output::PredictionOutput;
pub use prediction::{PredictionClient, Predictor, RetryPolicy, Strategy};

pub type PredictorBox = Box<dyn Predictor + Send + Sync>;

pub const DEFAULT_MODEL: &str = "resilientcoders/calvin-comic-cover:5e26874f460dbb4e0a13e468d9c6e6bebcaf91962a78eea2b88e96bd3d4c9fef";
pub const DEFAULT_TRIGGER_WORD: &str = "dccomic";
