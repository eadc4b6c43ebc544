pub mod aggregate;
pub mod fallback;
pub mod gemini;
pub mod pipeline;
pub mod scheduler;
pub mod sentiment;
pub mod types;

pub use aggregate::AnalysisResult;
pub use gemini::GeminiClassifier;
pub use pipeline::{AnalyzeError, Analyzer};
pub use scheduler::BatchScheduler;
pub use sentiment::{Sentiment, Source};
pub use types::ClassifiedComment;
