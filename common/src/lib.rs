//! Survey Scorer Common Library
//!
//! CLIとテストで共有される型・プロンプト・応答パーサー

pub mod error;
pub mod parser;
pub mod prompts;
pub mod survey;
pub mod types;

pub use error::{Error, Result};
pub use parser::{extract_fields, Fields};
pub use prompts::{build_prompt, ScoreContext};
pub use survey::{required_columns, LikeColumnScores, RowScores, LIKE_COLUMNS, REPLACEMENT_COLUMNS, SUMMARY_COLUMNS};
pub use types::{
    QualityResult, RelevanceResult, ReplacementResult, ScoreResult, Sentiment, SentimentResult, TaskKind,
};
