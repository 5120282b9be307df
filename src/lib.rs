//! survey-scorer - アンケート自由記述のAI採点ツール
//!
//! 回答CSVを1行ずつAIで採点し、行ごとにバックアップとチェックポイントを残す。

pub mod ai_provider;
pub mod batch;
pub mod clean;
pub mod cli;
pub mod config;
pub mod error;
pub mod scorer;
pub mod table;
