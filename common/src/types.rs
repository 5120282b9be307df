//! 採点結果の型定義
//!
//! 採点タスクごとの結果型と、パーサー出力（未型付けマップ）からの変換:
//! - TaskKind: 採点タスクの種類
//! - ScoreResult: タスクごとのタグ付き結果
//! - 欠損・型不一致のフィールドは中立のデフォルト値（0 / neutral / false）

use crate::parser::Fields;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// 採点タスクの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// 回答品質（0/1）
    Quality,
    /// 設問との関連度（0〜3）
    Relevance,
    /// 感情・有害表現（-2〜2）
    Sentiment,
    /// 置き換えブランドの関連度（0/1）
    Replacement,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Quality,
        TaskKind::Relevance,
        TaskKind::Sentiment,
        TaskKind::Replacement,
    ];

    /// 調査コンテキストと設問文が必要か
    pub fn requires_context(&self) -> bool {
        matches!(self, TaskKind::Relevance | TaskKind::Replacement)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Quality => "quality",
            TaskKind::Relevance => "relevance",
            TaskKind::Sentiment => "sentiment",
            TaskKind::Replacement => "replacement",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 感情ラベル
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }

    /// ラベル文字列を解釈（大文字小文字無視、不明は neutral）
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityResult {
    pub score: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevanceResult {
    pub score: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: Sentiment,
    pub toxic: bool,
    pub score: i8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementResult {
    pub score: u8,
}

/// 1回の採点呼び出しのデコード結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum ScoreResult {
    Quality(QualityResult),
    Relevance(RelevanceResult),
    Sentiment(SentimentResult),
    Replacement(ReplacementResult),
}

// 応答JSONのキー名
pub const QUALITY_KEY: &str = "quality_score";
pub const RELEVANCE_KEY: &str = "relevance_score";
pub const SENTIMENT_KEY: &str = "sentiment";
pub const TOXIC_KEY: &str = "contains_toxic_content";
pub const SENTIMENT_SCORE_KEY: &str = "sentiment_toxicity_score";
pub const REPLACEMENT_KEY: &str = "replacement_relevance";

impl ScoreResult {
    /// タスクのデフォルト結果（全フィールド中立値）
    pub fn default_for(task: TaskKind) -> Self {
        match task {
            TaskKind::Quality => ScoreResult::Quality(QualityResult::default()),
            TaskKind::Relevance => ScoreResult::Relevance(RelevanceResult::default()),
            TaskKind::Sentiment => ScoreResult::Sentiment(SentimentResult::default()),
            TaskKind::Replacement => ScoreResult::Replacement(ReplacementResult::default()),
        }
    }

    /// パーサー出力を型付き結果へ変換
    ///
    /// 欠損・変換不能なフィールドはデフォルト値、範囲外の数値は範囲内に丸める。
    pub fn from_fields(task: TaskKind, fields: &Fields) -> Self {
        match task {
            TaskKind::Quality => ScoreResult::Quality(QualityResult {
                score: coerce_int(fields.get(QUALITY_KEY)).clamp(0, 1) as u8,
            }),
            TaskKind::Relevance => ScoreResult::Relevance(RelevanceResult {
                score: coerce_int(fields.get(RELEVANCE_KEY)).clamp(0, 3) as u8,
            }),
            TaskKind::Sentiment => ScoreResult::Sentiment(SentimentResult {
                sentiment: fields
                    .get(SENTIMENT_KEY)
                    .and_then(Value::as_str)
                    .map(Sentiment::from_label)
                    .unwrap_or_default(),
                toxic: coerce_bool(fields.get(TOXIC_KEY)),
                score: coerce_int(fields.get(SENTIMENT_SCORE_KEY)).clamp(-2, 2) as i8,
            }),
            TaskKind::Replacement => ScoreResult::Replacement(ReplacementResult {
                score: coerce_int(fields.get(REPLACEMENT_KEY)).clamp(0, 1) as u8,
            }),
        }
    }

    pub fn task(&self) -> TaskKind {
        match self {
            ScoreResult::Quality(_) => TaskKind::Quality,
            ScoreResult::Relevance(_) => TaskKind::Relevance,
            ScoreResult::Sentiment(_) => TaskKind::Sentiment,
            ScoreResult::Replacement(_) => TaskKind::Replacement,
        }
    }

    /// 行合計へ加算する数値
    pub fn points(&self) -> i64 {
        match self {
            ScoreResult::Quality(r) => r.score as i64,
            ScoreResult::Relevance(r) => r.score as i64,
            ScoreResult::Sentiment(r) => r.score as i64,
            ScoreResult::Replacement(r) => r.score as i64,
        }
    }
}

/// 任意のJSON値を整数へ（失敗は0）
pub fn coerce_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            // 数値文字列は小数も切り捨てで受け付ける（"2.5" → 2）。数値でなければ0
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        Some(Value::Bool(b)) => *b as i64,
        _ => 0,
    }
}

/// 任意のJSON値を真偽値へ（失敗はfalse）
pub fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::extract_fields;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("object expected"),
        }
    }

    #[test]
    fn test_coerce_int_numeric_strings() {
        assert_eq!(coerce_int(Some(&json!("2.5"))), 2);
        assert_eq!(coerce_int(Some(&json!(" 3 "))), 3);
        assert_eq!(coerce_int(Some(&json!("high"))), 0);
    }

    #[test]
    fn test_empty_fields_give_defaults() {
        let empty = Fields::new();
        for task in TaskKind::ALL {
            assert_eq!(ScoreResult::from_fields(task, &empty), ScoreResult::default_for(task));
        }
    }

    #[test]
    fn test_unparseable_response_gives_quality_zero() {
        let parsed = extract_fields("Sorry, I can't do that.");
        let result = ScoreResult::from_fields(TaskKind::Quality, &parsed);
        assert_eq!(result, ScoreResult::Quality(QualityResult { score: 0 }));
    }

    #[test]
    fn test_sentiment_fields() {
        let f = fields(json!({
            "sentiment": "Negative",
            "contains_toxic_content": true,
            "sentiment_toxicity_score": -2
        }));
        let result = ScoreResult::from_fields(TaskKind::Sentiment, &f);
        assert_eq!(
            result,
            ScoreResult::Sentiment(SentimentResult {
                sentiment: Sentiment::Negative,
                toxic: true,
                score: -2,
            })
        );
        assert_eq!(result.points(), -2);
    }

    #[test]
    fn test_non_integer_text_coerced_to_zero() {
        let f = fields(json!({"relevance_score": "high"}));
        let result = ScoreResult::from_fields(TaskKind::Relevance, &f);
        assert_eq!(result, ScoreResult::Relevance(RelevanceResult { score: 0 }));
    }

    #[test]
    fn test_numeric_string_and_float() {
        assert_eq!(coerce_int(Some(&json!("2"))), 2);
        assert_eq!(coerce_int(Some(&json!(" 3 "))), 3);
        assert_eq!(coerce_int(Some(&json!(2.7))), 2);
        assert_eq!(coerce_int(Some(&json!("1.0"))), 1);
        assert_eq!(coerce_int(Some(&json!(true))), 1);
        assert_eq!(coerce_int(Some(&Value::Null)), 0);
        assert_eq!(coerce_int(None), 0);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let f = fields(json!({"relevance_score": 7}));
        assert_eq!(
            ScoreResult::from_fields(TaskKind::Relevance, &f),
            ScoreResult::Relevance(RelevanceResult { score: 3 })
        );
        let f = fields(json!({"sentiment_toxicity_score": -9}));
        match ScoreResult::from_fields(TaskKind::Sentiment, &f) {
            ScoreResult::Sentiment(r) => assert_eq!(r.score, -2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_sentiment_label_is_neutral() {
        assert_eq!(Sentiment::from_label("mixed"), Sentiment::Neutral);
        assert_eq!(Sentiment::from_label(" POSITIVE "), Sentiment::Positive);
    }

    #[test]
    fn test_toxic_string_flag() {
        assert!(coerce_bool(Some(&json!("True"))));
        assert!(!coerce_bool(Some(&json!("no"))));
        assert!(!coerce_bool(Some(&json!(1))));
    }

    #[test]
    fn test_task_requires_context() {
        assert!(TaskKind::Relevance.requires_context());
        assert!(TaskKind::Replacement.requires_context());
        assert!(!TaskKind::Quality.requires_context());
        assert!(!TaskKind::Sentiment.requires_context());
    }
}
