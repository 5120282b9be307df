//! アンケート列定義と1行分の採点レコード
//!
//! - LIKE_COLUMNS / REPLACEMENT_COLUMNS: 採点対象の入力列と設問文
//! - RowScores: 1行の派生スコア列（出力列名と値）

use crate::types::{ScoreResult, Sentiment};

/// 好き/嫌い設問（品質・関連度・感情の3タスク）
pub const LIKE_COLUMNS: [(&str, &str); 2] = [
    (
        "Q16A",
        "What is the most important thing you LIKE about the shown concept? This can include anything you would want kept for sure or aspects that might drive you to buy or try it.",
    ),
    (
        "Q16B",
        "What is the most important thing you DISLIKE about the shown concept? This can include general concerns, annoyances, or any aspects of the product that need fixed for this to be more appealing to you.",
    ),
];

/// 置き換え製品設問（置き換え関連度タスクのみ）
pub const REPLACEMENT_COLUMNS: [(&str, &str); 3] = [
    (
        "Q18_1",
        "What specific product that you are currently using would the shown product replace? Please type in ONE specific brand or product per space provided.",
    ),
    (
        "Q18_2",
        "What specific product that you are currently using would the shown concept replace? Please type in ONE specific brand or product per space provided.",
    ),
    (
        "Q18_3",
        "What specific product that you are currently using would the shown concept replace? Please type in ONE specific brand or product per space provided.",
    ),
];

pub const TOTAL_QUALITY: &str = "Total_Quality_Score";
pub const TOTAL_RELEVANCE: &str = "Total_Relevance_Score";
pub const TOTAL_SENTIMENT: &str = "Total_Sentiment_Score";
pub const TOTAL_REPLACEMENT: &str = "Total_Q18_Relevance_Score";
pub const COMBINED_TOTAL: &str = "Combined_Total_Score";

/// サマリー出力の列（この順）
pub const SUMMARY_COLUMNS: [&str; 5] = [
    TOTAL_QUALITY,
    TOTAL_RELEVANCE,
    TOTAL_SENTIMENT,
    TOTAL_REPLACEMENT,
    COMBINED_TOTAL,
];

/// 入力に必須の列（この順で検証）
pub fn required_columns() -> Vec<&'static str> {
    LIKE_COLUMNS
        .iter()
        .chain(REPLACEMENT_COLUMNS.iter())
        .map(|(name, _)| *name)
        .collect()
}

/// 好き/嫌い設問1列分の採点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeColumnScores {
    pub quality: u8,
    pub relevance: u8,
    /// 未採点は None（出力は空文字）
    pub sentiment: Option<Sentiment>,
    pub toxic: bool,
    pub sentiment_score: i8,
}

impl LikeColumnScores {
    /// 採点結果を該当フィールドへ反映
    pub fn apply(&mut self, result: &ScoreResult) {
        match result {
            ScoreResult::Quality(r) => self.quality = r.score,
            ScoreResult::Relevance(r) => self.relevance = r.score,
            ScoreResult::Sentiment(r) => {
                self.sentiment = Some(r.sentiment);
                self.toxic = r.toxic;
                self.sentiment_score = r.score;
            }
            ScoreResult::Replacement(_) => {}
        }
    }
}

/// 1行分の派生スコア
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowScores {
    pub like: [LikeColumnScores; 2],
    pub replacement: [u8; 3],
}

impl RowScores {
    pub fn total_quality(&self) -> i64 {
        self.like.iter().map(|c| c.quality as i64).sum()
    }

    pub fn total_relevance(&self) -> i64 {
        self.like.iter().map(|c| c.relevance as i64).sum()
    }

    pub fn total_sentiment(&self) -> i64 {
        self.like.iter().map(|c| c.sentiment_score as i64).sum()
    }

    pub fn total_replacement(&self) -> i64 {
        self.replacement.iter().map(|&s| s as i64).sum()
    }

    /// 4つの行合計の和
    pub fn combined_total(&self) -> i64 {
        self.total_quality() + self.total_relevance() + self.total_sentiment() + self.total_replacement()
    }

    /// 派生列名の一覧（出力順）
    pub fn column_names() -> Vec<String> {
        let mut names = Vec::new();
        for (col, _) in LIKE_COLUMNS {
            names.push(format!("{col}_Quality"));
            names.push(format!("{col}_Relevance"));
            names.push(format!("{col}_Sentiment"));
            names.push(format!("{col}_Toxic"));
            names.push(format!("{col}_SentimentScore"));
        }
        for (col, _) in REPLACEMENT_COLUMNS {
            names.push(format!("{col}_Relevance"));
        }
        names.extend(SUMMARY_COLUMNS.iter().map(|s| s.to_string()));
        names
    }

    /// 派生列の値（column_names と同順）
    pub fn cells(&self) -> Vec<String> {
        let mut cells = Vec::new();
        for scores in &self.like {
            cells.push(scores.quality.to_string());
            cells.push(scores.relevance.to_string());
            cells.push(scores.sentiment.map(|s| s.to_string()).unwrap_or_default());
            cells.push(format_flag(scores.toxic).to_string());
            cells.push(scores.sentiment_score.to_string());
        }
        for score in &self.replacement {
            cells.push(score.to_string());
        }
        cells.push(self.total_quality().to_string());
        cells.push(self.total_relevance().to_string());
        cells.push(self.total_sentiment().to_string());
        cells.push(self.total_replacement().to_string());
        cells.push(self.combined_total().to_string());
        cells
    }
}

/// 真偽値の出力表記（既存の出力ファイルと同じ True/False）
pub fn format_flag(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
