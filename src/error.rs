use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScorerError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`survey-scorer config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("必須列がありません: {0}")]
    MissingColumn(String),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("チェックポイントエラー: {0}")]
    Checkpoint(String),

    #[error("入力が不正: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Common(#[from] survey_scorer_common::Error),
}

pub type Result<T> = std::result::Result<T, ScorerError>;
