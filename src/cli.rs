use clap::{Args, Parser, Subcommand};
use crate::ai_provider::AiProvider;
use crate::batch::ScoreJob;
use crate::config::Config;
use crate::error::{Result, ScorerError};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "survey-scorer")]
#[command(about = "アンケート自由記述のAI採点ツール（チェックポイント再開対応）", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// AIプロバイダ (groq-api/anthropic-api/claude/codex/gemini)
    ///
    /// API経由は温度0で呼び出す。CLI経由（claude/codex/gemini）は温度を指定できない
    #[arg(long, default_value = "groq-api", global = true)]
    pub ai_provider: AiProvider,
}

#[derive(Subcommand)]
pub enum Commands {
    /// アンケートCSVを1行ずつ採点
    Score(ScoreArgs),

    /// 回答列の記号除去・小文字化
    Clean {
        /// 入力CSVファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力先（デフォルト: <入力名>_cleaned.csv）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// チェックポイントの確認/削除
    Checkpoint {
        /// 入力CSVファイル
        #[arg(required = true)]
        input: PathBuf,

        /// バックアップ・チェックポイントの保存先（デフォルト: <入力名>_backups）
        #[arg(long)]
        backup_dir: Option<PathBuf>,

        /// チェックポイントを削除（次回は最初から処理）
        #[arg(long)]
        reset: bool,
    },

    /// 設定を表示/編集
    Config {
        /// APIキーを設定
        #[arg(long)]
        set_api_key: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}

#[derive(Args)]
pub struct ScoreArgs {
    /// 入力CSVファイル
    #[arg(required = true)]
    pub input: PathBuf,

    #[command(flatten)]
    pub context: ContextArgs,

    /// 採点済みCSV（デフォルト: <入力名>_processed_with_scores.csv）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 合計スコアのサマリーCSV（デフォルト: <入力名>_combined_scores.csv）
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// バックアップ・チェックポイントの保存先（デフォルト: <入力名>_backups）
    #[arg(long)]
    pub backup_dir: Option<PathBuf>,

    /// 行ごとの待機秒数（省略時は設定ファイルの値）
    #[arg(long)]
    pub delay: Option<u64>,

    /// 今回処理する最大行数
    #[arg(long)]
    pub limit: Option<usize>,

    /// 使用モデル（省略時は設定ファイル、なければプロバイダ既定）
    #[arg(long)]
    pub model: Option<String>,
}

impl ScoreArgs {
    /// 設定ファイルを読み込み、採点ジョブを組み立てる
    ///
    /// 設定の破損や背景説明ファイルの読み込み失敗もここで `Err` になる。
    pub fn prepare(self, config_path: &Path, show_progress: bool) -> Result<(Config, ScoreJob)> {
        let mut config = Config::load_from(config_path)?;
        if self.model.is_some() {
            config.model = self.model;
        }

        let survey_context = self.context.read()?;
        let row_delay = self.delay.map(Duration::from_secs).unwrap_or_else(|| config.row_delay());

        let job = ScoreJob {
            input: self.input,
            survey_context,
            output: self.output,
            summary: self.summary,
            backup_dir: self.backup_dir,
            row_delay,
            max_rows: self.limit,
            show_progress,
        };
        Ok((config, job))
    }
}

/// 調査の背景説明（直接指定かファイル指定のどちらか）
#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct ContextArgs {
    /// 調査の背景説明
    #[arg(long)]
    pub context: Option<String>,

    /// 調査の背景説明を書いたテキストファイル
    #[arg(long)]
    pub context_file: Option<PathBuf>,
}

impl ContextArgs {
    pub fn read(&self) -> Result<String> {
        match (&self.context, &self.context_file) {
            (Some(text), _) => Ok(text.clone()),
            (None, Some(path)) => Ok(std::fs::read_to_string(path)?.trim().to_string()),
            (None, None) => Err(ScorerError::InvalidInput(
                "--context か --context-file を指定してください".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_score_requires_context() {
        assert!(Cli::try_parse_from(["survey-scorer", "score", "in.csv"]).is_err());
        assert!(Cli::try_parse_from([
            "survey-scorer", "score", "in.csv", "--context", "a", "--context-file", "b.txt"
        ])
        .is_err());
    }

    #[test]
    fn test_default_provider_is_api() {
        let cli = Cli::try_parse_from(["survey-scorer", "score", "in.csv", "--context", "x"]).unwrap();
        assert_eq!(cli.ai_provider, AiProvider::GroqApi);
    }

    #[test]
    fn test_score_arguments() {
        let cli = Cli::try_parse_from([
            "survey-scorer", "--ai-provider", "claude", "score", "in.csv",
            "--context", "New beer concept", "--limit", "3", "--delay", "0",
        ])
        .unwrap();
        assert_eq!(cli.ai_provider, AiProvider::Claude);
        match cli.command {
            Commands::Score(args) => {
                assert_eq!(args.input, PathBuf::from("in.csv"));
                assert_eq!(args.context.context.as_deref(), Some("New beer concept"));
                assert_eq!(args.limit, Some(3));
                assert_eq!(args.delay, Some(0));
            }
            _ => panic!("expected score command"),
        }
    }

    fn score_args(extra: &[&str]) -> ScoreArgs {
        let mut argv = vec!["survey-scorer", "score", "in.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Score(args) => args,
            _ => panic!("expected score command"),
        }
    }

    #[test]
    fn test_prepare_applies_overrides() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, r#"{"row_delay_seconds": 9}"#).unwrap();

        let args = score_args(&["--context", "ctx", "--model", "llama-3.3-70b"]);
        let (config, job) = args.prepare(&config_path, false).unwrap();
        assert_eq!(config.model.as_deref(), Some("llama-3.3-70b"));
        assert_eq!(job.row_delay, Duration::from_secs(9));
        assert_eq!(job.survey_context, "ctx");
    }

    #[test]
    fn test_prepare_reports_corrupt_config_as_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{ broken").unwrap();

        let result = score_args(&["--context", "ctx"]).prepare(&config_path, false);
        assert!(matches!(result, Err(ScorerError::JsonParse(_))));
    }

    #[test]
    fn test_prepare_reads_context_file() {
        let dir = tempdir().unwrap();
        let context_path = dir.path().join("context.txt");
        std::fs::write(&context_path, "  A citrus seltzer concept\n").unwrap();

        let args = score_args(&["--context-file", context_path.to_str().unwrap()]);
        let (_, job) = args.prepare(&dir.path().join("none.json"), false).unwrap();
        assert_eq!(job.survey_context, "A citrus seltzer concept");

        let missing = score_args(&["--context-file", "/nonexistent/context.txt"]);
        assert!(missing.prepare(&dir.path().join("none.json"), false).is_err());
    }
}
