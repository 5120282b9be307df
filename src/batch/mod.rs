//! バッチ採点モジュール
//!
//! 入力表を1行ずつ採点し、行ごとにバックアップ・正式出力・チェックポイントを確定する。
//! 中断後に再実行すると、完了済みの行をスキップして続きから処理する。

pub mod checkpoint;

pub use checkpoint::{CheckpointState, CheckpointStore};

use crate::error::{Result, ScorerError};
use crate::scorer::{CompletionBackend, Scorer};
use crate::table::SurveyTable;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use survey_scorer_common::{
    required_columns, RowScores, ScoreContext, TaskKind, LIKE_COLUMNS, REPLACEMENT_COLUMNS,
    SUMMARY_COLUMNS,
};
use tracing::{info, warn};

/// 好き/嫌い設問に対して順に実行するタスク
const LIKE_TASKS: [TaskKind; 3] = [TaskKind::Quality, TaskKind::Relevance, TaskKind::Sentiment];

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_path: PathBuf,
    pub backup_dir: PathBuf,
    /// 行ごとの待機（レート制限対策）
    pub row_delay: Duration,
    /// 今回の実行で処理する最大行数（None は全行）
    pub max_rows: Option<usize>,
    pub show_progress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub total_rows: usize,
    /// 前回までに完了していた行
    pub resumed_rows: usize,
    /// 今回採点した行
    pub processed_rows: usize,
    pub model_calls: usize,
    pub failed_calls: usize,
    pub completed: bool,
}

pub struct BatchRun {
    pub table: SurveyTable,
    pub report: BatchReport,
}

pub struct BatchRunner<'a, B> {
    scorer: &'a Scorer<B>,
    options: BatchOptions,
}

/// 必須列がすべてあるか検証（欠けていれば最初の1列を報告）
pub fn validate_columns(table: &SurveyTable) -> Result<()> {
    match required_columns().into_iter().find(|c| !table.has_column(c)) {
        Some(missing) => Err(ScorerError::MissingColumn(missing.to_string())),
        None => Ok(()),
    }
}

/// 派生列を追加し全行をデフォルト値で初期化
pub fn initialize_score_columns(table: &mut SurveyTable) {
    let defaults = RowScores::default().cells();
    for (name, default) in RowScores::column_names().iter().zip(defaults.iter()) {
        table.reset_column(name, default);
    }
}

fn write_row_scores(table: &mut SurveyTable, row: usize, scores: &RowScores) -> Result<()> {
    for (name, value) in RowScores::column_names().iter().zip(scores.cells()) {
        table.set(row, name, value)?;
    }
    Ok(())
}

impl<'a, B: CompletionBackend> BatchRunner<'a, B> {
    pub fn new(scorer: &'a Scorer<B>, options: BatchOptions) -> Self {
        Self { scorer, options }
    }

    /// 表全体を採点
    ///
    /// 必須列の欠落はモデル呼び出し前にエラー。個々の採点呼び出しの失敗は
    /// ログに残してデフォルト値のまま続行する。
    pub async fn run(&self, mut table: SurveyTable, survey_context: &str) -> Result<BatchRun> {
        validate_columns(&table)?;

        let fingerprint = table.fingerprint(&required_columns())?;
        initialize_score_columns(&mut table);

        let store = CheckpointStore::new(&self.options.backup_dir).with_fingerprint(fingerprint.clone());
        let mut last_processed = store.load();
        if last_processed >= 0 {
            last_processed = self.restore_completed_rows(&store, &mut table, last_processed as usize, &fingerprint);
        }

        let total_rows = table.len();
        let mut report = BatchReport {
            total_rows,
            resumed_rows: (last_processed + 1) as usize,
            ..Default::default()
        };

        if last_processed >= 0 {
            println!("✔ チェックポイントから再開: {}行目から", last_processed + 1);
        }

        let progress = self.progress_bar(total_rows, report.resumed_rows);
        let budget = self.options.max_rows.unwrap_or(usize::MAX);

        for idx in 0..total_rows {
            if (idx as i64) <= last_processed {
                info!(row = idx, "Skipping already processed row");
                continue;
            }
            if report.processed_rows >= budget {
                info!(row = idx, limit = budget, "Row limit reached, stopping");
                break;
            }

            info!(row = idx, "Processing row");
            let scores = self.score_row(&table, idx, survey_context, &mut report).await;
            write_row_scores(&mut table, idx, &scores)?;

            store.commit(&table, idx, &self.options.output_path)?;
            let backup = store.backup_path(idx);
            info!(
                row = idx,
                combined = scores.combined_total(),
                backup = %backup.display(),
                "Row committed"
            );

            report.processed_rows += 1;
            progress.inc(1);

            let more_rows = idx + 1 < total_rows && report.processed_rows < budget;
            if more_rows && !self.options.row_delay.is_zero() {
                tokio::time::sleep(self.options.row_delay).await;
            }
        }

        progress.finish_and_clear();
        report.completed = report.resumed_rows + report.processed_rows >= total_rows;

        Ok(BatchRun { table, report })
    }

    async fn score_row(
        &self,
        table: &SurveyTable,
        row: usize,
        survey_context: &str,
        report: &mut BatchReport,
    ) -> RowScores {
        let mut scores = RowScores::default();

        for (slot, (column, question)) in LIKE_COLUMNS.iter().enumerate() {
            let text = table.get(row, column).unwrap_or("").trim();
            if text.is_empty() {
                info!(row, column, "Skipping empty response");
                continue;
            }

            let ctx = ScoreContext {
                survey_context,
                question_text: question,
            };
            for task in LIKE_TASKS {
                report.model_calls += 1;
                match self.scorer.score(text, task, Some(&ctx)).await {
                    Ok(result) => scores.like[slot].apply(&result),
                    Err(e) => {
                        report.failed_calls += 1;
                        warn!(row, column, %task, error = %e, "Scoring call failed, keeping defaults");
                    }
                }
            }
        }

        for (slot, (column, question)) in REPLACEMENT_COLUMNS.iter().enumerate() {
            let text = table.get(row, column).unwrap_or("").trim();
            if text.is_empty() {
                info!(row, column, "Skipping empty response");
                scores.replacement[slot] = 0;
                continue;
            }

            let ctx = ScoreContext {
                survey_context,
                question_text: question,
            };
            report.model_calls += 1;
            match self.scorer.score(text, TaskKind::Replacement, Some(&ctx)).await {
                Ok(result) => scores.replacement[slot] = result.points().clamp(0, 1) as u8,
                Err(e) => {
                    report.failed_calls += 1;
                    warn!(row, column, task = %TaskKind::Replacement, error = %e, "Scoring call failed, keeping defaults");
                }
            }
        }

        scores
    }

    /// 完了済み行の派生列をスナップショットから復元
    ///
    /// スナップショットが無い・入力と一致しない場合は -1（最初から）を返す。
    fn restore_completed_rows(
        &self,
        store: &CheckpointStore,
        table: &mut SurveyTable,
        last_processed: usize,
        fingerprint: &str,
    ) -> i64 {
        if last_processed >= table.len() {
            warn!(last_processed, rows = table.len(), "Checkpoint is past the end of the input, starting over");
            return -1;
        }

        let Some((path, snapshot)) = store.find_snapshot(last_processed, &self.options.output_path) else {
            warn!(last_processed, "No snapshot found for checkpoint, starting over");
            return -1;
        };

        let matches_input = snapshot.len() == table.len()
            && snapshot
                .fingerprint(&required_columns())
                .map(|fp| fp == fingerprint)
                .unwrap_or(false);
        if !matches_input {
            warn!(path = %path.display(), "Snapshot does not match the input, starting over");
            return -1;
        }

        let columns = RowScores::column_names();
        for row in 0..=last_processed {
            for name in &columns {
                let Some(value) = snapshot.get(row, name) else {
                    warn!(path = %path.display(), column = %name, "Snapshot lacks score column, starting over");
                    initialize_score_columns(table);
                    return -1;
                };
                let value = value.to_string();
                if table.set(row, name, value).is_err() {
                    initialize_score_columns(table);
                    return -1;
                }
            }
        }

        info!(path = %path.display(), rows = last_processed + 1, "Restored completed rows from snapshot");
        last_processed as i64
    }

    fn progress_bar(&self, total: usize, done: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template("  {bar:40.cyan/blue} {pos}/{len}行 ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        pb.set_position(done as u64);
        pb
    }
}

/// 採点ジョブ（CLI `score` の引数）
#[derive(Debug, Clone)]
pub struct ScoreJob {
    pub input: PathBuf,
    pub survey_context: String,
    pub output: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub backup_dir: Option<PathBuf>,
    pub row_delay: Duration,
    pub max_rows: Option<usize>,
    pub show_progress: bool,
}

fn sibling_with_suffix(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "survey".to_string());
    input.with_file_name(format!("{}{}", stem, suffix))
}

/// 既定の出力先: `<stem>_processed_with_scores.csv`
pub fn default_output_path(input: &Path) -> PathBuf {
    sibling_with_suffix(input, "_processed_with_scores.csv")
}

/// 既定のサマリー出力先: `<stem>_combined_scores.csv`
pub fn default_summary_path(input: &Path) -> PathBuf {
    sibling_with_suffix(input, "_combined_scores.csv")
}

impl ScoreJob {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| default_output_path(&self.input))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.summary.clone().unwrap_or_else(|| default_summary_path(&self.input))
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| CheckpointStore::default_backup_dir(&self.input))
    }
}

/// 入力CSVを読み込んで採点し、最終出力とサマリーを書き出す
pub async fn score_file<B: CompletionBackend>(scorer: &Scorer<B>, job: &ScoreJob) -> Result<BatchReport> {
    let table = SurveyTable::read(&job.input)?;
    let output = job.output_path();

    let options = BatchOptions {
        output_path: output.clone(),
        backup_dir: job.backup_dir(),
        row_delay: job.row_delay,
        max_rows: job.max_rows,
        show_progress: job.show_progress,
    };

    let run = BatchRunner::new(scorer, options)
        .run(table, &job.survey_context)
        .await?;

    run.table.write(&output)?;
    info!(path = %output.display(), "Scored table written");

    let summary = job.summary_path();
    run.table.select(&SUMMARY_COLUMNS)?.write(&summary)?;
    info!(path = %summary.display(), "Summary written");

    Ok(run.report)
}
