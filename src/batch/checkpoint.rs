//! チェックポイントモジュール
//!
//! 最後に完了した行番号をバックアップディレクトリに記録し、
//! 中断後の再実行で完了済みの行をスキップする。
//!
//! 1行の確定順序: 行バックアップ → 正式出力 → チェックポイント更新。
//! チェックポイントが最後に書かれるので、記録された行は必ずファイルに残っている。

use crate::error::{Result, ScorerError};
use crate::table::SurveyTable;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const CHECKPOINT_FILE_NAME: &str = "recovery_info.json";

/// チェックポイントファイルの構造
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    /// 最後に完了した行（未処理なら -1）
    pub last_processed_row: i64,
    /// 入力の回答列から計算したフィンガープリント（古いファイルには無い）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

pub struct CheckpointStore {
    backup_dir: PathBuf,
    fingerprint: Option<String>,
}

impl CheckpointStore {
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            fingerprint: None,
        }
    }

    /// 入力フィンガープリントを設定（読み込み時の照合・書き込み時の記録に使う）
    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    /// 入力ファイル名から決まるバックアップディレクトリ（入力と同じ場所の `<stem>_backups`）
    pub fn default_backup_dir(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "survey".to_string());
        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        parent.join(format!("{}_backups", stem))
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.backup_dir.join(CHECKPOINT_FILE_NAME)
    }

    pub fn backup_path(&self, row_index: usize) -> PathBuf {
        self.backup_dir.join(format!("backup_after_row_{}.csv", row_index))
    }

    /// チェックポイントを読み込み（無い・壊れている場合は None）
    pub fn read_state(&self) -> Option<CheckpointState> {
        let path = self.checkpoint_path();
        if !path.exists() {
            return None;
        }

        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not open checkpoint, starting from scratch");
                return None;
            }
        };

        match serde_json::from_reader::<_, CheckpointState>(BufReader::new(file)) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read checkpoint, starting from scratch");
                None
            }
        }
    }

    /// 最後に完了した行番号（無ければ -1）
    ///
    /// 記録されたフィンガープリントが現在の入力と異なる場合は
    /// 別の入力の古いチェックポイントとみなして -1 を返す。
    pub fn load(&self) -> i64 {
        let Some(state) = self.read_state() else {
            return -1;
        };

        match (&state.input_fingerprint, &self.fingerprint) {
            (Some(saved), Some(current)) if saved != current => {
                warn!(
                    last_processed_row = state.last_processed_row,
                    "Checkpoint belongs to a different input, ignoring it"
                );
                -1
            }
            (None, Some(_)) => {
                info!("Checkpoint has no input fingerprint, trusting it as-is");
                state.last_processed_row.max(-1)
            }
            _ => state.last_processed_row.max(-1),
        }
    }

    /// 完了行を記録（一時ファイル経由で置き換え）
    pub fn advance(&self, row_index: usize) -> Result<()> {
        std::fs::create_dir_all(&self.backup_dir)?;

        let state = CheckpointState {
            last_processed_row: row_index as i64,
            input_fingerprint: self.fingerprint.clone(),
            updated_at: Some(chrono::Local::now().to_rfc3339()),
        };
        let bytes = serde_json::to_vec(&state)?;

        let path = self.checkpoint_path();
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// 1行分の確定: 行バックアップ → 正式出力 → チェックポイント
    pub fn commit(&self, table: &SurveyTable, row_index: usize, output: &Path) -> Result<()> {
        let backup = self.backup_path(row_index);
        table.write(&backup)?;
        table.write(output)?;
        self.advance(row_index)
    }

    /// 再開用スナップショットを探す（行バックアップ優先、なければ正式出力）
    pub fn find_snapshot(&self, row_index: usize, output: &Path) -> Option<(PathBuf, SurveyTable)> {
        for path in [self.backup_path(row_index), output.to_path_buf()] {
            if !path.exists() {
                continue;
            }
            match SurveyTable::read(&path) {
                Ok(table) => return Some((path, table)),
                Err(e) => warn!(path = %path.display(), error = %e, "Snapshot unreadable"),
            }
        }
        None
    }

    /// チェックポイントを削除（存在しなければ false）
    pub fn reset(&self) -> Result<bool> {
        let path = self.checkpoint_path();
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .map_err(|e| ScorerError::Checkpoint(format!("{}: {}", path.display(), e)))?;
        Ok(true)
    }
}
