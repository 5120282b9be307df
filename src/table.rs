//! アンケート表（CSV）の読み書き
//!
//! 全行をメモリに保持し、行単位で派生列を書き換えてからファイル全体を書き出す。
//! 採点対象以外の列は文字列のまま素通しする。

use crate::error::{Result, ScorerError};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl SurveyTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        let index = build_index(&headers);
        Self { headers, rows, index }
    }

    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ScorerError::FileNotFound(path.display().to_string()));
        }

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // 短い行は空文字で埋めるが、ヘッダーより長い行は列を失うのでエラー
            if record.len() > headers.len() {
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                return Err(ScorerError::InvalidInput(format!(
                    "{} の {}行目: ヘッダー{}列に対して{}列あります",
                    path.display(),
                    line,
                    headers.len(),
                    record.len()
                )));
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// 一時ファイルへ書いてから置き換える
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = path.with_extension("csv.tmp");
        {
            let file = File::create(&tmp)?;
            let mut writer = csv::Writer::from_writer(file);
            writer.write_record(&self.headers)?;
            for row in &self.rows {
                writer.write_record(row)?;
            }
            writer.flush()?;
            let file = writer
                .into_inner()
                .map_err(|e| ScorerError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// 指定列だけを抜き出した表
    pub fn select(&self, columns: &[&str]) -> Result<Self> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| ScorerError::MissingColumn(c.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let headers = columns.iter().map(|c| c.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Self::new(headers, rows))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// 列がなければ末尾に追加し、全行を `default` で初期化する
    ///
    /// 既にある列は位置を保ったまま値だけ初期化する。
    pub fn reset_column(&mut self, name: &str, default: &str) {
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                self.index.insert(name.to_string(), self.headers.len() - 1);
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };
        for row in &mut self.rows {
            row[idx] = default.to_string();
        }
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<()> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| ScorerError::MissingColumn(column.to_string()))?;
        let cells = self.rows.get_mut(row).ok_or_else(|| {
            ScorerError::InvalidInput(format!("行 {} は範囲外です", row))
        })?;
        cells[idx] = value.into();
        Ok(())
    }

    /// 指定列の内容から計算したSHA-256（行数を含む）
    pub fn fingerprint(&self, columns: &[&str]) -> Result<String> {
        let indices = columns
            .iter()
            .map(|c| {
                self.column_index(c)
                    .ok_or_else(|| ScorerError::MissingColumn(c.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut hasher = Sha256::new();
        hasher.update((self.rows.len() as u64).to_le_bytes());
        for row in &self.rows {
            for &i in &indices {
                let cell = row[i].as_bytes();
                hasher.update((cell.len() as u64).to_le_bytes());
                hasher.update(cell);
            }
        }
        Ok(hex::encode(hasher.finalize()))
    }
}

fn build_index(headers: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::new();
    for (i, h) in headers.iter().enumerate() {
        // 重複列名は最初の列を採用
        index.entry(h.clone()).or_insert(i);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> SurveyTable {
        SurveyTable::new(
            vec!["id".into(), "Q16A".into()],
            vec![vec!["1".into(), "good, cold".into()], vec!["2".into()]],
        )
    }

    #[test]
    fn test_short_rows_padded() {
        let table = sample();
        assert_eq!(table.get(1, "Q16A"), Some(""));
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        sample().write(&path).unwrap();
        assert!(!dir.path().join("out.csv.tmp").exists());

        let loaded = SurveyTable::read(&path).unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(loaded.get(0, "Q16A"), Some("good, cold"));
    }

    #[test]
    fn test_reset_column_adds_or_reuses() {
        let mut table = sample();
        table.reset_column("Q16A_Quality", "0");
        assert_eq!(table.headers().len(), 3);
        table.set(0, "Q16A_Quality", "1").unwrap();
        table.reset_column("Q16A_Quality", "0");
        assert_eq!(table.headers().len(), 3);
        assert_eq!(table.get(0, "Q16A_Quality"), Some("0"));
    }

    #[test]
    fn test_select_missing_column() {
        let err = sample().select(&["nope"]).unwrap_err();
        assert!(matches!(err, ScorerError::MissingColumn(c) if c == "nope"));
    }

    #[test]
    fn test_fingerprint_tracks_selected_columns() {
        let a = sample();
        let mut b = sample();
        b.set(0, "id", "99").unwrap();
        assert_eq!(a.fingerprint(&["Q16A"]).unwrap(), b.fingerprint(&["Q16A"]).unwrap());
        b.set(0, "Q16A", "bad").unwrap();
        assert_ne!(a.fingerprint(&["Q16A"]).unwrap(), b.fingerprint(&["Q16A"]).unwrap());
    }

    #[test]
    fn test_read_pads_short_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.csv");
        std::fs::write(&path, "id,Q16A,Q16B\n1,good\n").unwrap();

        let table = SurveyTable::read(&path).unwrap();
        assert_eq!(table.get(0, "Q16A"), Some("good"));
        assert_eq!(table.get(0, "Q16B"), Some(""));
    }

    #[test]
    fn test_read_rejects_rows_wider_than_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wide.csv");
        std::fs::write(&path, "id,Q16A\n1,good,EXTRA\n").unwrap();

        let err = SurveyTable::read(&path).unwrap_err();
        assert!(matches!(err, ScorerError::InvalidInput(ref msg) if msg.contains("2行目")));
    }

    #[test]
    fn test_read_missing_file() {
        let err = SurveyTable::read(Path::new("/nonexistent/survey.csv")).unwrap_err();
        assert!(matches!(err, ScorerError::FileNotFound(_)));
    }
}
