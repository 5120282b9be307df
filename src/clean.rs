//! 回答テキストの前処理
//!
//! 採点対象の回答列から英数字と空白以外を取り除き、小文字化して空白を詰める。
//! それ以外の列はそのまま残す。

use crate::error::Result;
use crate::table::SurveyTable;
use regex::Regex;
use survey_scorer_common::required_columns;

/// 1つの回答テキストを正規化
///
/// ```
/// use survey_scorer::clean::clean_text;
/// assert_eq!(clean_text("  Tastes GREAT!!  (really) "), "tastes great really");
/// ```
pub fn clean_text(text: &str) -> String {
    lazy_static::lazy_static! {
        static ref DISALLOWED_RE: Regex = Regex::new(r"[^a-zA-Z0-9\s]").unwrap();
        static ref SPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    }

    let stripped = DISALLOWED_RE.replace_all(text, "");
    let lowered = stripped.to_lowercase();
    SPACE_RE.replace_all(lowered.trim(), " ").into_owned()
}

/// 回答列をすべて正規化した表を返す
///
/// 回答列が無い場合はその列を飛ばす（採点時の列検証で検出される）。
pub fn clean_table(table: &SurveyTable) -> Result<SurveyTable> {
    let mut cleaned = table.clone();
    for column in required_columns() {
        if !cleaned.has_column(column) {
            continue;
        }
        for row in 0..cleaned.len() {
            let value = clean_text(cleaned.get(row, column).unwrap_or(""));
            cleaned.set(row, column, value)?;
        }
    }
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_removes_punctuation_and_case() {
        assert_eq!(clean_text("Love the can's design!"), "love the cans design");
        assert_eq!(clean_text("Coors\tLight\n"), "coors light");
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("日本語のみ"), "");
    }

    #[test]
    fn test_clean_table_only_touches_answer_columns() {
        let table = SurveyTable::new(
            vec!["ID".into(), "Q16A".into(), "Q18_1".into()],
            vec![vec!["R-01!".into(), "Too SWEET!!".into(), "Bud  Light.".into()]],
        );
        let cleaned = clean_table(&table).unwrap();
        assert_eq!(cleaned.get(0, "ID"), Some("R-01!"));
        assert_eq!(cleaned.get(0, "Q16A"), Some("too sweet"));
        assert_eq!(cleaned.get(0, "Q18_1"), Some("bud light"));
    }
}
