//! モデル応答パーサー
//!
//! モデルの自由テキスト応答からJSONオブジェクトを取り出す。
//! 失敗しても空マップを返し、呼び出し側はデフォルト値で続行する。

use serde_json::{Map, Value};

/// 応答から取り出したフィールド名 → 値のマップ
pub type Fields = Map<String, Value>;

/// 応答テキスト内の ``` ... ``` ブロック本体を出現順に列挙
///
/// 開始フェンス直後の言語タグ（`json` など）は本体に含めない。
pub fn fenced_blocks(response: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = response;

    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let Some(close) = after_open.find("```") else {
            break;
        };
        let inner = &after_open[..close];
        blocks.push(strip_language_tag(inner).trim());
        rest = &after_open[close + 3..];
    }

    blocks
}

fn strip_language_tag(block: &str) -> &str {
    let tag_len = block
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
        .unwrap_or(block.len());
    if tag_len == 0 {
        return block;
    }
    // タグの直後が改行/空白でなければタグではなく本体の一部
    match block[tag_len..].chars().next() {
        Some(c) if c.is_whitespace() => &block[tag_len..],
        None => "",
        _ => block,
    }
}

/// 最初の `{` から最後の `}` までを切り出す
pub fn brace_span(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

fn decode_object(candidate: &str) -> Option<Fields> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// 応答からJSONオブジェクトを抽出
///
/// 抽出優先順位:
/// 1. コードフェンスブロック（出現順、最初にデコードできたもの）
/// 2. 最初の `{` から最後の `}` まで
/// 3. どちらも失敗したら空マップ（エラーにはしない）
///
/// # Examples
/// ```
/// use survey_scorer_common::extract_fields;
///
/// let fields = extract_fields("Result: {\"quality_score\": 1}");
/// assert_eq!(fields["quality_score"], 1);
/// assert!(extract_fields("no json here").is_empty());
/// ```
pub fn extract_fields(response: &str) -> Fields {
    if response.trim().is_empty() {
        return Fields::new();
    }

    if let Some(fields) = fenced_blocks(response).into_iter().find_map(decode_object) {
        return fields;
    }

    brace_span(response)
        .and_then(decode_object)
        .unwrap_or_default()
}
