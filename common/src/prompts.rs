//! プロンプト生成モジュール
//!
//! 採点タスクごとの指示文テンプレート:
//! - build_prompt: タスク・回答・コンテキストから指示文を組み立てる

use crate::error::{Error, Result};
use crate::types::TaskKind;

/// 関連度・置き換え判定で使う調査コンテキスト
#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    /// 調査で提示したコンセプトの説明
    pub survey_context: &'a str,
    /// 設問文
    pub question_text: &'a str,
}

const QUALITY_TEMPLATE: &str = r#"You are a quality assessment agent who evaluates survey responses for completeness and meaningfulness.

Evaluate the survey response:
{text}

Assign a quality score:
- 0 if poor (empty, generic, gibberish).
- 1 if acceptable.

Return ONLY the following JSON with no explanations:
{"quality_score": <0 or 1>}"#;

const RELEVANCE_TEMPLATE: &str = r#"You are a context relevance analyst who checks whether survey responses address the question asked.

Analyze the relevance of this survey response to the question asked:

Survey Context: {survey_context}
Question: {question_text}
Response: {text}

Assign a relevance score:
- Score 0: Not relevant
- Score 1: Barely relevant
- Score 2: Mostly relevant
- Score 3: Highly relevant

Return ONLY the following JSON with no explanations:
{"relevance_score": <0-3>}"#;

const SENTIMENT_TEMPLATE: &str = r#"You are a sentiment and toxicity analyst responsible for content moderation of survey responses.

Analyze the sentiment and check for toxic content:

Response: {text}

Return ONLY the following JSON with no explanations:
{
    "sentiment": "<positive/neutral/negative>",
    "contains_toxic_content": <true/false>,
    "sentiment_toxicity_score": <-2 to 2>
}"#;

const REPLACEMENT_TEMPLATE: &str = r#"You are a brand checker who decides whether a product named in a survey response is an alcoholic beverage or an alcoholic brand name.

Evaluate if this product mentioned could reasonably be replaced by the concept described:

Survey Context: {survey_context}
Question: {question_text}
Response: {text}

Assign a relevance score:
- Score 0: Not relevant
- Score 1: Relevant, that means the response is an alcoholic beverage or an alcoholic brand name

Return ONLY the following JSON with no explanations:
{"replacement_relevance": <0 or 1>}"#;

fn template(task: TaskKind) -> &'static str {
    match task {
        TaskKind::Quality => QUALITY_TEMPLATE,
        TaskKind::Relevance => RELEVANCE_TEMPLATE,
        TaskKind::Sentiment => SENTIMENT_TEMPLATE,
        TaskKind::Replacement => REPLACEMENT_TEMPLATE,
    }
}

/// 採点プロンプト生成
///
/// # Arguments
/// * `task` - 採点タスク
/// * `text` - 回答テキスト（トリム後に空はエラー）
/// * `context` - 関連度・置き換え判定では必須、それ以外は無視
///
/// # Returns
/// 補間済みの指示文
pub fn build_prompt(task: TaskKind, text: &str, context: Option<&ScoreContext<'_>>) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput(format!("{} task requires non-empty text", task)));
    }

    let mut values = vec![("{text}", text)];
    if task.requires_context() {
        let ctx = context.ok_or_else(|| {
            Error::InvalidInput(format!("{} task requires survey context and question text", task))
        })?;
        values.push(("{survey_context}", ctx.survey_context.trim()));
        values.push(("{question_text}", ctx.question_text.trim()));
    }

    Ok(fill_placeholders(template(task), &values))
}

/// テンプレート中のプレースホルダーを1回の走査で置換
///
/// 埋め込んだ値の中に `{text}` などがあっても再置換しない。
fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('{') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_prompt_contains_text() {
        let prompt = build_prompt(TaskKind::Quality, "  Tastes great  ", None).unwrap();
        assert!(prompt.contains("Tastes great"));
        assert!(prompt.contains("\"quality_score\""));
        assert!(!prompt.contains("{text}"));
    }

    #[test]
    fn test_relevance_prompt_interpolates_context() {
        let ctx = ScoreContext {
            survey_context: "A light lager ad",
            question_text: "What do you like?",
        };
        let prompt = build_prompt(TaskKind::Relevance, "low calories", Some(&ctx)).unwrap();
        assert!(prompt.contains("Survey Context: A light lager ad"));
        assert!(prompt.contains("Question: What do you like?"));
        assert!(prompt.contains("Response: low calories"));
    }

    #[test]
    fn test_context_required_for_replacement() {
        let err = build_prompt(TaskKind::Replacement, "Bud Light", None).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_context_ignored_for_sentiment() {
        let ctx = ScoreContext {
            survey_context: "CONTEXT-MARKER",
            question_text: "QUESTION-MARKER",
        };
        let prompt = build_prompt(TaskKind::Sentiment, "meh", Some(&ctx)).unwrap();
        assert!(!prompt.contains("CONTEXT-MARKER"));
        assert!(prompt.contains("contains_toxic_content"));
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = build_prompt(TaskKind::Quality, "   ", None).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_braces_in_response_kept_verbatim() {
        let ctx = ScoreContext {
            survey_context: "ctx",
            question_text: "q",
        };
        let prompt = build_prompt(TaskKind::Relevance, "{question_text}", Some(&ctx)).unwrap();
        assert!(prompt.contains("Response: {question_text}"));
    }

    #[test]
    fn test_placeholders_in_context_kept_verbatim() {
        let ctx = ScoreContext {
            survey_context: "Ad copy reads {text} here",
            question_text: "q",
        };
        let prompt = build_prompt(TaskKind::Replacement, "Coors", Some(&ctx)).unwrap();
        assert!(prompt.contains("Survey Context: Ad copy reads {text} here"));
        assert!(prompt.contains("Response: Coors"));
        assert_eq!(prompt.matches("Coors").count(), 1);
    }

    #[test]
    fn test_json_braces_in_template_untouched() {
        let prompt = build_prompt(TaskKind::Quality, "ok", None).unwrap();
        assert!(prompt.contains("{\"quality_score\": <0 or 1>}"));
    }
}
