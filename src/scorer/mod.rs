pub mod claude_cli;
pub mod http;

pub use claude_cli::CliBackend;
pub use http::{ApiFlavor, ApiSettings, HttpBackend};

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use std::time::Duration;
use survey_scorer_common::{build_prompt, extract_fields, ScoreContext, ScoreResult, TaskKind};
use tracing::{debug, warn};

/// テキスト補完サービス
///
/// 1回の呼び出しで指示文を送り、生の応答テキストを返す。
#[allow(async_fn_in_trait)]
pub trait CompletionBackend {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// `--ai-provider` で選ばれるバックエンド
pub enum Backend {
    Cli(CliBackend),
    Http(HttpBackend),
}

impl Backend {
    pub fn from_config(provider: AiProvider, config: &Config) -> Result<Self> {
        if provider.command_name().is_some() {
            warn!(
                provider = ?provider,
                temperature = config.temperature,
                "CLI provider cannot set temperature, the CLI default sampling is used"
            );
            let timeout = Duration::from_secs(config.timeout_seconds);
            // モデル未指定なら各CLIの既定モデル
            Ok(Backend::Cli(CliBackend::new(provider, config.model.clone(), timeout)?))
        } else {
            let settings = ApiSettings::from_config(provider, config)?;
            Ok(Backend::Http(HttpBackend::new(settings)?))
        }
    }
}

impl CompletionBackend for Backend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        match self {
            Backend::Cli(b) => b.complete(prompt).await,
            Backend::Http(b) => b.complete(prompt).await,
        }
    }
}

/// 1つの回答テキストを1タスク分採点する
pub struct Scorer<B> {
    backend: B,
}

impl<B: CompletionBackend> Scorer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 採点を実行
    ///
    /// 入力不正とサービス呼び出し失敗は `Err`。応答がデコードできない場合は
    /// エラーにせず、タスクのデフォルト結果を返す。
    pub async fn score(
        &self,
        text: &str,
        task: TaskKind,
        context: Option<&ScoreContext<'_>>,
    ) -> Result<ScoreResult> {
        let prompt = build_prompt(task, text, context)?;
        let response = self.backend.complete(&prompt).await?;

        let fields = extract_fields(&response);
        if fields.is_empty() {
            let preview: String = response.chars().take(120).collect();
            warn!(%task, response = %preview, "Model response not decodable, using defaults");
        }

        let result = ScoreResult::from_fields(task, &fields);
        debug!(%task, ?result, "Scored");
        Ok(result)
    }
}
