use clap::ValueEnum;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AiProvider {
    Claude,
    Codex,
    Gemini,
    AnthropicApi,
    GroqApi,
}

impl AiProvider {
    /// ローカルCLI経由のプロバイダならコマンド名
    pub fn command_name(&self) -> Option<&'static str> {
        match self {
            AiProvider::Claude => Some("claude"),
            AiProvider::Codex => Some("codex"),
            AiProvider::Gemini => Some("gemini"),
            AiProvider::AnthropicApi | AiProvider::GroqApi => None,
        }
    }

    /// CLIの引数（指示文は標準入力で渡すため含めない）
    ///
    /// `model` を指定すると各CLIのモデル指定フラグを付ける。
    /// CLIプロバイダでは温度を指定できず、CLI側の既定値になる。
    pub fn command_args(&self, model: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = match self {
            AiProvider::Claude => vec!["-p".into(), "--output-format".into(), "text".into()],
            AiProvider::Codex => vec!["exec".into()],
            AiProvider::Gemini => Vec::new(),
            AiProvider::AnthropicApi | AiProvider::GroqApi => return Vec::new(),
        };

        if let Some(model) = model {
            args.push("--model".into());
            args.push(model.into());
        }

        // codex exec は "-" で標準入力から読む
        if *self == AiProvider::Codex {
            args.push("-".into());
        }
        args
    }

    /// 温度0を指定できるか（API経由のみ）
    pub fn supports_temperature(&self) -> bool {
        self.command_name().is_none()
    }

    /// APIキーを読む環境変数
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            AiProvider::AnthropicApi => Some("ANTHROPIC_API_KEY"),
            AiProvider::GroqApi => Some("GROQ_API_KEY"),
            _ => None,
        }
    }

    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            AiProvider::AnthropicApi => Some("https://api.anthropic.com/v1/messages"),
            AiProvider::GroqApi => Some("https://api.groq.com/openai/v1/chat/completions"),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::GroqApi => "mixtral-8x7b-32768",
            _ => "claude-sonnet-4-20250514",
        }
    }
}
