//! ローカルAI CLI連携モジュール
//!
//! claude / codex / gemini CLI をサブプロセスとして起動し、
//! 指示文を標準入力で渡して標準出力をモデル応答として返す。
//! 指示文は複数行で回答本文を含むため、コマンドライン引数には載せない。

use super::CompletionBackend;
use crate::ai_provider::AiProvider;
use crate::error::{Result, ScorerError};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

pub struct CliBackend {
    provider: AiProvider,
    command: String,
    model: Option<String>,
    timeout: Duration,
}

impl CliBackend {
    pub fn new(provider: AiProvider, model: Option<String>, timeout: Duration) -> Result<Self> {
        let command = provider.command_name().ok_or_else(|| {
            ScorerError::Config(format!("{:?} はCLIプロバイダではありません", provider))
        })?;

        Ok(Self {
            provider,
            command: command.to_string(),
            model,
            timeout,
        })
    }

    fn build_command(&self) -> Command {
        let args = self.provider.command_args(self.model.as_deref());

        // Windowsではcmd /c経由（引数は固定のフラグとモデル名のみ）
        #[cfg(windows)]
        let mut cmd = {
            let mut cmd = Command::new("cmd");
            cmd.arg("/c").arg(&self.command);
            cmd
        };

        #[cfg(not(windows))]
        let mut cmd = Command::new(&self.command);

        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, prompt: &str) -> Result<std::process::Output> {
        let mut child = self
            .build_command()
            .spawn()
            .map_err(|e| ScorerError::CliExecution(format!("{} CLI実行エラー: {}", self.command, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| ScorerError::CliExecution(format!("{} への入力に失敗: {}", self.command, e)))?;
            // dropでEOFを送る
        }

        child
            .wait_with_output()
            .await
            .map_err(|e| ScorerError::CliExecution(format!("{} CLI実行エラー: {}", self.command, e)))
    }
}

impl CompletionBackend for CliBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let output = tokio::time::timeout(self.timeout, self.run(prompt))
            .await
            .map_err(|_| {
                ScorerError::CliExecution(format!(
                    "{} CLIが{}秒以内に応答しませんでした",
                    self.command,
                    self.timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScorerError::CliExecution(format!(
                "{} CLI failed (code {:?}): {}",
                self.command,
                output.status.code(),
                stderr.trim()
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).to_string();
        let preview: String = response.chars().take(200).collect();
        debug!(command = %self.command, chars = response.len(), preview = %preview, "CLI response");

        Ok(response)
    }
}
