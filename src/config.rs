use crate::ai_provider::AiProvider;
use crate::error::{Result, ScorerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    /// 未指定ならプロバイダ既定のモデル
    pub model: Option<String>,
    /// 未指定ならプロバイダ既定のエンドポイント
    pub api_endpoint: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
    /// 行ごとの待機秒数（レート制限対策）
    pub row_delay_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            api_endpoint: None,
            temperature: 0.0,
            max_tokens: 256,
            timeout_seconds: 120,
            row_delay_seconds: 15,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ScorerError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("survey-scorer").join("config.json"))
    }

    pub fn model_for(&self, provider: AiProvider) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string())
    }

    pub fn endpoint_for(&self, provider: AiProvider) -> Result<String> {
        self.api_endpoint
            .clone()
            .or_else(|| provider.default_endpoint().map(str::to_string))
            .ok_or_else(|| {
                ScorerError::Config(format!("{:?} にはAPIエンドポイントがありません", provider))
            })
    }

    /// 環境変数を優先し、なければ保存済みのキー
    pub fn get_api_key(&self, provider: AiProvider) -> Result<String> {
        if let Some(var) = provider.api_key_env() {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    return Ok(key);
                }
            }
        }

        self.api_key.clone().ok_or(ScorerError::MissingApiKey)
    }

    pub fn set_api_key(&mut self, key: String) -> Result<()> {
        self.api_key = Some(key);
        self.save()
    }

    pub fn row_delay(&self) -> Duration {
        Duration::from_secs(self.row_delay_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("none.json")).unwrap();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.row_delay_seconds, 15);
    }

    #[test]
    fn test_save_and_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"model": "llama-3", "row_delay_seconds": 2}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.model_for(AiProvider::GroqApi), "llama-3");
        assert_eq!(config.row_delay(), Duration::from_secs(2));
        assert_eq!(config.timeout_seconds, 120);

        config.save_to(&path).unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.model.as_deref(), Some("llama-3"));
    }

    #[test]
    fn test_endpoint_defaults_by_provider() {
        let config = Config::default();
        assert!(config.endpoint_for(AiProvider::AnthropicApi).unwrap().contains("anthropic"));
        assert!(config.endpoint_for(AiProvider::Claude).is_err());
    }
}
