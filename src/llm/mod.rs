pub mod providers;

use crate::config::LlmConfig;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM connection error: {0}")]
    ConnectionError(String),
    #[error("LLM response error: {0}")]
    ResponseError(String),
    #[error("LLM configuration error: {0}")]
    ConfigError(String),
}

/// A generative model reachable over some transport: prompt in, raw text out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct LlmManager {
    client: Box<dyn ModelClient + Send + Sync>,
    backend: String,
}

impl LlmManager {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let client: Box<dyn ModelClient + Send + Sync> = match config.backend.as_str() {
            "remote" => Box::new(providers::remote::RemoteLlmProvider::new(config)?),
            "ollama" => Box::new(providers::ollama::OllamaProvider::new(config)?),
            "gemini" => Box::new(providers::gemini::GeminiProvider::new(config)?),
            "none" | "" => {
                return Err(LlmError::ConfigError(
                    "no LLM backend configured".to_string(),
                ))
            }
            _ => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported LLM backend: {}",
                    config.backend
                )))
            }
        };

        Ok(Self {
            client,
            backend: config.backend.clone(),
        })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }
}

#[async_trait]
impl ModelClient for LlmManager {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.client.generate(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(backend: &str) -> LlmConfig {
        LlmConfig {
            backend: backend.to_string(),
            model: "sqlcoder".to_string(),
            api_key: None,
            api_url: None,
        }
    }

    #[test]
    fn unknown_backend_fails_initialization() {
        let err = LlmManager::new(&config("carrier-pigeon")).err().unwrap();
        assert_eq!(
            err.to_string(),
            "LLM configuration error: Unsupported LLM backend: carrier-pigeon"
        );
        assert!(LlmManager::new(&config("none")).is_err());
    }

    #[test]
    fn remote_backend_requires_url_and_key() {
        assert!(matches!(
            LlmManager::new(&config("remote")),
            Err(LlmError::ConfigError(_))
        ));
        assert!(matches!(
            LlmManager::new(&config("gemini")),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    fn ollama_backend_uses_default_endpoint() {
        let manager = LlmManager::new(&config("ollama")).unwrap();
        assert_eq!(manager.backend(), "ollama");
    }
}
