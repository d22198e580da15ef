use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub prompt: PromptBudgets,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// CORS allow-list. `["*"]` permits any origin.
    #[serde(default = "default_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            allowed_origins: default_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Name of the environment variable holding the HMAC token secret.
    /// The secret itself never appears in the config file.
    #[serde(default = "default_secret_env")]
    pub secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
        }
    }
}

fn default_secret_env() -> String {
    "SKILLWISE_AUTH_SECRET".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chat_temperature")]
    pub chat_temperature: f32,
    #[serde(default = "default_quiz_temperature")]
    pub quiz_temperature: f32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            chat_temperature: default_chat_temperature(),
            quiz_temperature: default_quiz_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "openai/gpt-3.5-turbo".to_string()
}
fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_chat_temperature() -> f32 {
    0.7
}
fn default_quiz_temperature() -> f32 {
    0.9
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Maximum accepted upload size in bytes (enforced at the ingress layer).
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    /// Budget for a single extraction run on the blocking pool.
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            extract_timeout_secs: default_extract_timeout_secs(),
        }
    }
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_extract_timeout_secs() -> u64 {
    30
}

/// Character budgets applied by the prompt composer before any text is
/// sent to the completion service.
#[derive(Debug, Deserialize, Clone)]
pub struct PromptBudgets {
    /// Budget for stored document text on the document-Q&A path.
    #[serde(default = "default_document_budget")]
    pub document_budget: usize,
    /// Budget for the optional context on the single-shot chat path.
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,
}

impl Default for PromptBudgets {
    fn default() -> Self {
        Self {
            document_budget: default_document_budget(),
            context_budget: default_context_budget(),
        }
    }
}

fn default_document_budget() -> usize {
    15_000
}
fn default_context_budget() -> usize {
    3_000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.completion.base_url.is_empty() {
        anyhow::bail!("completion.base_url must not be empty");
    }
    if config.completion.model.is_empty() {
        anyhow::bail!("completion.model must not be empty");
    }
    if config.completion.timeout_secs == 0 {
        anyhow::bail!("completion.timeout_secs must be > 0");
    }
    for (name, t) in [
        ("chat_temperature", config.completion.chat_temperature),
        ("quiz_temperature", config.completion.quiz_temperature),
    ] {
        if !(0.0..=2.0).contains(&t) {
            anyhow::bail!("completion.{} must be in [0.0, 2.0]", name);
        }
    }

    if config.upload.max_bytes == 0 {
        anyhow::bail!("upload.max_bytes must be > 0");
    }
    if config.upload.extract_timeout_secs == 0 {
        anyhow::bail!("upload.extract_timeout_secs must be > 0");
    }

    if config.prompt.document_budget == 0 {
        anyhow::bail!("prompt.document_budget must be > 0");
    }
    if config.prompt.context_budget == 0 {
        anyhow::bail!("prompt.context_budget must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn empty_file_yields_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:5000");
        assert_eq!(config.prompt.document_budget, 15_000);
        assert_eq!(config.prompt.context_budget, 3_000);
        assert_eq!(config.upload.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.completion.model, "openai/gpt-3.5-turbo");
        assert!((config.completion.chat_temperature - 0.7).abs() < f32::EPSILON);
        assert!((config.completion.quiz_temperature - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn overrides_are_honored() {
        let file = write_config(
            r#"
[server]
bind = "0.0.0.0:8080"
allowed_origins = ["*"]

[prompt]
document_budget = 500
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.allowed_origins, vec!["*"]);
        assert_eq!(config.prompt.document_budget, 500);
        // untouched section keeps defaults
        assert_eq!(config.completion.timeout_secs, 30);
    }

    #[test]
    fn zero_budget_is_rejected() {
        let file = write_config("[prompt]\ndocument_budget = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("document_budget"));
    }

    #[test]
    fn out_of_range_temperature_is_rejected() {
        let file = write_config("[completion]\nchat_temperature = 3.5\n");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
