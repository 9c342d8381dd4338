use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Language-model endpoint configuration
    pub llm: LlmConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible chat-completions endpoint
    pub base_url: String,

    /// Model name requested for title and summary generation
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Skip TLS certificate verification (internal gateways with self-signed certs)
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Display width for embedded frames, in inches
    pub image_width_inches: f64,

    /// Directory holding the html page and step templates
    pub templates_dir: PathBuf,

    /// Whisper model used for transcription
    pub whisper_model: String,

    /// Keep downloaded remote videos after the run
    pub keep_video: bool,

    /// Suppress progress indicators; set from the CLI, not persisted
    #[serde(skip)]
    pub quiet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o".to_string(),
                api_key_env: "OPENAI_API_KEY".to_string(),
                accept_invalid_certs: false,
            },
            app: AppConfig {
                image_width_inches: 5.0,
                templates_dir: PathBuf::from("templates"),
                whisper_model: "base".to_string(),
                keep_video: false,
                quiet: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("vid2doc").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.llm.base_url.is_empty() {
            anyhow::bail!("Language-model base URL must be configured");
        }

        url::Url::parse(&self.llm.base_url)
            .with_context(|| format!("Invalid language-model base URL: {}", self.llm.base_url))?;

        if self.app.image_width_inches <= 0.0 {
            anyhow::bail!("Image width must be positive, got {}", self.app.image_width_inches);
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  LLM Base URL: {}", self.llm.base_url);
        println!("  LLM Model: {}", self.llm.model);
        println!("  API Key Env Var: {}", self.llm.api_key_env);
        println!("  Image Width: {} in", self.app.image_width_inches);
        println!("  Templates Dir: {}", self.app.templates_dir.display());
        println!("  Whisper Model: {}", self.app.whisper_model);
        println!("  Keep Video: {}", self.app.keep_video);
    }

    /// Interactive configuration setup
    pub async fn interactive_setup(&self) -> Result<()> {
        println!("Interactive configuration setup coming soon!");
        println!("For now, please edit the config file manually:");
        println!("  {}", Self::config_path()?.display());
        Ok(())
    }
}
