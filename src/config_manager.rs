use anyhow::{anyhow, Result};
use configparser::ini::Ini;
use log::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ReviewInsightError;

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GeminiConfig {
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    /// API 키를 읽을 환경 변수 이름. 키 자체는 설정 파일에 저장하지 않는다.
    pub api_key_env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            gemini: GeminiConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl GeminiConfig {
    /// 요청마다 호출한다. 키가 없으면 요청 전에 실패한다.
    pub fn resolve_api_key(&self) -> Result<String, ReviewInsightError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ReviewInsightError::Configuration(format!(
                "environment variable {} is not set",
                self.api_key_env
            ))),
        }
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
    pub config: AppConfig,
}

impl ConfigManager {
    pub fn new(config_dir: &Path) -> Result<Self> {
        // 설정 디렉토리가 존재하지 않으면 생성
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .map_err(|e| anyhow!("Failed to create config directory: {}", e))?;
        }

        let mut manager = ConfigManager {
            config_path: config_dir.join("config.ini"),
            config: AppConfig::default(),
        };

        if manager.config_path.exists() {
            manager.load()?;
        } else {
            manager.create_default()?;
            manager.save()?;
        }

        Ok(manager)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&mut self) -> Result<()> {
        let config_str = fs::read_to_string(&self.config_path)?;
        let mut config_ini = Ini::new();
        config_ini.read(config_str).map_err(|e| anyhow!("Failed to read config string: {}", e))?;

        let mut app_config = AppConfig::default();

        if let Some(model) = config_ini.get("gemini", "model") {
            app_config.gemini.model = model;
        }
        if let Some(api_base) = config_ini.get("gemini", "api_base") {
            app_config.gemini.api_base = api_base;
        }
        if let Some(timeout_str) = config_ini.get("gemini", "timeout_secs") {
            match timeout_str.parse::<u64>() {
                Ok(timeout_secs) if timeout_secs > 0 => app_config.gemini.timeout_secs = timeout_secs,
                _ => warn!("timeout_secs 값 '{}'이(가) 올바르지 않아 기본값을 사용합니다.", timeout_str),
            }
        }
        if let Some(api_key_env) = config_ini.get("gemini", "api_key_env") {
            app_config.gemini.api_key_env = api_key_env;
        }

        self.config = app_config;
        self.validate()?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let mut config_ini = Ini::new();
        let gemini = &self.config.gemini;

        config_ini.set("gemini", "model", Some(gemini.model.clone()));
        config_ini.set("gemini", "api_base", Some(gemini.api_base.clone()));
        config_ini.set("gemini", "timeout_secs", Some(gemini.timeout_secs.to_string()));
        config_ini.set("gemini", "api_key_env", Some(gemini.api_key_env.clone()));

        config_ini.write(&self.config_path).map_err(|e| anyhow!("Failed to write config to file: {}", e))?;
        Ok(())
    }

    pub fn create_default(&mut self) -> Result<()> {
        self.config = AppConfig::default();
        info!("{} 파일이 생성되었습니다.", self.config_path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let gemini = &self.config.gemini;
        if gemini.model.trim().is_empty() {
            return Err(anyhow!("{}: [gemini] model 값이 비어 있습니다.", self.config_path.display()));
        }
        if gemini.api_base.trim().is_empty() {
            return Err(anyhow!("{}: [gemini] api_base 값이 비어 있습니다.", self.config_path.display()));
        }

        // 키가 없어도 앱은 실행되고, 분석 요청 시점에 오류를 보여준다
        if gemini.resolve_api_key().is_err() {
            warn!("{} 환경 변수에 Gemini API 키를 설정해야 분석을 사용할 수 있습니다.", gemini.api_key_env);
        }
        Ok(())
    }
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_config(
    state: tauri::State<'_, std::sync::Arc<tokio::sync::Mutex<ConfigManager>>>,
) -> Result<AppConfig, String> {
    Ok(state.inner().lock().await.config.clone())
}
