use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, ScoutError};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const OUTPUT_FORMATS: &[&str] = &["json", "csv"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub api: ApiConfig,
    pub geocoder: GeocoderConfig,
    pub nearby: NearbyConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://ruehan-kopis.org".to_string(),
            timeout_seconds: 10,
            user_agent: format!("stage-scout/{}", env!("CARGO_PKG_VERSION")),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub ip_geolocation_url: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            ip_geolocation_url: "https://ipapi.co/json/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NearbyConfig {
    pub top_n: usize,
    pub facility_rows: usize,
    pub related_rows: usize,
    pub related_per_facility: usize,
    pub concurrent_requests: usize,
}

impl Default for NearbyConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            facility_rows: 2000,
            related_rows: 2,
            related_per_facility: 1,
            concurrent_requests: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            formats: vec!["json".to_string(), "csv".to_string()],
        }
    }
}

impl ScoutConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ScoutError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ScoutError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${KOPIS_TOKEN})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ScoutError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api.base_url)?;
        validation::validate_url("geocoder.base_url", &self.geocoder.base_url)?;
        validation::validate_url(
            "geocoder.ip_geolocation_url",
            &self.geocoder.ip_geolocation_url,
        )?;
        validation::validate_positive_number("api.timeout_seconds", self.api.timeout_seconds as usize, 1)?;
        validation::validate_non_empty_string("api.user_agent", &self.api.user_agent)?;

        validation::validate_range("nearby.top_n", self.nearby.top_n, 1, 100)?;
        validation::validate_positive_number("nearby.facility_rows", self.nearby.facility_rows, 1)?;
        validation::validate_positive_number("nearby.related_rows", self.nearby.related_rows, 1)?;
        validation::validate_positive_number(
            "nearby.concurrent_requests",
            self.nearby.concurrent_requests,
            1,
        )?;

        validation::validate_path("output.path", &self.output.path)?;
        for format in &self.output.formats {
            validation::validate_one_of("output.formats", format, OUTPUT_FORMATS)?;
        }

        Ok(())
    }

    /// Token from config, ignoring blanks and unresolved `${VAR}` placeholders.
    pub fn token(&self) -> Option<&str> {
        self.api
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty() && !(t.starts_with("${") && t.ends_with('}')))
    }
}

impl ConfigProvider for ScoutConfig {
    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> &[String] {
        &self.output.formats
    }

    fn top_n(&self) -> usize {
        self.nearby.top_n
    }

    fn facility_rows(&self) -> usize {
        self.nearby.facility_rows
    }

    fn related_rows(&self) -> usize {
        self.nearby.related_rows
    }

    fn related_per_facility(&self) -> usize {
        self.nearby.related_per_facility
    }

    fn concurrent_requests(&self) -> usize {
        self.nearby.concurrent_requests
    }
}

impl Validate for ScoutConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
