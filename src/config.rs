use crate::ocr_rank::{DEFAULT_MIN_TOKEN_LEN, DEFAULT_SHORTLIST, RankOptions};
use crate::packing::CustomCartonFields;
use serde::Deserialize;
use std::{fs, io, path::Path};
use toml_edit::{DocumentMut, Item, Table, value};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub matching: MatchingConfig,
    pub packing: PackingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON snapshot on disk. Takes precedence over `api_url`.
    pub path: Option<String>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub products_endpoint: String,
    pub formats_path: Option<String>,
    pub formats_endpoint: String,
    pub timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            api_url: None,
            api_token: None,
            products_endpoint: "/api/v1/products/".to_string(),
            formats_path: None,
            formats_endpoint: "/api/v1/carton-formats/".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub ocr_shortlist: usize,
    pub ocr_min_token_len: usize,
    pub suggestion_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            ocr_shortlist: DEFAULT_SHORTLIST,
            ocr_min_token_len: DEFAULT_MIN_TOKEN_LEN,
            suggestion_limit: 40,
        }
    }
}

impl MatchingConfig {
    pub fn rank_options(&self) -> RankOptions {
        RankOptions {
            shortlist: self.ocr_shortlist,
            min_token_len: self.ocr_min_token_len,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// Carton format id, or `"custom"`.
    pub default_format: String,
    pub custom: CustomCartonFields,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist the carton format selector, leaving the rest of the file untouched.
    pub fn set_default_format(
        path: impl AsRef<Path>,
        format_id: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        let mut doc = content.parse::<DocumentMut>()?;

        if !doc.contains_table("packing") {
            doc["packing"] = Item::Table(Table::new());
        }
        doc["packing"]["default_format"] = value(format_id);

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, doc.to_string())?;
        Ok(())
    }
}
