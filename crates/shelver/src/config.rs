//! Configuration for the shelver service

use crate::error::{Result, ShelverError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Main configuration for shelver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShelverConfig {
    /// Directory watched for newly-arrived documents (non-recursive)
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Root under which per-subject destination folders are created.
    /// Defaults to the watch directory itself, matching a flat
    /// inbox-with-subject-subfolders layout.
    #[serde(default)]
    pub dest_root: Option<PathBuf>,

    /// Closed allow-list of file extensions worth classifying
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Seconds to wait before probing a new file for stability
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Short-circuit on a unique filename-signal winner before paying for
    /// content extraction and model prediction
    #[serde(default = "default_true")]
    pub filename_first: bool,

    /// Path to the trained token-weight model artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Human veto window settings
    #[serde(default)]
    pub confirm: ConfirmConfig,

    /// Subject label -> filename keywords
    #[serde(default = "default_subject_keywords")]
    pub subject_keywords: BTreeMap<String, Vec<String>>,

    /// Removable-volume label -> subject label
    #[serde(default)]
    pub device_labels: BTreeMap<String, String>,
}

/// Confirmation-protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmConfig {
    /// Whether to solicit a veto before committing a move
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Veto window in seconds; silence means approval
    #[serde(default = "default_confirm_window_secs")]
    pub window_secs: u64,
}

impl Default for ConfirmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: default_confirm_window_secs(),
        }
    }
}

fn default_watch_dir() -> PathBuf {
    shelver_logging::shelver_home().join("inbox")
}

fn default_extensions() -> Vec<String> {
    [".docx", ".pdf", ".pptx", ".wps", ".txt", ".md"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_delay_secs() -> u64 {
    3
}

fn default_confirm_window_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

fn default_model_path() -> PathBuf {
    shelver_logging::shelver_home().join("subject_model.json")
}

fn default_subject_keywords() -> BTreeMap<String, Vec<String>> {
    let table: &[(&str, &[&str])] = &[
        (
            "语文",
            &["语文", "文言文", "古诗", "作文", "阅读理解", "现代文", "议论文"],
        ),
        (
            "数学",
            &["数学", "函数", "几何", "方程", "代数", "集合", "不等式"],
        ),
        (
            "英语",
            &["英语", "单词", "语法", "reading", "听力", "完形填空"],
        ),
        ("物理", &["物理", "力学", "能量", "电学", "磁场", "电磁感应"]),
        ("化学", &["化学", "反应", "元素", "方程式", "离子反应"]),
        ("生物", &["生物", "细胞", "DNA", "生态", "遗传", "基因"]),
        ("历史", &["历史", "朝代", "战争", "文明", "近代史", "古代史"]),
        ("政治", &["政治", "法律", "公民", "制度", "国家"]),
        ("地理", &["地理", "气候", "地形", "区域", "地图"]),
    ];
    table
        .iter()
        .map(|(subject, keywords)| {
            (
                subject.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            )
        })
        .collect()
}

impl Default for ShelverConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            dest_root: None,
            extensions: default_extensions(),
            delay_secs: default_delay_secs(),
            filename_first: true,
            model_path: default_model_path(),
            confirm: ConfirmConfig::default(),
            subject_keywords: default_subject_keywords(),
            device_labels: BTreeMap::new(),
        }
    }
}

impl ShelverConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShelverError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: ShelverConfig =
            toml::from_str(&content).map_err(|e| ShelverError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ShelverError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The effective destination root (defaults to the watch directory).
    pub fn dest_root(&self) -> &Path {
        self.dest_root.as_deref().unwrap_or(&self.watch_dir)
    }

    /// True if the path's extension is in the allow-list (case-insensitive).
    pub fn extension_allowed(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext.to_lowercase());
        self.extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == dotted)
    }

    /// Startup validation. A service must refuse to run with an undefined
    /// watch target or an empty allow-list.
    pub fn validate(&self) -> Result<()> {
        if !self.watch_dir.is_dir() {
            return Err(ShelverError::Config(format!(
                "Watch directory does not exist: {}",
                self.watch_dir.display()
            )));
        }
        if self.extensions.is_empty() {
            return Err(ShelverError::Config(
                "No supported extensions configured".to_string(),
            ));
        }
        if self.subject_keywords.is_empty() {
            return Err(ShelverError::Config(
                "No subjects configured".to_string(),
            ));
        }
        Ok(())
    }
}
