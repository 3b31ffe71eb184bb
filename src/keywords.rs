// src/keywords.rs
//! Keyword configuration: the ingestion filter list and the digest topic
//! dictionary. File-based overrides (TOML or JSON) with built-in defaults.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "KEYWORDS_CONFIG_PATH";

/// Ingestion keywords: stems matched as substrings against lower-cased
/// message text. Русскоязычные основы слов, чтобы ловить словоформы.
const DEFAULT_INGEST_KEYWORDS: &[&str] = &[
    "россия",
    "российск",
    "крипт",
    "биткоин",
    "эфириум",
    "санкци",
    "экономик",
    "энергетик",
    "оборон",
    "войн",
    "газпром",
    "рубль",
    "нефть",
    "доллар",
    "евро",
    "турция",
    "украин",
    "сирия",
    "китай",
    "индия",
    "европа",
    "сша",
    "организаци",
];

/// Digest topics: counted as substrings over the concatenated post blob.
const DEFAULT_TOPICS: &[&str] = &[
    "санкции",
    "россия",
    "китай",
    "энергетика",
    "рубль",
    "евразия",
    "безопасность",
    "торговля",
    "технологии",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordConfig {
    ingest: Vec<String>,
    topics: Vec<String>,
}

impl KeywordConfig {
    /// Built-in keyword set, used when no config file is present.
    pub fn builtin() -> Self {
        Self {
            ingest: DEFAULT_INGEST_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            topics: DEFAULT_TOPICS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load from an explicit path. Supports TOML or JSON formats.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading keywords from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_keywords(&content, ext.as_str())
    }

    /// Load using env var + fallbacks:
    /// 1) $KEYWORDS_CONFIG_PATH
    /// 2) config/keywords.toml
    /// 3) config/keywords.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("KEYWORDS_CONFIG_PATH points to non-existent path"));
            }
        }
        let toml_p = PathBuf::from("config/keywords.toml");
        if toml_p.exists() {
            return Self::load_from(&toml_p);
        }
        let json_p = PathBuf::from("config/keywords.json");
        if json_p.exists() {
            return Self::load_from(&json_p);
        }
        Ok(Self::builtin())
    }

    pub fn ingest_keywords(&self) -> &[String] {
        &self.ingest
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }
}

/// Subset of `keywords` found as substrings in the lower-cased text,
/// preserving list order.
pub fn match_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    let lower = text.to_lowercase();
    keywords
        .iter()
        .filter(|kw| !kw.is_empty() && lower.contains(kw.to_lowercase().as_str()))
        .cloned()
        .collect()
}

/// Non-overlapping substring occurrence count. No word-boundary logic:
/// a term inside a longer word counts too. The blob is expected to be
/// lower-cased already; the term is lower-cased here.
pub fn count_occurrences(blob: &str, term: &str) -> usize {
    let t = term.to_lowercase();
    if t.is_empty() {
        return 0;
    }
    blob.matches(t.as_str()).count()
}

fn parse_keywords(s: &str, hint_ext: &str) -> Result<KeywordConfig> {
    // Try TOML first if hinted or content looks like toml.
    let try_toml = hint_ext == "toml" || s.contains("keywords");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported keywords format"))
}

#[derive(serde::Deserialize)]
struct FileKeywords {
    keywords: Vec<String>,
    topics: Vec<String>,
}

fn parse_toml(s: &str) -> Result<KeywordConfig> {
    let v: FileKeywords = toml::from_str(s)?;
    build_config(v)
}

fn parse_json(s: &str) -> Result<KeywordConfig> {
    let v: FileKeywords = serde_json::from_str(s)?;
    build_config(v)
}

fn build_config(v: FileKeywords) -> Result<KeywordConfig> {
    let ingest = clean_list(v.keywords);
    let topics = clean_list(v.topics);
    if ingest.is_empty() {
        return Err(anyhow!("keywords list must not be empty"));
    }
    if topics.is_empty() {
        return Err(anyhow!("topics list must not be empty"));
    }
    Ok(KeywordConfig { ingest, topics })
}

/// Trim, drop empties, lower-case, dedupe preserving first occurrence.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() && seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}
