use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::filter::FilterPolicy;
use crate::keywords::{KeywordList, DEFAULT_KEYWORDS};

const ENV_PREFIX: &str = "FEEDSIFT";
const DEFAULT_CONFIG_FILE: &str = "feedsift";

/// Pipeline settings. Defaults, then `feedsift.toml`, then `FEEDSIFT_*`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub raw_path: PathBuf,
    pub parsed_path: PathBuf,
    pub filtered_path: PathBuf,
    pub csv_path: PathBuf,
    pub xlsx_path: PathBuf,
    pub sqlite_path: PathBuf,
    pub keywords: Vec<String>,
    pub min_likes: u64,
    pub min_comments: u64,
    pub require_keywords: bool,
}

impl Settings {
    /// `file` replaces the optional `feedsift.toml` in the working directory
    /// and must exist.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults: Vec<String> = DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect();

        let mut builder = Config::builder()
            .set_default("raw_path", "./data/raw/linkedin_posts.json")?
            .set_default("parsed_path", "./data/processed/parsed_posts.json")?
            .set_default("filtered_path", "./data/processed/filtered_posts.json")?
            .set_default("csv_path", "./data/final/filtered_posts.csv")?
            .set_default("xlsx_path", "./data/final/filtered_posts.xlsx")?
            .set_default("sqlite_path", "./data/final/filtered_posts.sqlite")?
            .set_default("keywords", defaults)?
            .set_default("min_likes", 0u64)?
            .set_default("min_comments", 0u64)?
            .set_default("require_keywords", true)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("keywords"),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn keyword_list(&self) -> KeywordList {
        KeywordList::new(self.keywords.iter().map(String::as_str))
    }

    pub fn filter_policy(&self) -> FilterPolicy {
        FilterPolicy {
            min_likes: self.min_likes,
            min_comments: self.min_comments,
            require_keywords: self.require_keywords,
        }
    }
}
