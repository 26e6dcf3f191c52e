use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::TrackerError;
use super::types::ElementSet;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a session's element sets come from. Loaded exactly once per session.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ElementSource {
    File(PathBuf),
    Url(String),
    #[serde(skip)]
    Inline(Vec<ElementSet>),
}

impl ElementSource {
    pub fn describe(&self) -> String {
        match self {
            ElementSource::File(path) => path.display().to_string(),
            ElementSource::Url(url) => url.clone(),
            ElementSource::Inline(sets) => format!("{} inline element sets", sets.len()),
        }
    }

    pub async fn load(&self) -> Result<Vec<ElementSet>, TrackerError> {
        match self {
            ElementSource::File(path) => {
                let content = tokio::fs::read_to_string(path).await?;
                parse_element_sets(&content)
            }
            ElementSource::Url(url) => parse_element_sets(&fetch(url).await?),
            ElementSource::Inline(sets) if sets.is_empty() => Err(TrackerError::NoElements),
            ElementSource::Inline(sets) => Ok(sets.clone()),
        }
    }
}

async fn fetch(url: &str) -> Result<String, TrackerError> {
    let client = reqwest::Client::builder().timeout(FETCH_TIMEOUT).build()?;

    log::info!("Fetching element sets from {}", url);
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(TrackerError::Fetch(format!("HTTP error: {}", response.status())));
    }
    Ok(response.text().await?)
}

pub fn parse_element_sets(json: &str) -> Result<Vec<ElementSet>, TrackerError> {
    let sets: Vec<ElementSet> = serde_json::from_str(json)?;
    if sets.is_empty() {
        return Err(TrackerError::NoElements);
    }
    Ok(sets)
}
