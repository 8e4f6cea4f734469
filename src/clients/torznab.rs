use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorznabItem {
    pub title: String,
    pub link: String,
    pub size: u64,
    pub pub_date: String,
}

/// Consolidates regexes for XML parsing to avoid per-call overhead.
struct TorznabRegex {
    item: Regex,
    title: Regex,
    link: Regex,
    enclosure: Regex,
    size: Regex,
    pub_date: Regex,
    error: Regex,
}

impl TorznabRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<TorznabRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    item: Regex::new(r"(?s)<item>(.*?)</item>").ok()?,
                    title: Regex::new(r"<title>(?:<!\[CDATA\[)?([^<]*?)(?:\]\]>)?</title>").ok()?,
                    link: Regex::new(r"<link>([^<]*)</link>").ok()?,
                    enclosure: Regex::new(r#"<enclosure[^>]*url="([^"]*)""#).ok()?,
                    size: Regex::new(r"<size>(\d+)</size>").ok()?,
                    pub_date: Regex::new(r"<pubDate>([^<]*)</pubDate>").ok()?,
                    error: Regex::new(r#"<error[^>]*description="([^"]*)""#).ok()?,
                })
            })
            .as_ref()
    }
}

fn extract_tag(xml: &str, re: &Regex) -> String {
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn parse_item(item_xml: &str) -> Option<TorznabItem> {
    let re = TorznabRegex::get()?;
    let title = html_escape::decode_html_entities(&extract_tag(item_xml, &re.title)).to_string();
    if title.is_empty() {
        return None;
    }

    let mut link = extract_tag(item_xml, &re.enclosure);
    if link.is_empty() {
        link = extract_tag(item_xml, &re.link);
    }
    if link.is_empty() {
        return None;
    }

    Some(TorznabItem {
        title,
        link: html_escape::decode_html_entities(&link).to_string(),
        size: extract_tag(item_xml, &re.size).parse().unwrap_or(0),
        pub_date: extract_tag(item_xml, &re.pub_date),
    })
}

/// Parses the `<item>` entries of a Torznab response.
///
/// Returns an error when the indexer answered with an `<error>` document.
pub fn parse_feed(xml: &str) -> Result<Vec<TorznabItem>> {
    let Some(re) = TorznabRegex::get() else {
        return Ok(Vec::new());
    };

    let error = extract_tag(xml, &re.error);
    if !error.is_empty() {
        anyhow::bail!("Indexer returned an error: {error}");
    }

    Ok(re
        .item
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .filter_map(|m| parse_item(m.as_str()))
        .collect())
}

/// One Torznab `t=tvsearch` query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TvSearch {
    pub query: String,
    pub season: Option<String>,
    pub episode: Option<String>,
}

#[derive(Clone)]
pub struct TorznabClient {
    client: Client,
    base_url: String,
    api_key: String,
    categories: Vec<u32>,
}

impl TorznabClient {
    /// Creates a new client against a Torznab endpoint (`…/api` is appended).
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        categories: Vec<u32>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Backlogarr/1.0")
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            categories,
        })
    }

    pub fn build_url(&self, search: &TvSearch) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/api", self.base_url))
            .with_context(|| format!("Invalid Torznab URL: {}", self.base_url))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("t", "tvsearch");
            if !self.api_key.is_empty() {
                pairs.append_pair("apikey", &self.api_key);
            }
            pairs.append_pair("q", &search.query);
            if let Some(season) = &search.season {
                pairs.append_pair("season", season);
            }
            if let Some(episode) = &search.episode {
                pairs.append_pair("ep", episode);
            }
            if !self.categories.is_empty() {
                let cats: Vec<String> = self.categories.iter().map(ToString::to_string).collect();
                pairs.append_pair("cat", &cats.join(","));
            }
        }

        Ok(url)
    }

    pub async fn search(&self, search: &TvSearch) -> Result<Vec<TorznabItem>> {
        let url = self.build_url(search)?;
        let xml = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach indexer")?
            .error_for_status()?
            .text()
            .await?;
        parse_feed(&xml)
    }
}
