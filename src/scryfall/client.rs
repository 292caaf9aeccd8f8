//! HTTP implementation of [`SearchClient`] against the Scryfall REST API.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use std::time::Duration;

use super::types::{RemoteCard, ScryfallError, ScryfallList};
use super::{ClientError, ClientResult, SearchClient};
use crate::config::{ClientConfig, DEFAULT_API_URL};

/// Scryfall API client using async reqwest
#[derive(Debug, Clone)]
pub struct ScryfallClient {
    http: reqwest::Client,
    base_url: String,
    accept: String,
    request_delay: Duration,
}

impl ScryfallClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.as_str());

        if let Some(ref proxy_url) = config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
            log::info!("Using proxy: {}", proxy_url);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            accept: config.accept.clone(),
            request_delay: config.request_delay,
        })
    }

    /// Absolute URLs handed out by Scryfall always point at the public API;
    /// route them through the configured base URL instead.
    fn rebase(&self, url: &str) -> String {
        match url.strip_prefix(DEFAULT_API_URL) {
            Some(rest) if self.base_url != DEFAULT_API_URL => format!("{}{}", self.base_url, rest),
            _ => url.to_string(),
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/cards/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }

    /// Fetch one list page. `Ok(None)` means Scryfall answered `not_found`,
    /// which is how a search with zero matches is reported.
    async fn fetch_page(&self, url: &str) -> ClientResult<Option<ScryfallList>> {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        log::debug!("Fetching page from Scryfall: {}", url);

        let response = self
            .http
            .get(url)
            .header(header::ACCEPT, self.accept.as_str())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(Some(serde_json::from_str(&body)?));
        }

        match serde_json::from_str::<ScryfallError>(&body) {
            Ok(error) if status == StatusCode::NOT_FOUND && error.code == "not_found" => Ok(None),
            Ok(error) => Err(ClientError::Api {
                status: error.status,
                code: error.code,
                details: error.details,
            }),
            Err(_) => Err(ClientError::HttpStatus(status)),
        }
    }

    /// Follow `next_page` links until the list is exhausted
    async fn collect_pages(&self, first_url: String) -> ClientResult<Vec<RemoteCard>> {
        let mut cards = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0;

        while let Some(url) = next.take() {
            let Some(list) = self.fetch_page(&url).await? else {
                break;
            };
            pages += 1;
            cards.extend(list.data);
            if list.has_more {
                next = list.next_page.map(|u| self.rebase(&u));
            }
        }

        log::debug!("Collected {} cards over {} page(s)", cards.len(), pages);
        Ok(cards)
    }
}

#[async_trait]
impl SearchClient for ScryfallClient {
    async fn search_by_query(&self, query: &str) -> ClientResult<Vec<RemoteCard>> {
        log::info!("Searching Scryfall: {}", query);
        self.collect_pages(self.search_url(query)).await
    }

    async fn search_by_exact_name(&self, name: &str) -> ClientResult<Vec<RemoteCard>> {
        let query = format!("!\"{}\"", name);
        log::info!("Searching Scryfall for exact name: {}", name);
        self.collect_pages(self.search_url(&query)).await
    }

    async fn search_by_identifier(&self, oracle_id: &str) -> ClientResult<Vec<RemoteCard>> {
        let query = format!("oracleid:{}", oracle_id);
        log::info!("Searching Scryfall for oracle id: {}", oracle_id);
        self.collect_pages(self.search_url(&query)).await
    }

    async fn fetch_all_printings(&self, card: &RemoteCard) -> ClientResult<Vec<RemoteCard>> {
        let url = match (&card.prints_search_uri, card.oracle_id()) {
            (Some(uri), _) => self.rebase(uri),
            (None, Some(oracle_id)) => self.search_url(&format!(
                "oracleid:{} unique:prints order:released",
                oracle_id
            )),
            (None, None) => {
                log::debug!("No way to look up printings of {}", card.name);
                return Ok(Vec::new());
            }
        };
        log::info!("Fetching all printings of {}", card.name);
        self.collect_pages(url).await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
