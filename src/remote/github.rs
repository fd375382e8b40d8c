use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use std::time::Duration;

use super::http_client::{ensure_ok, with_retries};
use super::wire::{CodeSearchResponse, SearchReposResponse, TreeResponse};
use super::{BlobStream, RemoteApi, SearchPage, TreeResult};
use crate::types::{SearchQuery, SearchWindow};
use crate::utils::config::{PackagePaths, PlatformLimits, RetryConsts};

/// Blocking GitHub REST client. Cheap to share behind an `Arc`; reqwest pools connections.
pub struct GitHubClient {
    api_url: Url,
    token: Option<String>,
    client: reqwest::blocking::Client,
}

impl GitHubClient {
    pub fn new(token: Option<String>) -> Result<Self> {
        Self::with_api_url(PlatformLimits::API_URL, token)
    }

    pub fn with_api_url(api_url: &str, token: Option<String>) -> Result<Self> {
        let api_url = Url::parse(api_url).with_context(|| format!("parse API url {api_url}"))?;
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        let client = reqwest::blocking::Client::builder()
            .user_agent(PackagePaths::get().user_agent())
            .default_headers(headers)
            .timeout(Duration::from_secs(RetryConsts::TIMEOUT_SECS))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            api_url,
            token,
            client,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// API url with each segment percent-encoded (branch names may contain `/`).
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("API url cannot be a base: {}", self.api_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> reqwest::blocking::RequestBuilder {
        let req = self.client.get(url);
        match &self.token {
            Some(t) => req.header(AUTHORIZATION, format!("Bearer {t}")),
            None => req,
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url, label: &str) -> Result<T> {
        with_retries(label, || {
            let resp = self.get(url.clone()).send().context("send")?;
            ensure_ok(resp, label)?.json::<T>().context("parse json")
        })
    }
}

impl RemoteApi for GitHubClient {
    fn search_repositories(
        &self,
        query: &SearchQuery,
        window: &SearchWindow,
        page: u32,
        per_page: usize,
    ) -> Result<SearchPage> {
        let mut url = self.url(&["search", "repositories"])?;
        url.query_pairs_mut()
            .append_pair("q", &query.render(window))
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());
        let resp: SearchReposResponse =
            self.get_json(url, &format!("search repositories {} page {}", window, page))?;
        Ok(SearchPage {
            total_count: resp.total_count,
            items: resp.items.into_iter().map(Into::into).collect(),
        })
    }

    fn get_tree(&self, full_name: &str, reference: &str, recursive: bool) -> Result<TreeResult> {
        let (owner, name) = full_name
            .split_once('/')
            .with_context(|| format!("repository name without owner: {full_name}"))?;
        let mut url = self.url(&["repos", owner, name, "git", "trees", reference])?;
        if recursive {
            url.query_pairs_mut().append_pair("recursive", "1");
        }
        let resp: TreeResponse =
            self.get_json(url, &format!("tree {}@{}", full_name, reference))?;
        let entries = resp.tree.into_iter().map(Into::into).collect();
        Ok(if resp.truncated {
            TreeResult::Truncated { partial: entries }
        } else {
            TreeResult::Complete(entries)
        })
    }

    fn open_blob_stream(&self, url: &str) -> Result<BlobStream> {
        let url = Url::parse(url).with_context(|| format!("parse blob url {url}"))?;
        // Raw content is public; the token stays with the API host.
        let resp = with_retries(&format!("download {url}"), || {
            let resp = self.client.get(url.clone()).send().context("send")?;
            ensure_ok(resp, "download")
        })?;
        Ok(Box::new(resp))
    }

    fn count_code_matches(
        &self,
        full_name: &str,
        extension: &str,
        extra_terms: Option<&str>,
    ) -> Result<u64> {
        let mut q = format!("repo:{full_name}");
        let ext = extension.trim_start_matches('.');
        if !ext.is_empty() {
            q.push_str(&format!(" extension:{ext}"));
        }
        if let Some(terms) = extra_terms.map(str::trim).filter(|t| !t.is_empty()) {
            q.push(' ');
            q.push_str(terms);
        }
        let mut url = self.url(&["search", "code"])?;
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("per_page", "1");
        let resp: CodeSearchResponse = self.get_json(url, &format!("code search {q}"))?;
        Ok(resp.total_count)
    }
}
