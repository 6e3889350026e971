//! MediaWiki action API client.

use crate::store::{ContentModel, PageStore};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct MediaWikiClient {
    endpoint: String,
    client: Client,
    credentials: Option<(String, String)>,
    session: Mutex<Session>,
}

#[derive(Default)]
struct Session {
    logged_in: bool,
    csrf_token: Option<String>,
}

impl MediaWikiClient {
    /// Client for `endpoint`; login happens lazily before the first edit
    pub fn new(
        endpoint: &str,
        verify_tls: bool,
        credentials: Option<(String, String)>,
    ) -> Result<Self> {
        if endpoint.trim().is_empty() {
            bail!("MediaWiki endpoint is required");
        }
        if !verify_tls {
            log::info!("TLS verification disabled for {endpoint}");
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(!verify_tls)
            .user_agent(concat!("wikitrans/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build MediaWiki HTTP client")?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            credentials,
            session: Mutex::new(Session::default()),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get(&self, params: &[(&str, &str)]) -> Result<Value> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.endpoint))?
            .error_for_status()?;
        resp.json().await.context("invalid JSON from MediaWiki")
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<Value> {
        let mut form = form.to_vec();
        form.push(("format", "json"));
        let resp = self
            .client
            .post(&self.endpoint)
            .form(&form)
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.endpoint))?
            .error_for_status()?;
        resp.json().await.context("invalid JSON from MediaWiki")
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let data = self
            .get(&[("action", "query"), ("meta", "tokens"), ("type", "login")])
            .await?;
        let token = data["query"]["tokens"]["logintoken"]
            .as_str()
            .ok_or_else(|| anyhow!("no login token in response"))?
            .to_string();

        let data = self
            .post(&[
                ("action", "login"),
                ("lgname", username),
                ("lgpassword", password),
                ("lgtoken", token.as_str()),
            ])
            .await?;
        if data["login"]["result"] != "Success" {
            bail!("Login failed: {}", data["login"]);
        }
        log::info!("Logged in to {} as {username}", self.endpoint);
        Ok(())
    }

    async fn csrf_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;
        if let Some(token) = &session.csrf_token {
            return Ok(token.clone());
        }
        if !session.logged_in {
            if let Some((user, pass)) = &self.credentials {
                if let Err(e) = self.login(user, pass).await {
                    log::warn!("Login failed on {}: {e:#}", self.endpoint);
                }
            }
            session.logged_in = true;
        }

        let data = self.get(&[("action", "query"), ("meta", "tokens")]).await?;
        let token = data["query"]["tokens"]["csrftoken"]
            .as_str()
            .ok_or_else(|| anyhow!("no csrf token in response"))?
            .to_string();
        session.csrf_token = Some(token.clone());
        Ok(token)
    }

    /// The single page object of a `titles=` query
    fn first_page(data: &Value) -> Option<(&String, &Value)> {
        data["query"]["pages"].as_object()?.iter().next()
    }
}

#[async_trait]
impl PageStore for MediaWikiClient {
    async fn fetch_wikitext(&self, title: &str) -> Result<Option<String>> {
        let data = self
            .get(&[
                ("action", "query"),
                ("prop", "revisions"),
                ("rvslots", "main"),
                ("rvprop", "content"),
                ("titles", title),
            ])
            .await?;
        Ok(Self::first_page(&data)
            .and_then(|(_, page)| page["revisions"][0]["slots"]["main"]["*"].as_str())
            .map(str::to_string))
    }

    async fn page_exists(&self, title: &str) -> Result<bool> {
        let data = self.get(&[("action", "query"), ("titles", title)]).await?;
        Ok(Self::first_page(&data)
            .and_then(|(id, _)| id.parse::<i64>().ok())
            .is_some_and(|id| id > 0))
    }

    async fn langlinks(&self, title: &str) -> Result<BTreeMap<String, String>> {
        let data = self
            .get(&[
                ("action", "query"),
                ("titles", title),
                ("prop", "langlinks"),
                ("lllimit", "500"),
            ])
            .await?;
        let links: BTreeMap<String, String> = Self::first_page(&data)
            .and_then(|(_, page)| page["langlinks"].as_array())
            .map(|links| {
                links
                    .iter()
                    .filter_map(|l| Some((l["lang"].as_str()?.to_string(), l["*"].as_str()?.to_string())))
                    .collect()
            })
            .unwrap_or_default();
        Ok(links)
    }

    async fn save_page(
        &self,
        title: &str,
        text: &str,
        summary: &str,
        model: ContentModel,
    ) -> Result<()> {
        let token = self.csrf_token().await?;
        let mut form = vec![
            ("action", "edit"),
            ("title", title),
            ("text", text),
            ("summary", summary),
            ("watchlist", "nochange"),
            ("token", token.as_str()),
        ];
        if model == ContentModel::Json {
            form.push(("contentmodel", "json"));
            form.push(("contentformat", "application/json"));
        }

        let data = self.post(&form).await?;
        if let Some(error) = data.get("error") {
            bail!("Edit of '{title}' rejected: {error}");
        }
        log::debug!("Saved '{title}' on {}", self.endpoint);
        Ok(())
    }

    fn location(&self) -> String {
        self.endpoint.clone()
    }
}
