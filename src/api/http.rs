use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use reqwest::{
    Client,
    header::{COOKIE, HeaderMap, HeaderValue},
};
use serde::de::DeserializeOwned;
use url::Url;

use crate::{
    api::Api,
    types::{
        config,
        favorite::{Favorite, FavoriteKind},
        user::{LimitedUser, User},
        world::World,
    },
};

// the api caps favorites at 100 per request
const FAVORITES_PAGE: u32 = 100;

/// [`Api`] over the platform's https endpoints, authenticated with the `auth` cookie.
pub struct HttpApi {
    client: Client,
    base_url: Url,
}

impl HttpApi {
    pub fn new(config: &config::Api) -> Result<Self> {
        let mut cookie = HeaderValue::from_str(&format!("auth={}", config.auth_token.as_inner()))
            .context("auth token is not a valid header value")?;
        cookie.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, cookie);

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .context("could not build http client")?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(config.base_url.clone()),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.base_url.join(path)
            .with_context(|| format!("invalid api path {}", path))?;
        debug!("GET {} {:?}", url, query);

        let resp = self.client.get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {} failed", path))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", path))?;

        resp.json()
            .await
            .with_context(|| format!("could not decode response of {}", path))
    }

    async fn get_page<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Vec<T>>> {
        let page: Vec<T> = self.get(path, query).await?;
        Ok(non_empty(page))
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn get_self(&self) -> Result<User> {
        self.get("auth/user", &[]).await
    }

    async fn get_friends(&self, offline: bool, n: u32, offset: u32) -> Result<Option<Vec<LimitedUser>>> {
        self.get_page("auth/user/friends", &[
            ("offline", offline.to_string()),
            ("n", n.to_string()),
            ("offset", offset.to_string()),
        ]).await
    }

    async fn get_favorites(&self, kind: FavoriteKind) -> Result<Option<Vec<Favorite>>> {
        self.get_page("favorites", &[
            ("type", kind.to_string()),
            ("n", FAVORITES_PAGE.to_string()),
        ]).await
    }

    async fn get_world(&self, id: &str) -> Result<World> {
        self.get(&format!("worlds/{}", id), &[]).await
    }

    async fn get_recent_worlds(&self) -> Result<Option<Vec<World>>> {
        self.get_page("worlds/recent", &[]).await
    }
}

// Url::join drops the last path segment unless the base ends in a slash
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    url
}

fn non_empty<T>(page: Vec<T>) -> Option<Vec<T>> {
    if page.is_empty() {
        None
    } else {
        Some(page)
    }
}
