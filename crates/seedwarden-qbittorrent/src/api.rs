//! Session-aware transport for the qBittorrent Web API v2.

use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use seedwarden_torrent_core::ControlVerb;

use crate::error::{QbitError, QbitResult};
use crate::models::{FileInfo, TorrentInfo, TorrentProperties, TrackerInfo};

const API_PREFIX: &str = "api/v2";
const LOGIN_OK: &str = "Ok.";

/// Thin HTTP wrapper holding the `SID` session cookie.
#[derive(Debug)]
pub struct QbitApi {
    http: Client,
    base: String,
    sid: RwLock<Option<String>>,
}

impl QbitApi {
    /// Build a transport for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::InvalidUrl`] for an unparseable URL and
    /// [`QbitError::Build`] when the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> QbitResult<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        Url::parse(trimmed).map_err(|source| QbitError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| QbitError::Build { source })?;
        Ok(Self {
            http,
            base: format!("{trimmed}/{API_PREFIX}"),
            sid: RwLock::new(None),
        })
    }

    /// Normalised API root including the `/api/v2` prefix.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base)
    }

    async fn authorised(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.sid.read().await.as_deref() {
            Some(sid) => builder.header(COOKIE, format!("SID={sid}")),
            None => builder,
        }
    }

    async fn send(&self, endpoint: &'static str, builder: RequestBuilder) -> QbitResult<Response> {
        debug!(endpoint, "qBittorrent request");
        let response = self
            .authorised(builder)
            .await
            .send()
            .await
            .map_err(|source| QbitError::Request { endpoint, source })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(QbitError::Status {
            endpoint,
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, &str)],
    ) -> QbitResult<T> {
        let builder = self.http.get(self.url(endpoint)).query(query);
        self.send(endpoint, builder)
            .await?
            .json::<T>()
            .await
            .map_err(|source| QbitError::Decode { endpoint, source })
    }

    async fn post_form(&self, endpoint: &'static str, form: &[(&str, &str)]) -> QbitResult<()> {
        let builder = self.http.post(self.url(endpoint)).form(form);
        self.send(endpoint, builder).await.map(drop)
    }

    /// Authenticate and remember the session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::Auth`] when the credentials are refused.
    pub async fn login(&self, username: &str, password: &str) -> QbitResult<()> {
        const ENDPOINT: &str = "auth/login";
        let builder = self
            .http
            .post(self.url(ENDPOINT))
            .form(&[("username", username), ("password", password)]);
        let response = self.send(ENDPOINT, builder).await?;

        let sid = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|cookie| {
                cookie
                    .split(';')
                    .next()
                    .and_then(|pair| pair.trim().strip_prefix("SID="))
                    .map(str::to_string)
            });

        let body = response
            .text()
            .await
            .map_err(|source| QbitError::Request {
                endpoint: ENDPOINT,
                source,
            })?;
        if body.trim() != LOGIN_OK {
            return Err(QbitError::Auth { body });
        }

        if let Some(sid) = sid {
            *self.sid.write().await = Some(sid);
            debug!("qBittorrent session established");
        }
        Ok(())
    }

    /// Currently deployed Web API version, for example `2.11.2`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request fails.
    pub async fn api_version(&self) -> QbitResult<String> {
        const ENDPOINT: &str = "app/webapiVersion";
        let builder = self.http.get(self.url(ENDPOINT));
        let body = self
            .send(ENDPOINT, builder)
            .await?
            .text()
            .await
            .map_err(|source| QbitError::Request {
                endpoint: ENDPOINT,
                source,
            })?;
        Ok(body.trim().to_string())
    }

    /// Every torrent known to the backend.
    ///
    /// # Errors
    ///
    /// Returns a transport or decode error.
    pub async fn torrents_info(&self) -> QbitResult<Vec<TorrentInfo>> {
        self.get_json("torrents/info", &[]).await
    }

    /// Generic properties of one torrent.
    ///
    /// # Errors
    ///
    /// Returns a transport or decode error.
    pub async fn properties(&self, hash: &str) -> QbitResult<TorrentProperties> {
        self.get_json("torrents/properties", &[("hash", hash)]).await
    }

    /// Trackers of one torrent, pseudo-trackers included.
    ///
    /// # Errors
    ///
    /// Returns a transport or decode error.
    pub async fn trackers(&self, hash: &str) -> QbitResult<Vec<TrackerInfo>> {
        self.get_json("torrents/trackers", &[("hash", hash)]).await
    }

    /// Content files of one torrent.
    ///
    /// # Errors
    ///
    /// Returns a transport or decode error.
    pub async fn files(&self, hash: &str) -> QbitResult<Vec<FileInfo>> {
        self.get_json("torrents/files", &[("hash", hash)]).await
    }

    /// Issue a pause/resume/stop/start verb.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request fails.
    pub async fn control(&self, verb: ControlVerb, hash: &str) -> QbitResult<()> {
        let endpoint = match verb {
            ControlVerb::Pause => "torrents/pause",
            ControlVerb::Resume => "torrents/resume",
            ControlVerb::Stop => "torrents/stop",
            ControlVerb::Start => "torrents/start",
        };
        self.post_form(endpoint, &[("hashes", hash)]).await
    }

    /// Ask trackers to be contacted again.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request fails.
    pub async fn reannounce(&self, hash: &str) -> QbitResult<()> {
        self.post_form("torrents/reannounce", &[("hashes", hash)])
            .await
    }

    /// Remove a torrent, optionally deleting its files.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the request fails.
    pub async fn delete(&self, hash: &str, delete_files: bool) -> QbitResult<()> {
        let delete_files = if delete_files { "true" } else { "false" };
        self.post_form(
            "torrents/delete",
            &[("hashes", hash), ("deleteFiles", delete_files)],
        )
        .await
    }

    /// Assign a category.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::CategoryRejected`] when qBittorrent answers `409`.
    pub async fn set_category(&self, hash: &str, category: &str) -> QbitResult<()> {
        match self
            .post_form("torrents/setCategory", &[("hashes", hash), ("category", category)])
            .await
        {
            Err(QbitError::Status { status, .. }) if status == StatusCode::CONFLICT.as_u16() => {
                Err(QbitError::CategoryRejected {
                    category: category.to_string(),
                })
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn api(server: &MockServer) -> QbitApi {
        QbitApi::new(&format!("{}/", server.base_url()), Duration::from_secs(5))
            .expect("api should build")
    }

    #[test]
    fn base_url_is_normalised() {
        let api = QbitApi::new("http://localhost:8080///", Duration::from_secs(1))
            .expect("api should build");
        assert_eq!(api.base(), "http://localhost:8080/api/v2");
        assert!(matches!(
            QbitApi::new("not a url", Duration::from_secs(1)),
            Err(QbitError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn login_stores_session_cookie() {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/auth/login")
                .body("username=admin&password=secret");
            then.status(200)
                .header("set-cookie", "SID=session123; HttpOnly; path=/")
                .body("Ok.");
        });
        let version = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/app/webapiVersion")
                .header("cookie", "SID=session123");
            then.status(200).body("2.11.2\n");
        });

        let api = api(&server);
        api.login("admin", "secret").await.expect("login");
        assert_eq!(api.api_version().await.expect("version"), "2.11.2");
        login.assert();
        version.assert();
    }

    #[tokio::test]
    async fn login_failure_body_is_auth_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });

        let err = api(&server)
            .login("admin", "wrong")
            .await
            .expect_err("login should fail");
        assert!(matches!(err, QbitError::Auth { body } if body == "Fails."));
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_endpoint() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/properties")
                .query_param("hash", "abc");
            then.status(404).body("Not Found");
        });

        let err = api(&server)
            .properties("abc")
            .await
            .expect_err("missing torrent");
        assert!(matches!(
            err,
            QbitError::Status { endpoint: "torrents/properties", status: 404, .. }
        ));
    }

    #[tokio::test]
    async fn torrent_list_decodes() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200).json_body(json!([
                {"hash": "aaa", "name": "A", "size": 10, "state": "uploading", "category": "tv"}
            ]));
        });

        let list = api(&server).torrents_info().await.expect("info");
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].category, "tv");
    }

    #[tokio::test]
    async fn conflict_on_set_category_is_rejection() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/setCategory")
                .body("hashes=aaa&category=missing");
            then.status(409).body("Incorrect category name");
        });

        let err = api(&server)
            .set_category("aaa", "missing")
            .await
            .expect_err("unknown category");
        assert!(matches!(err, QbitError::CategoryRejected { category } if category == "missing"));
    }
}
