//! Contentful HTTP binding
//!
//! Entries, counts and locales come from the Delivery API. The schema comes
//! from the Management API when a management token is configured, otherwise
//! from the Delivery API (which omits nothing the audit needs).
//!
//! Uses raw HTTP requests (no SDK dependency).

pub mod wire;

use super::{ContentRepository, RepositoryError, Result};
use async_trait::async_trait;
use refaudit_protocol::defaults::SCHEMA_PAGE_LIMIT;
use refaudit_protocol::{
    ContentTypeId, ContentTypeRecord, Entry, EntryPage, EntryPageQuery, LinkResolutionError,
    LocaleRecord, RepositorySettings,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;
use wire::{Collection, ContentTypeItem, EntryItem, LocaleItem};

/// Contentful repository reached over HTTPS
pub struct ContentfulRepository {
    settings: RepositorySettings,
    http_client: reqwest::Client,
}

impl ContentfulRepository {
    /// Create a repository after validating the settings
    pub fn new(settings: RepositorySettings) -> Result<Self> {
        settings.validate()?;
        let http_client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("refaudit/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            settings,
            http_client,
        })
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    fn delivery_url(&self, resource: &str) -> Result<Url> {
        scoped_url(&self.settings.delivery_host, &self.settings, resource)
    }

    /// Schema endpoint and the token that goes with it
    fn schema_endpoint(&self) -> Result<(Url, &str)> {
        match self.settings.management_token.as_deref() {
            Some(token) => Ok((
                scoped_url(&self.settings.management_host, &self.settings, "content_types")?,
                token,
            )),
            None => Ok((
                self.delivery_url("content_types")?,
                self.settings.delivery_token.as_str(),
            )),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        token: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(operation, url = %url, ?query, "Repository request");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RepositoryError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| RepositoryError::Decode(format!("{}: {}", operation, e)))
    }
}

/// Join `spaces/{space}/environments/{env}/{resource}` onto a host
fn scoped_url(host: &Url, settings: &RepositorySettings, resource: &str) -> Result<Url> {
    Ok(host.join(&settings.environment_path())?.join(resource)?)
}

#[async_trait]
impl ContentRepository for ContentfulRepository {
    fn name(&self) -> &str {
        "contentful"
    }

    async fn list_content_types(&self) -> Result<Vec<ContentTypeRecord>> {
        let (url, token) = self.schema_endpoint()?;
        let mut content_types = Vec::new();
        let mut skip = 0u64;

        loop {
            let query = [
                ("limit", SCHEMA_PAGE_LIMIT.to_string()),
                ("skip", skip.to_string()),
            ];
            let page: Collection<ContentTypeItem> = self
                .get_json("list content types", url.clone(), token, &query)
                .await?;

            let received = page.items.len() as u64;
            content_types.extend(page.items.into_iter().map(ContentTypeRecord::from));
            skip += received;

            let total = page.total.unwrap_or(skip);
            if received == 0 || skip >= total {
                break;
            }
        }

        Ok(content_types)
    }

    async fn count_entries(&self, content_type: &ContentTypeId) -> Result<u64> {
        let query = [
            ("content_type", content_type.to_string()),
            ("limit", "1".to_string()),
            ("select", "sys.id".to_string()),
        ];
        let page: Collection<Value> = self
            .get_json(
                "count entries",
                self.delivery_url("entries")?,
                &self.settings.delivery_token,
                &query,
            )
            .await?;

        page.total
            .ok_or_else(|| RepositoryError::Decode("count entries: missing total".to_string()))
    }

    async fn fetch_entry_page(&self, query: &EntryPageQuery) -> Result<EntryPage> {
        let params = [
            ("content_type", query.content_type.to_string()),
            ("skip", query.skip.to_string()),
            ("limit", query.limit.to_string()),
            ("locale", query.locale.to_string()),
        ];
        let page: Collection<EntryItem> = self
            .get_json(
                "fetch entry page",
                self.delivery_url("entries")?,
                &self.settings.delivery_token,
                &params,
            )
            .await?;

        Ok(EntryPage {
            items: page.items.into_iter().map(Entry::from).collect(),
            errors: page
                .errors
                .into_iter()
                .map(LinkResolutionError::from)
                .collect(),
            total: page.total,
        })
    }

    async fn list_locales(&self) -> Result<Vec<LocaleRecord>> {
        let page: Collection<LocaleItem> = self
            .get_json(
                "list locales",
                self.delivery_url("locales")?,
                &self.settings.delivery_token,
                &[],
            )
            .await?;
        Ok(page.items.into_iter().map(LocaleRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refaudit_protocol::config::parse_host;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    type Handler = fn(&str) -> (u16, Value);

    /// Local HTTP endpoint answering one request per connection
    struct StubApi {
        host: Url,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl StubApi {
        async fn start(handler: Handler) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            tokio::spawn(async move {
                while let Ok((mut stream, _)) = listener.accept().await {
                    let mut head = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => head.extend_from_slice(&buf[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head).to_string();
                    let target = head.split_whitespace().nth(1).unwrap_or_default().to_string();
                    let authorized = head
                        .to_ascii_lowercase()
                        .contains("authorization: bearer cda-token");

                    let (status, body) = handler(&target);
                    seen.lock().unwrap().push(if authorized {
                        target
                    } else {
                        format!("unauthorized {}", target)
                    });
                    let body = body.to_string();
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self {
                host: parse_host("delivery_host", &format!("http://{}", addr)).unwrap(),
                requests,
            }
        }

        fn repository(&self) -> ContentfulRepository {
            let mut settings = settings();
            settings.delivery_host = self.host.clone();
            ContentfulRepository::new(settings).unwrap()
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    const BASE: &str = "/spaces/space1/environments/staging/";

    fn content_api(target: &str) -> (u16, Value) {
        let path = target.strip_prefix(BASE).unwrap_or(target);
        match path {
            "content_types?limit=1000&skip=0" => (
                200,
                json!({
                    "total": 2, "skip": 0, "limit": 1000,
                    "items": [{
                        "sys": { "id": "article" },
                        "name": "Article",
                        "displayField": "title",
                        "fields": [
                            { "id": "title", "type": "Symbol" },
                            { "id": "author", "type": "Link" }
                        ]
                    }]
                }),
            ),
            "content_types?limit=1000&skip=1" => (
                200,
                json!({
                    "total": 2, "skip": 1, "limit": 1000,
                    "items": [{ "sys": { "id": "page" }, "name": "Page", "fields": [] }]
                }),
            ),
            "entries?content_type=article&limit=1&select=sys.id" => (
                200,
                json!({ "total": 7, "skip": 0, "limit": 1, "items": [{ "sys": { "id": "e1" } }] }),
            ),
            "entries?content_type=article&skip=0&limit=2&locale=de-DE" => (
                200,
                json!({
                    "total": 7, "skip": 0, "limit": 2,
                    "items": [
                        { "sys": { "id": "e1" }, "fields": { "author": { "sys": { "id": "x1" } } } }
                    ],
                    "errors": [{
                        "sys": { "id": "notResolvable", "type": "error" },
                        "details": { "type": "Link", "linkType": "Entry", "id": "x1" }
                    }]
                }),
            ),
            "locales" => (
                401,
                json!({ "sys": { "id": "AccessTokenInvalid" }, "message": "bad token" }),
            ),
            _ => (404, json!({ "sys": { "id": "NotFound" } })),
        }
    }

    #[tokio::test]
    async fn content_types_are_paged_until_total() {
        let api = StubApi::start(content_api).await;
        let repo = api.repository();

        let content_types = repo.list_content_types().await.unwrap();
        let ids: Vec<&str> = content_types.iter().map(|ct| ct.id.as_str()).collect();
        assert_eq!(ids, vec!["article", "page"]);
        assert_eq!(
            content_types[0].display_field.as_ref().map(|f| f.as_str()),
            Some("title")
        );
        assert_eq!(
            api.requests(),
            vec![
                format!("{}content_types?limit=1000&skip=0", BASE),
                format!("{}content_types?limit=1000&skip=1", BASE),
            ]
        );
    }

    #[tokio::test]
    async fn count_and_entry_page_send_query_parameters() {
        let api = StubApi::start(content_api).await;
        let repo = api.repository();

        assert_eq!(repo.count_entries(&"article".into()).await.unwrap(), 7);

        let page = repo
            .fetch_entry_page(&EntryPageQuery {
                content_type: "article".into(),
                locale: "de-DE".into(),
                skip: 0,
                limit: 2,
            })
            .await
            .unwrap();
        assert_eq!(page.items[0].id.as_str(), "e1");
        assert_eq!(page.errors, vec![LinkResolutionError::link("x1")]);
        assert_eq!(page.total, Some(7));

        assert_eq!(
            api.requests(),
            vec![
                format!("{}entries?content_type=article&limit=1&select=sys.id", BASE),
                format!("{}entries?content_type=article&skip=0&limit=2&locale=de-DE", BASE),
            ]
        );
    }

    #[tokio::test]
    async fn non_success_status_is_reported_with_body() {
        let api = StubApi::start(content_api).await;
        let repo = api.repository();

        match repo.list_locales().await {
            Err(RepositoryError::Status {
                operation,
                status,
                body,
            }) => {
                assert_eq!(operation, "list locales");
                assert_eq!(status, 401);
                assert!(body.contains("AccessTokenInvalid"));
            }
            other => panic!("expected a status error, got {:?}", other.map(|l| l.len())),
        }
    }

    fn settings() -> RepositorySettings {
        let mut settings = RepositorySettings::new("space1", "cda-token").unwrap();
        settings.environment = "staging".to_string();
        settings
    }

    #[test]
    fn delivery_urls_are_environment_scoped() {
        let repo = ContentfulRepository::new(settings()).unwrap();
        assert_eq!(
            repo.delivery_url("entries").unwrap().as_str(),
            "https://cdn.contentful.com/spaces/space1/environments/staging/entries"
        );
    }

    #[test]
    fn schema_uses_management_api_when_token_present() {
        let mut settings = settings();
        settings.management_host = parse_host("management_host", "http://localhost:9000").unwrap();
        settings.management_token = Some("cma-token".to_string());
        let repo = ContentfulRepository::new(settings).unwrap();

        let (url, token) = repo.schema_endpoint().unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9000/spaces/space1/environments/staging/content_types"
        );
        assert_eq!(token, "cma-token");
    }

    #[test]
    fn schema_falls_back_to_delivery_api() {
        let repo = ContentfulRepository::new(settings()).unwrap();
        let (url, token) = repo.schema_endpoint().unwrap();
        assert!(url.as_str().starts_with("https://cdn.contentful.com/"));
        assert_eq!(token, "cda-token");
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = RepositorySettings::new("", "token").unwrap();
        assert!(matches!(
            ContentfulRepository::new(settings),
            Err(RepositoryError::Config(_))
        ));
    }
}
