use crate::Result;
use crate::hub::HttpGetter;
use async_trait::async_trait;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use url::Url;

const LOG_TARGET: &str = "        http";

/// [`HttpGetter`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestGetter {
    client: reqwest::Client,
}

impl ReqwestGetter {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .into_app_err("unable to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGetter for ReqwestGetter {
    async fn get(&self, url: &Url) -> Result<reqwest::Response> {
        log::debug!(target: LOG_TARGET, "GET {url}");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .into_app_err_with(|| format!("could not request '{url}'"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("unexpected status {status} fetching '{url}'");
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot open sockets")]
    async fn successful_responses_are_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.yaml"))
            .and(header("user-agent", "hubtrack-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("apiVersion: v1\n"))
            .mount(&server)
            .await;

        let getter = ReqwestGetter::new("hubtrack-test", Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/index.yaml", server.uri())).unwrap();
        let body = getter.get(&url).await.unwrap().text().await.unwrap();
        assert_eq!(body, "apiVersion: v1\n");
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot open sockets")]
    async fn error_statuses_become_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let getter = ReqwestGetter::new("hubtrack-test", Duration::from_secs(5)).unwrap();
        let url = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        let err = getter.get(&url).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
