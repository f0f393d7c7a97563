//! Async HTTP client for the university timetable API.
//!
//! Implements [`Fetcher`]: one fetch is a login (form-encoded credential
//! exchange for a bearer token) followed by the timetable request. The second
//! call is never made if the first fails.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use timetable_core::{fetch::Fetcher, raw::RawPayload};
use tracing::debug;

const LOGIN_PATH: &str = "/api/auth/login";
const SCHEDULE_PATH: &str = "/api/sch/w-locdstkbtuanusertheohocky";

/// Connection settings for the upstream API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
  pub base_url:   String,
  pub username:   String,
  pub password:   String,
  /// Semester code, e.g. `20241`.
  pub semester:   u32,
  pub page_limit: u32,
}

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("{step} request failed: {source}")]
  Http {
    step:   &'static str,
    #[source]
    source: reqwest::Error,
  },

  #[error("{step} returned {status}")]
  Status {
    step:   &'static str,
    status: StatusCode,
  },

  #[error("login response carried no access token")]
  MissingToken,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: Option<String>,
}

/// Async HTTP client for the timetable API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct UpstreamClient {
  client: Client,
  config: UpstreamConfig,
}

impl UpstreamClient {
  pub fn new(config: UpstreamConfig) -> Result<Self, ClientError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .map_err(|source| ClientError::Http { step: "client setup", source })?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// `POST /api/auth/login` → bearer token.
  async fn login(&self) -> Result<String, ClientError> {
    let step = "login";
    let resp = self
      .client
      .post(self.url(LOGIN_PATH))
      .form(&[
        ("username", self.config.username.as_str()),
        ("password", self.config.password.as_str()),
        ("grant_type", "password"),
      ])
      .send()
      .await
      .map_err(|source| ClientError::Http { step, source })?;

    if !resp.status().is_success() {
      return Err(ClientError::Status { step, status: resp.status() });
    }
    let token: TokenResponse = resp
      .json()
      .await
      .map_err(|source| ClientError::Http { step, source })?;
    token
      .access_token
      .filter(|t| !t.is_empty())
      .ok_or(ClientError::MissingToken)
  }

  /// `POST /api/sch/w-locdstkbtuanusertheohocky` with the bearer token.
  async fn request_schedule(&self, token: &str) -> Result<RawPayload, ClientError> {
    let step = "timetable";
    let body = json!({
      "filter": {
        "hoc_ky":     self.config.semester,
        "ten_hoc_ky": "",
      },
      "additional": {
        "paging":   { "limit": self.config.page_limit, "page": 1 },
        "ordering": [{ "name": null, "order_type": null }],
      },
    });

    let resp = self
      .client
      .post(self.url(SCHEDULE_PATH))
      .bearer_auth(token)
      .json(&body)
      .send()
      .await
      .map_err(|source| ClientError::Http { step, source })?;

    if !resp.status().is_success() {
      return Err(ClientError::Status { step, status: resp.status() });
    }
    let value: serde_json::Value = resp
      .json()
      .await
      .map_err(|source| ClientError::Http { step, source })?;
    Ok(RawPayload::new(value))
  }
}

impl Fetcher for UpstreamClient {
  type Error = ClientError;

  async fn fetch(&self) -> Result<RawPayload, ClientError> {
    let token = self.login().await?;
    debug!("login succeeded");
    self.request_schedule(&token).await
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashMap,
    sync::{
      Arc,
      atomic::{AtomicUsize, Ordering},
    },
  };

  use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    routing::post,
  };
  use serde_json::Value;

  use super::*;

  #[derive(Clone, Default)]
  struct Upstream {
    accept_login:  bool,
    login_hits:    Arc<AtomicUsize>,
    schedule_hits: Arc<AtomicUsize>,
  }

  async fn login(
    State(up): State<Upstream>,
    Form(form): Form<HashMap<String, String>>,
  ) -> Result<Json<Value>, StatusCode> {
    up.login_hits.fetch_add(1, Ordering::SeqCst);
    let ok = up.accept_login
      && form.get("username").map(String::as_str) == Some("student")
      && form.get("password").map(String::as_str) == Some("secret")
      && form.get("grant_type").map(String::as_str) == Some("password");
    if ok {
      Ok(Json(json!({ "access_token": "tok-123", "token_type": "bearer" })))
    } else {
      Err(StatusCode::UNAUTHORIZED)
    }
  }

  async fn schedule(
    State(up): State<Upstream>,
    headers: HeaderMap,
    Json(body): Json<Value>,
  ) -> Result<Json<Value>, StatusCode> {
    up.schedule_hits.fetch_add(1, Ordering::SeqCst);
    let auth = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    if auth != Some("Bearer tok-123") {
      return Err(StatusCode::UNAUTHORIZED);
    }
    if body["filter"]["hoc_ky"] != json!(20241) || body["additional"]["paging"]["limit"] != json!(100) {
      return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({
      "result": true,
      "data": {
        "ds_tiet_trong_ngay": [{ "tiet": 1, "gio_bat_dau": "07:00", "gio_ket_thuc": "07:45" }],
        "ds_tuan_tkb": [{
          "tuan_hoc_ky": 1,
          "ds_thoi_khoa_bieu": [{
            "ten_mon": "Math", "ma_mon": "MA101", "thu_kieu_so": 2,
            "tiet_bat_dau": 1, "so_tiet": 2, "ngay_hoc": "2024-09-02",
          }],
        }],
      }
    })))
  }

  async fn serve(up: Upstream) -> String {
    let router = Router::new()
      .route(LOGIN_PATH, post(login))
      .route(SCHEDULE_PATH, post(schedule))
      .with_state(up);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/")
  }

  fn client(base_url: String) -> UpstreamClient {
    UpstreamClient::new(UpstreamConfig {
      base_url,
      username: "student".into(),
      password: "secret".into(),
      semester: 20241,
      page_limit: 100,
    })
    .unwrap()
  }

  #[tokio::test]
  async fn fetch_logs_in_then_requests_the_timetable() {
    let up = Upstream { accept_login: true, ..Default::default() };
    let base = serve(up.clone()).await;

    let raw = client(base).fetch().await.unwrap();

    assert_eq!(up.login_hits.load(Ordering::SeqCst), 1);
    assert_eq!(up.schedule_hits.load(Ordering::SeqCst), 1);
    assert_eq!(raw.as_value()["result"], json!(true));
    let schedule = timetable_core::normalize::normalize(&raw).unwrap();
    assert_eq!(schedule.weekly_schedules.len(), 1);
  }

  #[tokio::test]
  async fn failed_login_skips_the_timetable_request() {
    let up = Upstream { accept_login: false, ..Default::default() };
    let base = serve(up.clone()).await;

    let err = client(base).fetch().await.unwrap_err();

    assert!(matches!(
      err,
      ClientError::Status { step: "login", status } if status == StatusCode::UNAUTHORIZED
    ));
    assert_eq!(up.schedule_hits.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn unreachable_upstream_is_an_http_error() {
    // Bind and drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(format!("http://{addr}")).fetch().await.unwrap_err();
    assert!(matches!(err, ClientError::Http { step: "login", .. }));
  }
}
