// tests/common/mod.rs
// Mock token/team/service/backend upstreams and a gateway wired against them.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::{Value, json};
use tower::ServiceExt;
use url::Url;

use bearer_gate::app::build_router;
use bearer_gate::config::{AuthConfig, TeamEndpoints};
use bearer_gate::services::audit::AuditLog;
use bearer_gate::services::auth::build_authorizer;
use bearer_gate::services::auth::filter::{CheckKind, FilterConfig};
use bearer_gate::services::body_tee::TeeLimit;
use bearer_gate::services::upstream;
use bearer_gate::state::{AppState, AuditSettings};

pub const VALID_TOKEN: &str = "test-token";
pub const OTHER_TOKEN: &str = "other-token";
pub const GARBAGE_TOKEN: &str = "garbage-token";

#[derive(Default)]
pub struct Hits {
    pub auth: AtomicUsize,
    pub team: Mutex<Vec<String>>,
    pub service: AtomicUsize,
    pub backend: AtomicUsize,
    pub backend_auth: Mutex<Option<String>>,
    pub backend_body: Mutex<Vec<u8>>,
}

impl Hits {
    pub fn team_calls(&self) -> Vec<String> {
        self.team.lock().unwrap().clone()
    }

    pub fn backend_calls(&self) -> usize {
        self.backend.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct Directory {
    pub teams: HashMap<String, Vec<String>>,
    pub owners: HashMap<String, String>,
    pub team_status: Option<StatusCode>,
}

impl Directory {
    pub fn team(mut self, uid: &str, teams: &[&str]) -> Self {
        self.teams
            .insert(uid.to_string(), teams.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn owner(mut self, uid: &str, owner: &str) -> Self {
        self.owners.insert(uid.to_string(), owner.to_string());
        self
    }

    pub fn failing_teams(mut self, status: StatusCode) -> Self {
        self.team_status = Some(status);
        self
    }
}

struct Mock {
    directory: Directory,
    hits: Arc<Hits>,
}

pub struct Upstreams {
    pub base: String,
    pub hits: Arc<Hits>,
}

impl Upstreams {
    pub fn auth_url(&self) -> String {
        format!("{}/tokeninfo", self.base)
    }

    pub fn team_url(&self) -> String {
        format!("{}/teams?member=", self.base)
    }

    pub fn service_url(&self) -> String {
        format!("{}/services/", self.base)
    }

    pub fn backend_url(&self) -> Url {
        Url::parse(&self.base).unwrap()
    }
}

pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// One mock server playing token service, team API, service registry and backend.
pub async fn spawn_upstreams(directory: Directory) -> Upstreams {
    let hits = Arc::new(Hits::default());
    let mock = Arc::new(Mock {
        directory,
        hits: hits.clone(),
    });

    let app = Router::new()
        .route("/tokeninfo", get(tokeninfo))
        .route("/teams", get(teams))
        .route("/services/{uid}", get(service))
        .route("/echo", any(echo))
        .route("/slow", any(slow))
        .fallback(backend)
        .with_state(mock);

    Upstreams {
        base: spawn(app).await,
        hits,
    }
}

async fn tokeninfo(State(mock): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    mock.hits.auth.fetch_add(1, Ordering::SeqCst);

    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some(VALID_TOKEN) => Json(json!({
            "uid": "jdoe",
            "realm": "/employees",
            "scope": ["read-zmon"],
            "SomeOtherStuff": "noise"
        }))
        .into_response(),
        Some(OTHER_TOKEN) => Json(json!({
            "uid": "alice",
            "realm": "/services",
            "scope": []
        }))
        .into_response(),
        Some(GARBAGE_TOKEN) => (StatusCode::OK, "not json").into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn teams(
    State(mock): State<Arc<Mock>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let uid = query.get("member").cloned().unwrap_or_default();
    mock.hits.team.lock().unwrap().push(uid.clone());

    if let Some(status) = mock.directory.team_status {
        return status.into_response();
    }

    let docs: Vec<Value> = mock
        .directory
        .teams
        .get(&uid)
        .map(|ts| ts.iter().map(|t| json!({"id": t, "name": "noise"})).collect())
        .unwrap_or_default();
    Json(docs).into_response()
}

async fn service(State(mock): State<Arc<Mock>>, Path(uid): Path<String>) -> Response {
    mock.hits.service.fetch_add(1, Ordering::SeqCst);

    match mock.directory.owners.get(&uid) {
        Some(owner) => Json(json!({"owner": owner, "id": uid})).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn backend(State(mock): State<Arc<Mock>>, headers: HeaderMap, body: Bytes) -> Response {
    mock.hits.backend.fetch_add(1, Ordering::SeqCst);
    *mock.hits.backend_auth.lock().unwrap() = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *mock.hits.backend_body.lock().unwrap() = body.to_vec();

    (StatusCode::OK, "backend ok").into_response()
}

/// Streams the request body straight back, answering before it has been read.
async fn echo(req: Request<Body>) -> Response {
    Response::new(req.into_body())
}

pub const SLOW_BACKEND_DELAY: Duration = Duration::from_secs(2);

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_BACKEND_DELAY).await;
    "slow ok"
}

/// Audit sink the test can read back.
#[derive(Clone, Default)]
pub struct AuditBuf(Arc<Mutex<Vec<u8>>>);

impl AuditBuf {
    pub fn records(&self) -> Vec<Value> {
        let raw = self.0.lock().unwrap().clone();
        String::from_utf8(raw)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    pub fn last(&self) -> Value {
        self.records().pop().expect("no audit record written")
    }
}

impl Write for AuditBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct GatewayBuilder<'a> {
    upstreams: &'a Upstreams,
    filter: Option<FilterConfig>,
    team_cache_ttl: Duration,
    max_body: TeeLimit,
    drain_body: bool,
    request_timeout: Duration,
    basic_auth: Option<(&'a str, &'a str)>,
}

pub struct Gateway {
    pub app: Router,
    pub audit: AuditBuf,
}

pub fn gateway(upstreams: &Upstreams) -> GatewayBuilder<'_> {
    GatewayBuilder {
        upstreams,
        filter: None,
        team_cache_ttl: Duration::from_secs(1),
        max_body: TeeLimit::Disabled,
        drain_body: true,
        request_timeout: Duration::from_secs(30),
        basic_auth: None,
    }
}

impl<'a> GatewayBuilder<'a> {
    pub fn filter(mut self, check: CheckKind, args: &[&str]) -> Self {
        self.filter = Some(FilterConfig::parse(check, args).unwrap());
        self
    }

    pub fn team_cache_ttl(mut self, ttl: Duration) -> Self {
        self.team_cache_ttl = ttl;
        self
    }

    pub fn max_body(mut self, max: i64) -> Self {
        self.max_body = TeeLimit::from_signed(max);
        self
    }

    pub fn drain_body(mut self, drain: bool) -> Self {
        self.drain_body = drain;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn basic_auth(mut self, user: &'a str, password: &'a str) -> Self {
        self.basic_auth = Some((user, password));
        self
    }

    pub fn build(self) -> Gateway {
        let up = self.upstreams;
        let audit = AuditBuf::default();

        let mut state = AppState::new(up.backend_url(), reqwest::Client::new()).with_audit(
            AuditSettings {
                log: Arc::new(AuditLog::new(Box::new(audit.clone()))),
                max_body: self.max_body,
                drain_body: self.drain_body,
            },
        );

        if let Some(filter) = self.filter {
            let teams = (filter.check() == CheckKind::Team).then(|| TeamEndpoints {
                team_url: up.team_url(),
                service_url: up.service_url(),
            });
            let config = AuthConfig {
                filter,
                token_validation_url: up.auth_url(),
                teams,
                team_cache_ttl: self.team_cache_ttl,
            };
            let http = upstream::build_client(Duration::from_secs(5)).unwrap();
            state = state.with_auth(build_authorizer(&config, http).unwrap());
        }

        if let Some((user, password)) = self.basic_auth {
            let value = bearer_gate::middleware::basic_auth::header_value(user, password).unwrap();
            state = state.with_basic_auth(value);
        }

        Gateway {
            app: build_router(state, self.request_timeout),
            audit,
        }
    }
}

impl Gateway {
    pub async fn send(&self, token: Option<&str>, body: &str) -> StatusCode {
        self.send_raw(token.map(|t| format!("Bearer {t}")), body)
            .await
            .status()
    }

    pub async fn send_raw(&self, authorization: Option<String>, body: &str) -> Response {
        let mut req = Request::builder().method("POST").uri("/resource?x=1");
        if let Some(auth) = authorization {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let req = req.body(Body::from(body.to_string())).unwrap();

        self.app.clone().oneshot(req).await.unwrap()
    }

    /// Unauthenticated `POST uri` with an arbitrary body.
    pub async fn post(&self, uri: &str, body: Body) -> Response {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .body(body)
            .unwrap();

        self.app.clone().oneshot(req).await.unwrap()
    }
}
