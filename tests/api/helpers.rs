use axum::Router;
use digiurban::app::{create_app, AppState};
use digiurban::auth::TokenVerifier;
use digiurban::client::{ApiClient, ClientError};
use digiurban::config::{Environment, Settings};
use digiurban::db::RecordStore;
use digiurban::logging;
use serde_json::{json, Value};
use std::sync::Once;
use tempfile::TempDir;

const JWT_SECRET: &str = "test-secret";
const JWT_ISSUER: &str = "digiurban";
const JWT_AUDIENCE: &str = "authenticated";

static TRACING: Once = Once::new();

pub struct TestApp {
    pub address: String,
    pub client: ApiClient,
    pub verifier: TokenVerifier,
    _upload_dir: TempDir,
}

impl TestApp {
    /// A client without credentials
    pub fn anonymous(&self) -> ApiClient {
        ApiClient::new(&self.address, 5).unwrap()
    }

    pub fn token_for(&self, user_id: &str) -> String {
        self.verifier
            .issue_token(user_id, Some("manager"), chrono::Duration::hours(1))
            .unwrap()
    }

    /// Raw HTTP access for requests the typed client does not make
    pub fn http(&self) -> reqwest::Client {
        reqwest::Client::new()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Start the API on an ephemeral port over the in-process record store.
///
/// Set TEST_LOG=1 to see the server's logs.
pub async fn spawn_app() -> TestApp {
    TRACING.call_once(|| {
        if std::env::var("TEST_LOG").is_ok() {
            logging::init_cli_logging(true);
        }
    });

    let upload_dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        env: Environment::Dev,
        server_addr: "127.0.0.1:0".to_string(),
        database_url: None,
        database_max_connections: 1,
        cors_allow_origins: vec!["http://localhost:3000".to_string()],
        auth_jwt_secret: JWT_SECRET.to_string(),
        auth_jwt_issuer: JWT_ISSUER.to_string(),
        auth_jwt_audience: JWT_AUDIENCE.to_string(),
        upload_dir: upload_dir.path().to_path_buf(),
        max_upload_bytes: 1024 * 1024,
    };

    let state = AppState::new(RecordStore::memory(), settings);
    let address = serve(create_app(state)).await;

    let verifier = TokenVerifier::new(JWT_SECRET, JWT_ISSUER, JWT_AUDIENCE);
    let token = verifier
        .issue_token("user-1", Some("manager"), chrono::Duration::hours(1))
        .unwrap();
    let client = ApiClient::new(&address, 5).unwrap().with_token(token);

    TestApp {
        address,
        client,
        verifier,
        _upload_dir: upload_dir,
    }
}

/// Serve `router` on an ephemeral port and return its base URL
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

pub fn assert_status<T: std::fmt::Debug>(result: Result<T, ClientError>, expected: u16) {
    match result {
        Err(e) => assert_eq!(e.status(), Some(expected), "unexpected error: {}", e),
        Ok(value) => panic!("expected status {}, got {:?}", expected, value),
    }
}

// Request bodies

pub fn artist_group(name: &str) -> Value {
    json!({
        "name": name,
        "category": "MUSIC",
        "representative": "Maria Souza",
    })
}

/// A stored artist group as the server would return it
pub fn artist_group_record(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "category": "MUSIC",
        "status": "ACTIVE",
        "representative": "Maria Souza",
        "created_at": "2024-01-10T12:00:00Z",
        "updated_at": "2024-01-10T12:00:00Z",
    })
}

pub fn cultural_event(title: &str, starts_at: &str, ends_at: &str) -> Value {
    json!({
        "title": title,
        "event_type": "SHOW",
        "venue": { "name": "Teatro Municipal" },
        "schedule": { "starts_at": starts_at, "ends_at": ends_at },
        "capacity": 300,
        "organizer": { "name": "Secretaria de Cultura" },
    })
}

pub fn cultural_space(name: &str) -> Value {
    json!({
        "name": name,
        "space_type": "THEATER",
        "address": { "street": "Rua das Flores", "number": "100", "city": "Palmas" },
        "capacity": 120,
    })
}

pub fn construction_license(protocol: &str) -> Value {
    json!({
        "protocol_number": protocol,
        "license_type": "RENOVATION",
        "applicant": { "name": "Joao Lima", "document_number": "123.456.789-00" },
        "property": {
            "address": { "street": "Av. Central", "number": "42" },
            "registration": "IM-0042",
            "lot_area_m2": "360",
            "built_area_m2": "120",
        },
        "technical_lead": { "name": "Ana Costa", "registration": "CREA-1234" },
        "fees": { "amount": "250.00" },
    })
}

pub fn decode<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).unwrap()
}
