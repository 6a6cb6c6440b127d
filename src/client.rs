// Client for the remote directory service. Holds a blocking reqwest client,
// the service base URL and the operator's session (token + claimed role),
// and exposes one method per remote operation. All methods funnel through
// the same post/decode helpers; none of them retries.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::soap::{self, Envelope, Record};

/// The single role value allowed past the menu gate.
pub const PRIVILEGED_ROLE: &str = "ADMIN";

const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Whether a claimed role passes the menu gate. Only the privileged role
/// does; a missing claim never does.
pub fn role_permits(role: Option<&str>) -> bool {
    role == Some(PRIVILEGED_ROLE)
}

/// Operator session. Empty until a successful [`DirectoryClient::authenticate`];
/// never refreshed; cleared only by process exit.
#[derive(Debug, Default, Clone)]
pub struct Session {
    token: Option<String>,
    role: Option<String>,
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

/// A user decoded from a response. Open record: keys are whatever child
/// elements the server sent, normally `id`, `username`, `email`, `role`.
#[derive(Debug, Clone)]
pub struct UserRecord(Record);

impl UserRecord {
    /// Field value, or `"N/A"` when the server omitted the element.
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("N/A")
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }
}

impl From<Record> for UserRecord {
    fn from(record: Record) -> Self {
        UserRecord(record)
    }
}

/// A credential token decoded from a response; normally `id`, `userId`,
/// `createdAt`, `expiresAt`, `revoked`.
#[derive(Debug, Clone)]
pub struct TokenRecord(Record);

impl TokenRecord {
    pub fn get(&self, key: &str) -> &str {
        self.0.get(key).map(String::as_str).unwrap_or("N/A")
    }

    pub fn fields(&self) -> &Record {
        &self.0
    }
}

impl From<Record> for TokenRecord {
    fn from(record: Record) -> Self {
        TokenRecord(record)
    }
}

pub struct DirectoryClient {
    http: Client,
    base_url: String,
    session: Session,
}

impl DirectoryClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(DirectoryClient {
            http,
            base_url,
            session: Session::default(),
        })
    }

    /// Create a client configured from the environment variable
    /// `ACTU_SERVICE_URL`, falling back to `http://localhost:8080`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("ACTU_SERVICE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::new(base_url)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Authenticate the operator. On HTTP 200 the response is parsed for
    /// `token`, `username` and `role`; the session is populated only when
    /// both a username and a role element are present. Any failure leaves
    /// the session untouched.
    pub fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        let envelope = Envelope::request("login")
            .field("username", username)
            .field("password", password)
            .build();
        let body = self.post(envelope)?;
        let token = soap::first_text(&body, "token")?;
        let user = soap::first_text(&body, "username")?;
        let role = soap::first_text(&body, "role")?;
        let (Some(_), Some(role)) = (user, role) else {
            warn!("login response is missing user information");
            bail!("Authentication succeeded but the response is missing user information");
        };
        self.session.token = token;
        self.session.role = Some(role);
        debug!(role = self.session.role.as_deref(), "authenticated");
        Ok(())
    }

    pub fn list_users(&self) -> Result<Vec<UserRecord>> {
        let records = self.fetch_records(Envelope::request("getAllUsers"), "user")?;
        Ok(records.into_iter().map(UserRecord::from).collect())
    }

    pub fn create_user(&self, username: &str, email: &str, password: &str, role: &str) -> Result<()> {
        self.execute(Envelope::request("createUser").group(
            "user",
            &[
                ("username", username),
                ("email", email),
                ("password", password),
                ("role", role),
            ],
        ))
    }

    /// Update a user. The server treats the literal value `unchanged` in any
    /// field as "leave as is"; the interactive layer maps blank input to it.
    pub fn update_user(
        &self,
        id: i64,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> Result<()> {
        self.execute(
            Envelope::request("updateUser")
                .field("id", &id.to_string())
                .group(
                    "user",
                    &[
                        ("username", username),
                        ("email", email),
                        ("password", password),
                        ("role", role),
                    ],
                ),
        )
    }

    pub fn delete_user(&self, id: i64) -> Result<()> {
        self.execute(Envelope::request("deleteUser").field("id", &id.to_string()))
    }

    pub fn list_tokens(&self) -> Result<Vec<TokenRecord>> {
        let records = self.fetch_records(Envelope::request("getAllTokens"), "token")?;
        Ok(records.into_iter().map(TokenRecord::from).collect())
    }

    pub fn generate_token(&self, user_id: i64) -> Result<TokenRecord> {
        let records = self.fetch_records(
            Envelope::request("generateToken").field("userId", &user_id.to_string()),
            "token",
        )?;
        let record = records
            .into_iter()
            .next()
            .context("No token element in the response")?;
        Ok(TokenRecord::from(record))
    }

    pub fn delete_token(&self, id: i64) -> Result<()> {
        self.execute(Envelope::request("deleteToken").field("id", &id.to_string()))
    }

    pub fn list_tokens_by_user(&self, user_id: i64) -> Result<Vec<TokenRecord>> {
        let records = self.fetch_records(
            Envelope::request("getTokensByUser").field("userId", &user_id.to_string()),
            "token",
        )?;
        Ok(records.into_iter().map(TokenRecord::from).collect())
    }

    pub fn reactivate_token(&self, id: i64) -> Result<()> {
        self.execute(Envelope::request("reactivateToken").field("id", &id.to_string()))
    }

    pub fn revoke_token(&self, id: i64) -> Result<()> {
        self.execute(Envelope::request("revokeToken").field("id", &id.to_string()))
    }

    /// Session token, or a local failure when the operator never logged in.
    /// Checked before any network traffic happens.
    fn bearer(&self) -> Result<&str> {
        self.session
            .token
            .as_deref()
            .context("Not authenticated: login is required before this operation")
    }

    /// Attach the bearer token and POST. Token absence short-circuits here,
    /// before any request is built or sent.
    fn post_authenticated(&self, envelope: Envelope) -> Result<String> {
        let token = self.bearer()?;
        self.post(envelope.bearer(token).build())
    }

    /// Operation where only the HTTP status matters.
    fn execute(&self, envelope: Envelope) -> Result<()> {
        self.post_authenticated(envelope).map(|_| ())
    }

    /// Operation returning zero or more elements with the given local tag.
    fn fetch_records(&self, envelope: Envelope, tag: &str) -> Result<Vec<Record>> {
        let body = self.post_authenticated(envelope)?;
        soap::records_with_tag(&body, tag).map_err(|err| {
            warn!(error = %err, "failed to decode response");
            err
        })
    }

    fn post(&self, envelope: String) -> Result<String> {
        let url = format!("{}/ws", self.base_url);
        debug!(%url, "sending request");
        let res = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(envelope)
            .send()
            .context("Failed to reach the directory service")?;
        let status = res.status();
        if status != StatusCode::OK {
            warn!(%status, "directory service returned an error status");
            bail!("Request failed with status {status}");
        }
        res.text().context("Failed to read the response body")
    }
}
