//! Blocking HTTP client for `jarvis-server`.
//!
//! # Responsibility
//! - Mirror the note operations over HTTP with the core crate's types.
//! - Turn non-2xx answers into `ClientError::Status` carrying the server's
//!   `error` message.
//!
//! # Invariants
//! - `get` maps 404 to `Ok(None)`; every other call treats 404 as an error.

use jarvis_core::{Note, NoteDraft, NoteFilterParams, NoteId, NotePatch, NoteType};
use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub enum ClientError {
    Http(reqwest::Error),
    Status { status: u16, message: String },
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http(err) => write!(f, "request failed: {err}"),
            Self::Status { status, message } => write!(f, "server answered {status}: {message}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            Self::Status { .. } => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Http(value)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CreatedBody {
    id: NoteId,
}

#[derive(Debug, Deserialize)]
struct UpdatedBody {
    note: Note,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client bound to one server base URL.
pub struct NoteClient {
    base_url: String,
    http: Client,
}

impl NoteClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a server path starting with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn ping(&self) -> ClientResult<String> {
        let response = self.send("GET", "/ping", self.http.get(self.url("/ping")))?;
        let body: MessageBody = read_json(response)?;
        Ok(body.message)
    }

    /// Creates a note and returns the id the server assigned.
    pub fn create(&self, draft: &NoteDraft) -> ClientResult<NoteId> {
        let request = self.http.post(self.url("/notes")).json(draft);
        let body: CreatedBody = read_json(self.send("POST", "/notes", request)?)?;
        Ok(body.id)
    }

    pub fn get(&self, kind: NoteType, id: NoteId) -> ClientResult<Option<Note>> {
        let path = note_path(kind, id);
        let response = self.send("GET", &path, self.http.get(self.url(&path)))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(read_json(response)?))
    }

    pub fn list_all(&self) -> ClientResult<Vec<Note>> {
        read_json(self.send("GET", "/notes", self.http.get(self.url("/notes")))?)
    }

    pub fn filter(&self, kind: NoteType, params: &NoteFilterParams) -> ClientResult<Vec<Note>> {
        let request = self
            .http
            .get(self.url("/notes/filter"))
            .query(&filter_query(kind, params));
        read_json(self.send("GET", "/notes/filter", request)?)
    }

    /// Sends a partial update and returns the stored record.
    pub fn update(&self, id: NoteId, patch: &NotePatch) -> ClientResult<Note> {
        let path = format!("/notes/{id}");
        let request = self.http.put(self.url(&path)).json(patch);
        let body: UpdatedBody = read_json(self.send("PUT", &path, request)?)?;
        Ok(body.note)
    }

    pub fn delete(&self, kind: NoteType, id: NoteId) -> ClientResult<()> {
        let path = note_path(kind, id);
        expect_success(self.send("DELETE", &path, self.http.delete(self.url(&path)))?)?;
        Ok(())
    }

    /// Clears one type, or every type when `kind` is `None`.
    pub fn delete_all(&self, kind: Option<NoteType>) -> ClientResult<()> {
        let mut request = self.http.delete(self.url("/notes"));
        if let Some(kind) = kind {
            request = request.query(&[("type", kind.as_str())]);
        }
        expect_success(self.send("DELETE", "/notes", request)?)?;
        Ok(())
    }

    fn send(&self, method: &str, path: &str, request: RequestBuilder) -> ClientResult<Response> {
        let response = request.send()?;
        debug!(
            "event=client_request module=cli method={method} path={path} status={}",
            response.status().as_u16()
        );
        Ok(response)
    }
}

/// Query pairs for `GET /notes/filter`; absent filters are omitted.
pub fn filter_query(kind: NoteType, params: &NoteFilterParams) -> Vec<(&'static str, String)> {
    let mut query = vec![("type", kind.as_str().to_string())];
    let optional = [
        ("created_start", &params.created_start),
        ("created_end", &params.created_end),
        ("updated_start", &params.updated_start),
        ("updated_end", &params.updated_end),
        ("tags", &params.tags),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            query.push((key, value.clone()));
        }
    }
    query
}

/// Joins tags the way the filter endpoint expects them.
pub fn join_tags<S: AsRef<str>>(tags: &[S]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    Some(
        tags.iter()
            .map(|tag| tag.as_ref().trim())
            .collect::<Vec<_>>()
            .join(","),
    )
}

fn note_path(kind: NoteType, id: NoteId) -> String {
    format!("/notes/{kind}/{id}")
}

fn expect_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
    let message = response
        .json::<ErrorBody>()
        .map(|body| body.error)
        .unwrap_or(fallback);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    Ok(expect_success(response)?.json()?)
}
