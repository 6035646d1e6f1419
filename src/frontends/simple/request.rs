//! Simple, owning request and response types.
use std::borrow::Cow;

use serde_json::json;

use crate::code_grant::resource::{self, Error};

/// Open and simple implementation of a resource `Request`.
#[derive(Clone, Debug, Default)]
pub struct Request {
    /// Provided authorization header.
    pub auth: Option<String>,

    /// Marks the request as malformed, for example when the header was sent twice.
    pub malformed: bool,
}

/// Open and simple response to a resource request.
#[derive(Clone, Debug, Default)]
pub struct Response {
    /// HTTP status code.
    pub status: Status,

    /// Indicates how the client should have authenticated.
    ///
    /// Only set with `Unauthorized` and `Forbidden` status.
    pub www_authenticate: Option<String>,

    /// Encoded body of the response.
    pub body: Option<Body>,
}

/// An enum containing the necessary HTTP status codes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Status {
    /// Http status code 200.
    Ok,

    /// Http status code 400.
    BadRequest,

    /// Http status code 401.
    Unauthorized,

    /// Http status code 403.
    Forbidden,

    /// Http status code 500.
    InternalServerError,
}

/// Models the necessary body contents.
///
/// Real HTTP protocols should set a content type header for each of the body variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Body {
    /// A pure text body.
    Text(String),

    /// A json encoded body, `application/json`.
    Json(String),
}

impl Request {
    /// A request presenting the given bearer token.
    pub fn bearer(token: &str) -> Self {
        Request {
            auth: Some(format!("Bearer {}", token)),
            malformed: false,
        }
    }
}

impl resource::Request for Request {
    fn valid(&self) -> bool {
        !self.malformed
    }

    fn token(&self) -> Option<Cow<str>> {
        self.auth.as_ref().map(|auth| Cow::Borrowed(auth.as_str()))
    }
}

impl Response {
    /// The response letting the request through.
    pub fn ok() -> Self {
        Response::default()
    }

    /// Translate a guard error into the response reporting it.
    pub fn from_error(error: Error) -> Self {
        let status = Status::from_code(error.status());
        let body = match &error {
            Error::MalformedRequirement(err) => Some(Body::Text(err.to_string())),
            Error::AccessDenied { failure, .. } | Error::Unauthenticated { failure, .. } => failure
                .code
                .map(|code| Body::Json(json!({ "error": code.description() }).to_string())),
            _ => None,
        };

        Response {
            status,
            www_authenticate: error.www_authenticate(),
            body,
        }
    }
}

impl Status {
    /// The variant for a numeric status code, unknown codes map to `InternalServerError`.
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Status::Ok,
            400 => Status::BadRequest,
            401 => Status::Unauthorized,
            403 => Status::Forbidden,
            _ => Status::InternalServerError,
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Ok
    }
}
