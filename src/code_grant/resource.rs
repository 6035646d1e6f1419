//! Provides the handling for Resource Requests.
//!
//! A resource is guarded by a scope requirement such as `read|write`. A request is let through if
//! it carries a valid bearer token whose principal satisfies the requirement. The steps are:
//!
//! 1. Extract the bearer token from the request.
//! 2. Parse the requirement of the resource. A malformed requirement is a configuration error of
//!    the resource and reported as such, independent of the token.
//! 3. Recover the grant of the token, rejecting unknown and expired tokens.
//! 4. For user owners only, determine the roles attached to the user.
//! 5. Evaluate the requirement against the token scope and, for users, the role scopes.
use std::{error, fmt, mem};
use std::borrow::Cow;

use log::{debug, warn};

use crate::primitives::evaluator;
use crate::primitives::expression::{MalformedScopeExpression, ScopeExpr};
use crate::primitives::grant::Grant;
use crate::primitives::issuer::Issuer;
use crate::primitives::principal::{OwnerType, Principal, Role};
use crate::primitives::roles::RoleRegistry;

/// Gives additional information about the reason for an access failure.
///
/// According to [rfc6750], this should not be returned if the client has not provided any
/// authentication information.
///
/// [rfc6750]: https://tools.ietf.org/html/rfc6750#section-3.1
#[derive(Clone, Debug)]
pub struct AccessFailure {
    /// The standard error code representation.
    pub code: Option<ErrorCode>,
}

/// Indicates the reason for access failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The request did not have enough authorization data or was otherwise malformed.
    InvalidRequest,

    /// The provided authorization did not grant sufficient priviledges.
    InsufficientScope,

    /// The token is expired, revoked, malformed or otherwise does not meet expectations.
    InvalidToken,
}

/// Additional information provided for the WWW-Authenticate header.
#[derive(Clone, Debug, Default)]
pub struct Authenticate {
    /// Information about which realm the credentials correspond to.
    pub realm: Option<String>,

    /// The requirement guarding the resource, as configured.
    pub scope: Option<String>,
}

/// An error signalling the resource access was not permitted.
#[derive(Clone, Debug)]
pub enum Error {
    /// The principal was authenticated but does not satisfy the requirement.
    AccessDenied {
        /// A specific cause for denying access.
        failure: AccessFailure,

        /// Information for the `Authenticate` header in the error response.
        authenticate: Authenticate,
    },

    /// The token was unknown, revoked or expired.
    Unauthenticated {
        /// A specific cause for rejecting the token.
        failure: AccessFailure,

        /// Information for the `Authenticate` header in the error response.
        authenticate: Authenticate,
    },

    /// The client did not provide any bearer authentication.
    NoAuthentication {
        /// Information for the `Authenticate` header in the error response.
        authenticate: Authenticate,
    },

    /// The request itself was malformed.
    InvalidRequest {
        /// Information for the `Authenticate` header in the error response.
        authenticate: Authenticate,
    },

    /// The requirement configured for the resource could not be parsed.
    ///
    /// This is not the fault of the client and carries no authentication challenge.
    MalformedRequirement(MalformedScopeExpression),

    /// Some part of the endpoint failed, defer to endpoint for handling.
    PrimitiveError,
}

/// The principal that was let through, together with the grant of its token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    /// The grant recovered for the bearer token.
    pub grant: Grant,

    /// The principal the requirement was evaluated against.
    pub principal: Principal,
}

const BEARER_START: &str = "Bearer ";

type Result<T> = std::result::Result<T, Error>;

/// Required request methods for deciding on the rights to access a protected resource.
pub trait Request {
    /// Received request might not be encoded correctly. This method gives implementors the chance
    /// to signal that a request was received but its encoding was generally malformed. If this is
    /// the case, then no other attribute will be queried.
    fn valid(&self) -> bool;

    /// The authorization used in the request.
    ///
    /// Expects the complete `Authorization` HTTP-header, including the qualification as `Bearer`.
    /// In case the client included multiple forms of authorization, this method MUST return None
    /// and the request SHOULD be marked as invalid.
    fn token(&self) -> Option<Cow<str>>;
}

/// Required functionality to respond to resource requests.
///
/// Each method will only be invoked at most once when processing a request.
pub trait Endpoint {
    /// The scope requirement of the resource, `None` if it requires no scope at all.
    fn requirement(&mut self) -> Option<&str>;

    /// Issuer which provides the grants of the tokens used by the client.
    fn issuer(&mut self) -> &dyn Issuer;

    /// Registry of the roles attached to users.
    fn roles(&mut self) -> &dyn RoleRegistry;

    /// The realm reported in authentication challenges.
    fn realm(&mut self) -> Option<&str> {
        None
    }
}

/// The result will indicate whether the resource access should be allowed or not.
pub struct Resource {
    state: ResourceState,
}

struct Requirement {
    raw: String,
    expr: ScopeExpr,
}

enum ResourceState {
    /// The initial state.
    New,
    /// State after the requirement has been parsed.
    Internalized { requirement: Requirement },
    /// State after request has been validated.
    Recovering { token: String, requirement: Requirement },
    /// State after a grant owned by a user was recovered.
    Resolving { grant: Grant, requirement: Requirement },
    /// State after an error occurred.
    Err(Error),
}

/// An input injected by the executor into the state machine.
#[derive(Clone)]
pub enum Input<'req> {
    /// Provides simply the original request.
    Request {
        /// The request
        request: &'req dyn Request,
    },
    /// The scope requirement of the requested resource.
    Requirement(Option<&'req str>),
    /// Provide the queried (bearer) token.
    Recovered(Option<Grant>),
    /// The roles attached to the user owning the grant.
    Roles(Vec<Role>),
    /// Advance without input as far as possible, or just retrieve the output again.
    None,
}

/// A request by the statemachine to the executor.
///
/// Each variant is fulfilled by certain variants of the next inputs as an argument to
/// `Resource::advance`. The output of most states is simply repeated if `Input::None` is provided
/// instead but note that the successful output is **not** repeated.
#[derive(Clone, Debug)]
pub enum Output<'machine> {
    /// The state requires some information from the request to advance.
    GetRequest,
    /// The executor must determine the requirement of the resource.
    ///
    /// Fulfilled by `Input::Requirement`.
    DetermineRequirement,
    /// The issuer should try to recover the grant of a bearer token.
    ///
    /// Fulfilled by `Input::Recovered`.
    Recover {
        /// The token supplied by the client.
        token: &'machine str,
    },
    /// The token belongs to a user whose roles are needed.
    ///
    /// Fulfilled by `Input::Roles`.
    ResolveRoles {
        /// The user owning the grant.
        owner_id: &'machine str,
    },
    /// The state machine finished and access was allowed.
    ///
    /// This output **can not** be requested repeatedly, any future `Input` will yield a primitive
    /// error instead.
    Ok(Authorization),
    /// The state machine finished in an error.
    ///
    /// The error will be repeated on *any* following input.
    Err(Error),
}

impl Resource {
    /// Create a Resource state machine at `ResourceState::New` state
    pub fn new() -> Self {
        Resource {
            state: ResourceState::New,
        }
    }

    /// Progress the state machine to next step, taking in needed `Input` parameters
    pub fn advance(&mut self, input: Input) -> Output<'_> {
        self.state = match (self.take(), input) {
            (any, Input::None) => any,
            (ResourceState::New, Input::Requirement(raw)) => {
                determined(raw).unwrap_or_else(ResourceState::Err)
            }
            (ResourceState::Internalized { requirement }, Input::Request { request }) => {
                validate(request, requirement).unwrap_or_else(ResourceState::Err)
            }
            (ResourceState::Recovering { token: _, requirement }, Input::Recovered(grant)) => {
                match recovered(grant, requirement) {
                    Ok(Recovered::Resolving(state)) => state,
                    Ok(Recovered::Done(authorization)) => return Output::Ok(authorization),
                    Err(err) => ResourceState::Err(err),
                }
            }
            (ResourceState::Resolving { grant, requirement }, Input::Roles(roles)) => {
                match resolved(grant, requirement, roles) {
                    Ok(authorization) => return Output::Ok(authorization),
                    Err(err) => ResourceState::Err(err),
                }
            }
            _ => return Output::Err(Error::PrimitiveError),
        };

        self.output()
    }

    fn output(&self) -> Output<'_> {
        match &self.state {
            ResourceState::New => Output::DetermineRequirement,
            ResourceState::Internalized { .. } => Output::GetRequest,
            ResourceState::Recovering { token, .. } => Output::Recover { token },
            ResourceState::Resolving { grant, .. } => Output::ResolveRoles {
                owner_id: &grant.owner_id,
            },
            ResourceState::Err(error) => Output::Err(error.clone()),
        }
    }

    fn take(&mut self) -> ResourceState {
        mem::replace(&mut self.state, ResourceState::Err(Error::PrimitiveError))
    }
}

impl Default for Resource {
    fn default() -> Self {
        Resource::new()
    }
}

/// Do needed verification before granting access to the resource
pub fn protect(handler: &mut dyn Endpoint, req: &dyn Request) -> Result<Authorization> {
    enum Requested {
        None,
        Request,
        Requirement,
        Grant(String),
        Roles(String),
    }

    let mut resource = Resource::new();
    let mut requested = Requested::None;
    let result = loop {
        let input = match requested {
            Requested::None => Input::None,
            Requested::Request => Input::Request { request: req },
            Requested::Requirement => Input::Requirement(handler.requirement()),
            Requested::Grant(token) => {
                let grant = handler
                    .issuer()
                    .recover_token(&token)
                    .map_err(|_| Error::PrimitiveError)?;
                Input::Recovered(grant)
            }
            Requested::Roles(owner_id) => {
                let roles = handler
                    .roles()
                    .roles(&owner_id)
                    .map_err(|_| Error::PrimitiveError)?;
                Input::Roles(roles)
            }
        };

        requested = match resource.advance(input) {
            Output::Err(error) => break Err(error),
            Output::Ok(authorization) => break Ok(authorization),
            Output::GetRequest => Requested::Request,
            Output::DetermineRequirement => Requested::Requirement,
            Output::Recover { token } => Requested::Grant(token.to_string()),
            Output::ResolveRoles { owner_id } => Requested::Roles(owner_id.to_string()),
        };
    };

    match handler.realm() {
        Some(realm) => result.map_err(|err| err.with_realm(realm)),
        None => result,
    }
}

enum Recovered {
    Resolving(ResourceState),
    Done(Authorization),
}

fn validate(request: &dyn Request, requirement: Requirement) -> Result<ResourceState> {
    if !request.valid() {
        return Err(Error::InvalidRequest {
            authenticate: Authenticate::empty(),
        });
    }

    let client_token = match request.token() {
        Some(token) => token,
        None => {
            return Err(Error::NoAuthentication {
                authenticate: Authenticate::empty(),
            })
        }
    };

    if !client_token.starts_with(BEARER_START) {
        return Err(Error::InvalidRequest {
            authenticate: Authenticate::empty(),
        });
    }

    let token = match client_token {
        Cow::Borrowed(token) => token[BEARER_START.len()..].to_string(),
        Cow::Owned(mut token) => token.split_off(BEARER_START.len()),
    };

    Ok(ResourceState::Recovering { token, requirement })
}

fn determined(raw: Option<&str>) -> Result<ResourceState> {
    let raw = raw.unwrap_or("");
    let expr = ScopeExpr::parse(raw).map_err(|err| {
        warn!("{}", err);
        Error::MalformedRequirement(err)
    })?;

    Ok(ResourceState::Internalized {
        requirement: Requirement {
            raw: raw.to_string(),
            expr,
        },
    })
}

fn recovered(grant: Option<Grant>, requirement: Requirement) -> Result<Recovered> {
    let grant = match grant {
        Some(grant) => grant,
        None => {
            debug!("Rejected unknown access token");
            return Err(Error::Unauthenticated {
                failure: AccessFailure {
                    code: Some(ErrorCode::InvalidRequest),
                },
                authenticate: requirement.challenge(),
            });
        }
    };

    if grant.is_expired() {
        debug!("Rejected expired access token of client {}", grant.client_id);
        return Err(Error::Unauthenticated {
            failure: AccessFailure {
                code: Some(ErrorCode::InvalidToken),
            },
            authenticate: Authenticate::empty(),
        });
    }

    match grant.owner_type {
        OwnerType::Client => {
            let principal = Principal::Client {
                scope: grant.scope.clone(),
            };
            authorize(grant, principal, &requirement).map(Recovered::Done)
        }
        OwnerType::User => Ok(Recovered::Resolving(ResourceState::Resolving { grant, requirement })),
    }
}

fn resolved(grant: Grant, requirement: Requirement, roles: Vec<Role>) -> Result<Authorization> {
    let principal = Principal::User {
        scope: grant.scope.clone(),
        roles,
    };
    authorize(grant, principal, &requirement)
}

fn authorize(grant: Grant, principal: Principal, requirement: &Requirement) -> Result<Authorization> {
    if !evaluator::evaluate(&requirement.expr, &principal) {
        warn!(
            "Denied access for owner {} of client {}, requirement `{}`",
            grant.owner_id, grant.client_id, requirement.raw
        );
        return Err(Error::AccessDenied {
            failure: AccessFailure {
                code: Some(ErrorCode::InsufficientScope),
            },
            authenticate: requirement.challenge(),
        });
    }

    debug!(
        "Granted access for owner {} of client {}, requirement `{}`",
        grant.owner_id, grant.client_id, requirement.raw
    );
    Ok(Authorization { grant, principal })
}

impl Requirement {
    fn challenge(&self) -> Authenticate {
        Authenticate {
            realm: None,
            scope: if self.raw.is_empty() {
                None
            } else {
                Some(self.raw.clone())
            },
        }
    }
}

impl ErrorCode {
    /// The registered error code as used in the `error` attribute of a challenge.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::InsufficientScope => "insufficient_scope",
            ErrorCode::InvalidToken => "invalid_token",
        }
    }
}

struct BearerHeader {
    content: String,
    first_option: bool,
}

impl BearerHeader {
    fn new() -> Self {
        BearerHeader {
            content: "Bearer".to_string(),
            first_option: true,
        }
    }

    fn add_kvp(&mut self, key: &'static str, value: Option<impl fmt::Display>) {
        if let Some(value) = value {
            if self.first_option {
                self.content.push(' ');
                self.first_option = false;
            } else {
                self.content.push(',');
            }
            self.content.push_str(&format!("{}=\"{}\"", key, value));
        }
    }

    fn finalize(self) -> String {
        self.content
    }
}

impl Authenticate {
    fn empty() -> Self {
        Authenticate::default()
    }

    fn extend_header(self, header: &mut BearerHeader) {
        header.add_kvp("realm", self.realm);
        header.add_kvp("scope", self.scope);
    }
}

impl AccessFailure {
    fn extend_header(self, header: &mut BearerHeader) {
        header.add_kvp("error", self.code.map(ErrorCode::description));
    }
}

impl Error {
    /// The http status code fitting for the error.
    ///
    /// Authorization failures are `403`, authentication failures `401`. A malformed request and a
    /// malformed requirement both yield `400` and a failing primitive `500`.
    pub fn status(&self) -> u16 {
        match self {
            Error::AccessDenied { .. } => 403,
            Error::Unauthenticated { .. } | Error::NoAuthentication { .. } => 401,
            Error::InvalidRequest { .. } | Error::MalformedRequirement(_) => 400,
            Error::PrimitiveError => 500,
        }
    }

    /// Set the realm reported in the authentication challenge, if the error has one.
    pub fn with_realm(mut self, realm: &str) -> Self {
        match &mut self {
            Error::AccessDenied { authenticate, .. }
            | Error::Unauthenticated { authenticate, .. }
            | Error::NoAuthentication { authenticate }
            | Error::InvalidRequest { authenticate } => {
                authenticate.realm = Some(realm.to_string());
            }
            Error::MalformedRequirement(_) | Error::PrimitiveError => (),
        }
        self
    }

    /// Convert the guard error into the content used in an WWW-Authenticate header.
    ///
    /// Returns `None` for errors that are not the fault of the client's authorization.
    pub fn www_authenticate(self) -> Option<String> {
        let mut header = BearerHeader::new();
        match self {
            Error::AccessDenied {
                failure,
                authenticate,
            }
            | Error::Unauthenticated {
                failure,
                authenticate,
            } => {
                failure.extend_header(&mut header);
                authenticate.extend_header(&mut header);
            }
            Error::NoAuthentication { authenticate } => {
                authenticate.extend_header(&mut header);
            }
            Error::InvalidRequest { authenticate } => {
                authenticate.extend_header(&mut header);
            }
            Error::MalformedRequirement(_) | Error::PrimitiveError => return None,
        }
        Some(header.finalize())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::AccessDenied { .. } => fmt.write_str("access denied, insufficient scope"),
            Error::Unauthenticated { failure, .. } => match failure.code {
                Some(code) => write!(fmt, "token rejected: {}", code.description()),
                None => fmt.write_str("token rejected"),
            },
            Error::NoAuthentication { .. } => fmt.write_str("no bearer authentication provided"),
            Error::InvalidRequest { .. } => fmt.write_str("invalid resource request"),
            Error::MalformedRequirement(err) => fmt::Display::fmt(err, fmt),
            Error::PrimitiveError => fmt.write_str("a primitive of the endpoint failed"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::MalformedRequirement(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, Utc};

    use crate::primitives::issuer::TokenMap;
    use crate::primitives::roles::RoleMap;

    struct Bearer(Option<String>);

    impl Request for Bearer {
        fn valid(&self) -> bool {
            true
        }

        fn token(&self) -> Option<Cow<str>> {
            self.0.as_ref().map(|token| Cow::Borrowed(token.as_str()))
        }
    }

    struct Setup {
        requirement: Option<String>,
        issuer: TokenMap,
        roles: RoleMap,
    }

    impl Endpoint for Setup {
        fn requirement(&mut self) -> Option<&str> {
            self.requirement.as_ref().map(String::as_str)
        }

        fn issuer(&mut self) -> &dyn Issuer {
            &self.issuer
        }

        fn roles(&mut self) -> &dyn RoleRegistry {
            &self.roles
        }
    }

    fn setup(requirement: &str) -> Setup {
        let mut issuer = TokenMap::new();
        issuer.import_grant(
            "client_token".to_string(),
            Grant {
                owner_id: "ClientId".to_string(),
                owner_type: OwnerType::Client,
                client_id: "ClientId".to_string(),
                scope: "read".parse().unwrap(),
                until: Utc::now() + Duration::hours(1),
            },
        );
        issuer.import_grant(
            "user_token".to_string(),
            Grant {
                owner_id: "Owner".to_string(),
                owner_type: OwnerType::User,
                client_id: "ClientId".to_string(),
                scope: "read".parse().unwrap(),
                until: Utc::now() + Duration::hours(1),
            },
        );

        let mut roles = RoleMap::new();
        roles.define_role(Role::new("admin", "manage_users".parse().unwrap()));
        roles.assign("Owner", "admin").unwrap();

        Setup {
            requirement: Some(requirement.to_string()),
            issuer,
            roles,
        }
    }

    fn bearer(token: &str) -> Bearer {
        Bearer(Some(format!("Bearer {}", token)))
    }

    #[test]
    fn state_machine_steps() {
        let request = bearer("user_token");
        let mut resource = Resource::new();

        match resource.advance(Input::None) {
            Output::DetermineRequirement => (),
            other => panic!("Expected requirement to be requested: {:?}", other),
        }
        match resource.advance(Input::Requirement(Some("manage_users"))) {
            Output::GetRequest => (),
            other => panic!("Expected request to be requested: {:?}", other),
        }
        match resource.advance(Input::Request { request: &request }) {
            Output::Recover { token } => assert_eq!(token, "user_token"),
            other => panic!("Expected grant to be requested: {:?}", other),
        }

        let grant = setup("").issuer.recover_token("user_token").unwrap();
        match resource.advance(Input::Recovered(grant)) {
            Output::ResolveRoles { owner_id } => assert_eq!(owner_id, "Owner"),
            other => panic!("Expected roles to be requested: {:?}", other),
        }

        let roles = vec![Role::new("admin", "manage_users".parse().unwrap())];
        match resource.advance(Input::Roles(roles)) {
            Output::Ok(authorization) => assert_eq!(authorization.grant.owner_id, "Owner"),
            other => panic!("Expected access: {:?}", other),
        }

        match resource.advance(Input::None) {
            Output::Err(Error::PrimitiveError) => (),
            other => panic!("Success must not be repeated: {:?}", other),
        }
    }

    #[test]
    fn requirement_checked_before_request() {
        let mut resource = Resource::new();
        match resource.advance(Input::Requirement(Some("a&&b"))) {
            Output::Err(Error::MalformedRequirement(_)) => (),
            other => panic!("Expected malformed requirement: {:?}", other),
        }

        for request in &[Bearer(None), Bearer(Some("Basic x".to_string()))] {
            let mut setup = setup("a&&b");
            match protect(&mut setup, request) {
                Err(error @ Error::MalformedRequirement(_)) => {
                    assert_eq!(error.status(), 400);
                    assert_eq!(error.www_authenticate(), None);
                }
                other => panic!("Expected malformed requirement: {:?}", other),
            }
        }
    }

    #[test]
    fn unexpected_input() {
        let mut resource = Resource::new();
        match resource.advance(Input::Roles(Vec::new())) {
            Output::Err(Error::PrimitiveError) => (),
            other => panic!("Expected primitive error: {:?}", other),
        }
    }

    #[test]
    fn client_skips_roles() {
        let mut setup = setup("read");
        let authorization = protect(&mut setup, &bearer("client_token")).unwrap();
        assert_eq!(authorization.principal.owner_type(), OwnerType::Client);

        let mut setup = self::setup("manage_users");
        setup.roles.assign("ClientId", "admin").unwrap();
        match protect(&mut setup, &bearer("client_token")) {
            Err(Error::AccessDenied { .. }) => (),
            other => panic!("Client must not use roles: {:?}", other),
        }
    }

    #[test]
    fn missing_requirement_allows_any_token() {
        let mut setup = setup("");
        setup.requirement = None;
        assert!(protect(&mut setup, &bearer("client_token")).is_ok());
    }

    #[test]
    fn header_content() {
        let denied = Error::AccessDenied {
            failure: AccessFailure {
                code: Some(ErrorCode::InsufficientScope),
            },
            authenticate: Authenticate {
                realm: None,
                scope: Some("a&b".to_string()),
            },
        };
        assert_eq!(denied.status(), 403);
        assert_eq!(
            denied.with_realm("api").www_authenticate().as_ref().map(String::as_str),
            Some("Bearer error=\"insufficient_scope\",realm=\"api\",scope=\"a&b\"")
        );

        let none = Error::NoAuthentication {
            authenticate: Authenticate::empty(),
        };
        assert_eq!(none.status(), 401);
        assert_eq!(none.www_authenticate(), Some("Bearer".to_string()));
    }
}
