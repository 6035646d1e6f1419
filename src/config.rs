//! Configuration of guarded routes.
//!
//! Requirements are usually attached to routes in the configuration of a service rather than in
//! code. A configuration is a json document naming the realm and the requirement of every
//! guarded route:
//!
//! ```json
//! {
//!     "realm": "api",
//!     "routes": {
//!         "users.index": "read_users|manage_users",
//!         "users.store": "manage_users",
//!         "health": ""
//!     }
//! }
//! ```
//!
//! Every requirement is parsed when the configuration is loaded so that a typo surfaces at
//! startup instead of on the first request to the route.
use std::collections::BTreeMap;
use std::{error, fmt, io};

use log::debug;
use serde::de::Error as _;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::frontends::simple::endpoint::Guard;
use crate::primitives::expression::{MalformedScopeExpression, ScopeExpr};
use crate::primitives::issuer::Issuer;
use crate::primitives::roles::RoleRegistry;

/// Name of the route middleware carrying a scope requirement.
pub const MIDDLEWARE_NAME: &str = "oauth";

/// Realm and requirements of all guarded routes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// Realm reported in authentication challenges.
    #[serde(default)]
    pub realm: Option<String>,

    /// The requirement string of each route, keyed by route name.
    ///
    /// An empty requirement only asks for a valid token.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

/// Loading a configuration failed.
#[derive(Debug)]
pub enum ConfigError {
    /// The document was not valid json or did not have the expected shape.
    Json(serde_json::Error),

    /// The requirement of a route could not be parsed.
    Malformed {
        /// Name of the offending route.
        route: String,

        /// The parse error.
        source: MalformedScopeExpression,
    },

    /// A middleware parameter named some other middleware.
    UnknownMiddleware(String),
}

impl GuardConfig {
    /// Parse and validate a json configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document = serde_json::from_str(json).map_err(ConfigError::Json)?;
        GuardConfig::from_document(document)
    }

    /// Read, parse and validate a json configuration.
    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, ConfigError> {
        let document = serde_json::from_reader(reader).map_err(ConfigError::Json)?;
        GuardConfig::from_document(document)
    }

    /// Only a json object is a configuration, the sequence form of the struct is not accepted.
    fn from_document(document: Value) -> Result<Self, ConfigError> {
        if !document.is_object() {
            return Err(ConfigError::Json(serde_json::Error::custom(
                "configuration must be a json object",
            )));
        }

        let config: GuardConfig = serde_json::from_value(document).map_err(ConfigError::Json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the requirement of every route parses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    /// Parse the requirements of all routes.
    pub fn compile(&self) -> Result<BTreeMap<String, ScopeExpr>, ConfigError> {
        let mut compiled = BTreeMap::new();
        for (route, raw) in &self.routes {
            let expr = ScopeExpr::parse(raw).map_err(|source| ConfigError::Malformed {
                route: route.clone(),
                source,
            })?;
            compiled.insert(route.clone(), expr);
        }

        debug!("Validated requirements of {} routes", compiled.len());
        Ok(compiled)
    }

    /// Add or replace the requirement of a route, given as middleware parameter.
    ///
    /// The parameter has the form `oauth` or `oauth:<requirement>`.
    pub fn add_route(&mut self, route: &str, parameter: &str) -> Result<(), ConfigError> {
        let requirement = parse_middleware(parameter)?;
        ScopeExpr::parse(requirement).map_err(|source| ConfigError::Malformed {
            route: route.to_string(),
            source,
        })?;
        self.routes.insert(route.to_string(), requirement.to_string());
        Ok(())
    }

    /// The requirement string of a route, `None` if the route is not guarded.
    pub fn requirement(&self, route: &str) -> Option<&str> {
        self.routes.get(route).map(String::as_str)
    }

    /// A guard for the route, using the configured realm.
    ///
    /// Returns `None` if the route is not guarded.
    pub fn guard<I: Issuer, R: RoleRegistry>(&self, route: &str, issuer: I, roles: R) -> Option<Guard<I, R>> {
        let requirement = self.requirement(route)?;
        Some(Guard {
            requirement: Some(requirement.to_string()),
            issuer,
            roles,
            realm: self.realm.clone(),
        })
    }
}

/// Extract the requirement from a route middleware parameter.
///
/// `oauth` yields the empty requirement and `oauth:read&write` yields `read&write`. Everything
/// after the first colon is the requirement.
pub fn parse_middleware(parameter: &str) -> Result<&str, ConfigError> {
    let mut parts = parameter.splitn(2, ':');
    let name = parts.next().unwrap_or("");
    if name != MIDDLEWARE_NAME {
        return Err(ConfigError::UnknownMiddleware(name.to_string()));
    }

    Ok(parts.next().unwrap_or(""))
}

impl fmt::Display for ConfigError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Json(err) => write!(fmt, "Invalid guard configuration: {}", err),
            ConfigError::Malformed { route, source } => {
                write!(fmt, "Route `{}` has an invalid requirement: {}", route, source)
            }
            ConfigError::UnknownMiddleware(name) => write!(fmt, "Unknown middleware `{}`", name),
        }
    }
}

impl error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            ConfigError::Json(err) => Some(err),
            ConfigError::Malformed { source, .. } => Some(source),
            ConfigError::UnknownMiddleware(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::primitives::expression::Malformation;

    const CONFIG: &str = r#"{
        "realm": "api",
        "routes": {
            "users.index": "read_users|manage_users",
            "users.store": "manage_users",
            "health": ""
        }
    }"#;

    #[test]
    fn load_configuration() {
        let config = GuardConfig::from_json(CONFIG).unwrap();
        assert_eq!(config.realm.as_ref().map(String::as_str), Some("api"));
        assert_eq!(config.requirement("users.store"), Some("manage_users"));
        assert_eq!(config.requirement("health"), Some(""));
        assert_eq!(config.requirement("unknown"), None);

        let compiled = config.compile().unwrap();
        assert!(compiled["health"].is_empty());
        assert_eq!(compiled["users.index"].literals(), vec!["read_users", "manage_users"]);
    }

    #[test]
    fn reader_and_defaults() {
        let config = GuardConfig::from_reader("{}".as_bytes()).unwrap();
        assert_eq!(config, GuardConfig::default());
    }

    #[test]
    fn malformed_route_is_named() {
        let json = r#"{ "routes": { "users.store": "manage_users&" } }"#;
        match GuardConfig::from_json(json) {
            Err(ConfigError::Malformed { route, source }) => {
                assert_eq!(route, "users.store");
                assert_eq!(source.reason(), Malformation::MisplacedOperator);
            }
            other => panic!("Expected malformed route: {:?}", other),
        }
    }

    #[test]
    fn invalid_documents() {
        assert!(matches!(GuardConfig::from_json("[]"), Err(ConfigError::Json(_))));
        assert!(matches!(GuardConfig::from_json(r#"["api", {}]"#), Err(ConfigError::Json(_))));
        assert!(matches!(GuardConfig::from_json("null"), Err(ConfigError::Json(_))));
        assert!(matches!(
            GuardConfig::from_reader("[]".as_bytes()),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            GuardConfig::from_json(r#"{ "routez": {} }"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn middleware_parameters() {
        assert_eq!(parse_middleware("oauth").unwrap(), "");
        assert_eq!(parse_middleware("oauth:").unwrap(), "");
        assert_eq!(parse_middleware("oauth:a&b").unwrap(), "a&b");
        assert!(matches!(
            parse_middleware("auth:a"),
            Err(ConfigError::UnknownMiddleware(ref name)) if name == "auth"
        ));
    }

    #[test]
    fn add_routes() {
        let mut config = GuardConfig::default();
        config.add_route("roles.index", "oauth:read_roles").unwrap();
        config.add_route("me", "oauth").unwrap();
        assert_eq!(config.requirement("roles.index"), Some("read_roles"));
        assert_eq!(config.requirement("me"), Some(""));

        assert!(matches!(
            config.add_route("roles.store", "oauth:a b"),
            Err(ConfigError::Malformed { .. })
        ));
        assert_eq!(config.requirement("roles.store"), None);
    }
}
