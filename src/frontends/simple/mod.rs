//! A baseline implemention of [`Endpoint`] and [`Request`].
//!
//! Contains straightforward request and response formats suitable for HTTP-less applications.
//! This is useful for testing as well as for resources that operate behind an HTTP portal.
//!
//! [`Endpoint`]: ../../code_grant/resource/trait.Endpoint.html
//! [`Request`]: ../../code_grant/resource/trait.Request.html
pub mod endpoint;

pub mod request;
