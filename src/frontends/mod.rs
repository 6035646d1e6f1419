//! A base for implementing front-ends.
//!
//! Front-ends are glue adapters from other http server crates to the state machine in
//! [`code_grant::resource`]. Each of them needs a request type implementing the resource
//! [`Request`] trait, which only has to expose the `Authorization` header, and a way to turn the
//! resulting [`Error`] into a response.
//!
//! * `simple`: Implemented here, owning request and response types and a generic guard that can
//!   be reused in other web servers.
//!
//! [`code_grant::resource`]: ../code_grant/resource/index.html
//! [`Request`]: ../code_grant/resource/trait.Request.html
//! [`Error`]: ../code_grant/resource/enum.Error.html
pub mod simple;
