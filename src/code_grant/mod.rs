//! Available state machines for protecting resources.
//!
//! The machines do not perform any IO themselves. Each step requests some input, a lookup in the
//! token storage for example, that the executor provides in the next call. [`resource::protect`]
//! is such an executor for synchronous primitives.
//!
//! [`resource::protect`]: resource/fn.protect.html
pub mod resource;
