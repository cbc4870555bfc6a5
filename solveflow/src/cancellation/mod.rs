//! Cooperative cancellation.
//!
//! The engine checks the token before each stage and before each retry. An
//! executor invocation already in flight is allowed to finish or time out.

mod token;

pub use token::CancellationToken;
