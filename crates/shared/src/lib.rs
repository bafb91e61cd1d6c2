//! Types shared between the client core and its front ends: project records,
//! identity records, and the sign-in exchange with the identity provider.

pub mod domain;
pub mod error;
pub mod protocol;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
