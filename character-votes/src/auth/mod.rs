//! Identity provider implementations.
mod jwt;

pub use jwt::{Claims, JwtIdentityProvider};

#[cfg(test)]
pub(crate) use jwt::tests as test_support;
