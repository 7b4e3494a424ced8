//! Authentication for the planner API

#[cfg(test)]
mod edge_case_tests;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtError, JwtManager};
pub use middleware::{
    extract_bearer_token, extract_ip_address, require_auth, AuthError, AuthState, AuthUser,
};
pub use password::{hash_password, verify_password, PasswordError};
