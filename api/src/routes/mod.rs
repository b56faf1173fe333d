//! API Routes

pub mod health;
pub mod signup;
pub mod tenants;
