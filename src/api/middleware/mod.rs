//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Auth guard — uniform 401 on any invalid tenant header
//! 2. Access logger — logs after auth, has the tenant id

pub mod audit;
pub mod auth;
