//! 用户凭据存储

mod user_repository;

pub use user_repository::{MemoryUserRepository, PgUserRepository, UserRepository};

#[cfg(test)]
pub use user_repository::MockUserRepository;
