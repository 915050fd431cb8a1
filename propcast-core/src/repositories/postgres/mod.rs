// src/repositories/postgres/mod.rs

pub mod analysis;
pub mod profile;
pub mod share;
pub mod user;

pub use analysis::PostgresAnalysisRepository;
pub use profile::PostgresProfileRepository;
pub use share::PostgresShareRepository;
pub use user::PostgresUserRepository;
