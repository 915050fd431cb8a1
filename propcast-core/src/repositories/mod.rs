// src/repositories/mod.rs

pub use propcast_common::traits::repository_traits::{
    AnalysisRepository, ProfileRepository, ShareRepository, UserRepository,
};

pub use postgres::{
    PostgresAnalysisRepository, PostgresProfileRepository, PostgresShareRepository,
    PostgresUserRepository,
};

pub mod postgres;
