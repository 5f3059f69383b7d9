// src/error.rs
use thiserror::Error;

use crate::ami::AmiError;
use crate::resolve::ResolveError;
use crate::shop::ShopError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("AMI error: {0}")]
    Ami(#[from] AmiError),

    #[error("Shop backend error: {0}")]
    Shop(#[from] ShopError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),
}
