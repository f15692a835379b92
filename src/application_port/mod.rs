mod auth_service;
mod token_codec;

pub use auth_service::*;
pub use token_codec::*;
