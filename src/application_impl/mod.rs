mod auth_service_impl;
mod credential_verifier_fake;
mod credential_verifier_impl;
mod rotation_service;
mod token_codec_jwt;
mod token_issuer;

pub use auth_service_impl::*;
pub use credential_verifier_fake::*;
pub use credential_verifier_impl::*;
pub use rotation_service::*;
pub use token_codec_jwt::*;
pub use token_issuer::*;
