//! OAuth token lifecycle: authorization, exchange, refresh-with-skew, and
//! replay protection for authorization codes.

pub mod oauth;
pub mod replay;
pub mod tokens;

pub use oauth::OAuthService;
pub use replay::{ReplayGuard, USED_CODE_TTL_SECONDS};
pub use tokens::{TOKEN_SKEW_SECONDS, TokenEndpointResponse, TokenRecord};
