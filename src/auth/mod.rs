// Authentication: bcrypt passwords, HS256 bearer tokens, role gates

pub mod errors;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod service;

pub use errors::AuthError;
pub use jwt::{extract_bearer_token, JwtService};
pub use middleware::{
    coach_only_middleware, cors_layer, jwt_auth_middleware, rate_limit_middleware,
    security_headers_layer, swimmer_only_middleware, RateLimiter,
};
pub use models::{AccountSession, Claims, RateLimitConfig, TokenResponse};
pub use service::AuthService;
