//! Convenience re-exports for common use.

pub use crate::client::{Clock, OAuthClient, SystemClock};
pub use crate::config::{ClientConfig, OAuthConfig};
pub use crate::error::{OAuthError, Result};
pub use crate::provider::{AvatarInfo, CallbackParams, ProviderAdapter, TokenPlacement, UserInfo};
pub use crate::registry::{ClientRegistry, ProviderRegistry};
pub use crate::store::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use crate::token::TokenStatus;
pub use crate::transport::{Endpoint, HttpRequest, HttpResponse, HttpTransport};
