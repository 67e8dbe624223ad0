//! oauth-relay: OAuth2 authorization-code client
//!
//! Drives the authorization-code grant against pluggable providers: builds
//! login URIs, exchanges codes for tokens, refreshes tokens before they
//! expire, gates authenticated API calls and normalizes user profiles into
//! one [`UserInfo`](provider::UserInfo) shape.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use oauth_relay::prelude::*;
//!
//! # async fn example() -> oauth_relay::error::Result<()> {
//! let config = OAuthConfig::load_default()?;
//! let clients = ClientRegistry::from_config(ProviderRegistry::global(), &config)?;
//!
//! // One store per user session.
//! let session: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
//! let google = clients.client("google", Some(session))?;
//!
//! let state = oauth_relay::client::generate_state();
//! println!("redirect to {}", google.login_uri(Some(&state))?);
//!
//! // On the redirect back:
//! let callback = CallbackParams::from_query("code=4%2F0AX4&state=...");
//! let user = google.user_info(Some(&callback)).await?;
//! println!("signed in {} <{:?}>", user.full_name(), user.email);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod provider;
pub mod registry;
pub mod response;
pub mod store;
pub mod token;
pub mod transport;
