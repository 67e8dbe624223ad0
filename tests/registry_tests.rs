mod support;

use std::sync::Arc;

use oauth_relay::config::OAuthConfig;
use oauth_relay::error::OAuthError;
use oauth_relay::provider::{CallbackParams, ProviderAdapter};
use oauth_relay::registry::{AdapterFactory, ClientRegistry, ProviderRegistry};
use oauth_relay::token::TokenStatus;
use oauth_relay::transport::ReqwestTransport;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{manual_clock, session_store, MockProvider};

const CONFIG: &str = r#"
[settings]
refresh_buffer_ms = 120000

[clients.github]
client_id = "gh-id"
client_secret = "gh-secret"
redirect_uri = "https://app.test/auth/github"
scope = "read:user user:email"

[clients.google]
client_id = "g-id"
client_secret = "g-secret"
redirect_uri = "https://app.test/auth/google"
enabled = false

[clients.unknown]
client_id = "x"
redirect_uri = "https://app.test/auth/unknown"
enabled = false
"#;

struct MockFactory {
    base_uri: String,
}

impl AdapterFactory for MockFactory {
    fn provider_keys(&self) -> &[&str] {
        &["mock"]
    }

    fn create(&self, _provider_key: &str) -> Result<Arc<dyn ProviderAdapter>, OAuthError> {
        let server_like = MockProvider::from_base(&self.base_uri);
        Ok(Arc::new(server_like))
    }
}

#[test]
fn builtin_registry_builds_enabled_clients_only() {
    let config = OAuthConfig::from_toml_str(CONFIG).unwrap();
    let clients = ClientRegistry::from_config(ProviderRegistry::global(), &config).unwrap();

    assert_eq!(clients.keys().collect::<Vec<_>>(), vec!["github"]);
    let github = clients.client("github", None).unwrap();
    let uri = github.login_uri(Some("s1")).unwrap();
    assert!(uri
        .as_str()
        .starts_with("https://github.com/login/oauth/authorize?response_type=code&client_id=gh-id"));
    assert!(uri
        .query_pairs()
        .any(|(k, v)| k == "scope" && v == "read:user user:email"));
}

#[test]
fn enabling_an_unregistered_provider_fails() {
    let config = OAuthConfig::from_toml_str(&CONFIG.replace(
        "redirect_uri = \"https://app.test/auth/unknown\"\nenabled = false",
        "redirect_uri = \"https://app.test/auth/unknown\"",
    ))
    .unwrap();
    let result = ClientRegistry::from_config(ProviderRegistry::global(), &config);
    assert!(matches!(
        result,
        Err(OAuthError::Configuration(msg)) if msg.contains("unknown")
    ));
}

#[tokio::test]
async fn registry_clients_share_settings_transport_and_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok1",
            "refresh_token": "ref1",
            "expires_in": 100
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut providers = ProviderRegistry::builtin();
    providers.register(Arc::new(MockFactory {
        base_uri: server.uri(),
    }));
    let config = OAuthConfig::from_toml_str(&format!(
        "{CONFIG}\n[clients.mock]\nclient_id = \"m-id\"\nredirect_uri = \"https://app.test/auth/mock\"\n"
    ))
    .unwrap();
    let clients = ClientRegistry::from_config(&providers, &config)
        .unwrap()
        .with_transport(Arc::new(ReqwestTransport::default()))
        .with_clock(manual_clock());

    let store = session_store();
    let login = clients.client("mock", Some(store.clone())).unwrap();
    login
        .complete_login(&CallbackParams::from_query("code=c1"))
        .await
        .unwrap();

    // 100s lifetime sits inside the configured 120s buffer.
    let later = clients.client("mock", Some(store)).unwrap();
    assert_eq!(later.status().unwrap(), TokenStatus::Refreshable);
}
