#![allow(dead_code)]

use mapper_engine::app::MapperEngine;
use mapper_engine::config::EngineConfig;
use mapper_engine::providers::memory::{InMemoryIdentityProvider, SessionRecord, UserRecord};
use mapper_engine::providers::{Principal, UserSession};
use std::time::Duration;

pub const CLIENT: &str = "test-app";

pub fn realm() -> InMemoryIdentityProvider {
    let mut alice = UserRecord::new("u-alice", "alice");
    alice.email = Some("alice@example.com".to_string());
    alice.email_verified = true;
    alice.first_name = Some("Alice".to_string());
    alice.last_name = Some("Liddell".to_string());
    alice
        .attributes
        .insert("locale".to_string(), vec!["en".to_string()]);
    alice.attributes.insert(
        "phone".to_string(),
        vec!["555-0100".to_string(), "555-0101".to_string()],
    );
    alice.roles = vec![
        "offline_access".to_string(),
        "account.view-profile".to_string(),
    ];
    alice.groups = vec!["/engineering/platform".to_string()];

    InMemoryIdentityProvider::new()
        .with_realm_role("offline_access")
        .with_realm_role("uma_authorization")
        .with_client_role("account", "view-profile")
        .with_client_role("account", "manage-account")
        .with_client(CLIENT)
        .with_user(alice)
        .with_session(SessionRecord {
            id: "s-alice".to_string(),
            user_id: "u-alice".to_string(),
            notes: [("session note".to_string(), "42".to_string())].into(),
        })
}

pub fn engine() -> MapperEngine {
    engine_with_timeout(Duration::from_millis(250))
}

pub fn engine_with_timeout(transform_timeout: Duration) -> MapperEngine {
    let config = EngineConfig {
        transform_timeout,
        ..EngineConfig::default()
    };
    MapperEngine::in_memory(&config, realm())
}

pub fn alice() -> (Principal, UserSession) {
    let principal = Principal {
        user_id: "u-alice".to_string(),
        username: "alice".to_string(),
    };
    let session = UserSession {
        session_id: "s-alice".to_string(),
        user_id: "u-alice".to_string(),
    };
    (principal, session)
}
