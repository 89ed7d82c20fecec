//! Read-only lookup of user display names from the identity service.
//!
//! Strictly decorative: any failure here (timeout, non-2xx, unset base URL)
//! degrades to a placeholder instead of failing the request being served.

use serde::Deserialize;
use std::time::Duration;

pub const FALLBACK_NAME: &str = "collector";

#[derive(Debug, Deserialize)]
struct UserProfile {
    nickname: Option<String>,
}

pub async fn fetch_display_name(base_url: &str, user_id: &str) -> Option<String> {
    let url = format!(
        "{}/api/users/{}",
        base_url.trim_end_matches('/'),
        user_id
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
        .ok()?;

    let resp = client.get(&url).send().await.ok()?;

    if !resp.status().is_success() {
        tracing::warn!(user_id, status = %resp.status(), "display name lookup failed");
        return None;
    }

    let profile: UserProfile = resp.json().await.ok()?;
    profile.nickname
}

pub async fn display_name_or_fallback(base_url: Option<&str>, user_id: &str) -> String {
    match base_url {
        Some(base) => fetch_display_name(base, user_id)
            .await
            .unwrap_or_else(|| FALLBACK_NAME.to_string()),
        None => FALLBACK_NAME.to_string(),
    }
}
