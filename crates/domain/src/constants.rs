//! Application constants
//!
//! Centralized location for protocol and storage constants used by the login
//! client and the token relay.

// Provider endpoints
pub const DEFAULT_AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com";

// Relay routes (browser-side client → trusted backend)
pub const RELAY_EXCHANGE_PATH: &str = "/api/callback";
pub const RELAY_REFRESH_PATH: &str = "/api/spotify/refresh-token";
pub const RELAY_HEALTH_PATH: &str = "/health";

// Application surfaces
pub const LOGIN_ROUTE: &str = "/login";
pub const DASHBOARD_ROUTE: &str = "/dashboard";

// Persisted client state keys
pub const ACCESS_TOKEN_KEY: &str = "spotify_access_token";
pub const REFRESH_TOKEN_KEY: &str = "spotify_refresh_token";
pub const EXPIRES_AT_KEY: &str = "spotify_expires_at";
pub const PKCE_STATE_KEY: &str = "spotify_pkce_state";
pub const CODE_VERIFIER_KEY: &str = "spotify_code_verifier";

/// Every key owned by the auth core; logout removes all of them in one write.
pub const AUTH_STORAGE_KEYS: [&str; 5] =
    [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, EXPIRES_AT_KEY, PKCE_STATE_KEY, CODE_VERIFIER_KEY];

// PKCE parameters
pub const STATE_LENGTH: usize = 16;
pub const CODE_VERIFIER_LENGTH: usize = 64;
pub const CODE_CHALLENGE_METHOD: &str = "S256";

// Token lifecycle
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RELAY_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";
pub const DEFAULT_STATE_FILE: &str = ".spoticizr/session.json";

/// Capabilities requested at login, in the order they are sent.
pub const DEFAULT_SCOPES: [&str; 12] = [
    "user-read-private",
    "user-read-email",
    "user-top-read",
    "playlist-read-private",
    "playlist-modify-private",
    "playlist-modify-public",
    "streaming",
    "user-modify-playback-state",
    "user-read-playback-state",
    "user-read-currently-playing",
    "user-read-recently-played",
    "user-library-read",
];
