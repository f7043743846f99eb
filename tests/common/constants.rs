//! Shared constants for end-to-end tests
//!
//! When seeded users or fixture values change, update only this file.

// ============================================================================
// Seeded Users
// ============================================================================

/// Verified user present in every test server
pub const TEST_USER: &str = "testuser";
pub const TEST_EMAIL: &str = "testuser@musicverse.test";
pub const TEST_PASS: &str = "testpass123";

/// Second verified user, for ownership checks
pub const OTHER_USER: &str = "otheruser";
pub const OTHER_EMAIL: &str = "otheruser@musicverse.test";
pub const OTHER_PASS: &str = "otherpass123";

// ============================================================================
// Server Settings
// ============================================================================

pub const TEST_JWT_SECRET: &str = "e2e-tests-signing-secret";

/// Emailed links point here
pub const FRONTEND_URL: &str = "http://frontend.musicverse.test";

/// Album and cover the stub metadata provider returns for every lookup
pub const STUB_ALBUM: &str = "Stub Album";
pub const STUB_COVER_URL: &str = "https://covers.musicverse.test/stub.png";

/// A well formed id no record has
pub const MISSING_ID: &str = "ffffffffffffffffffffffffffffffff";

// ============================================================================
// Timeouts
// ============================================================================

/// Maximum time to wait for server to become ready (milliseconds)
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Interval between readiness checks (milliseconds)
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 50;

/// Timeout for individual HTTP requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;
