//! CiProbe API Test Harness
//!
//! Everything around the test data core that a build server API test needs:
//! - Loads harness configuration from TOML and `CIPROBE_*` variables
//! - Talks to the server's REST API with typed, status-checked requests
//! - Wires generator and entity registry into a per-test context
//!
//! # Flow
//!
//! ```text
//! TestContext::test_data()          -> generated TestData bundle
//! TestContext::create(client, &e)   -> POST, then registry.register_entity
//! ... assertions ...
//! TestContext::teardown()           -> registry.flush() as super user
//! ```

pub mod client;
pub mod config;
pub mod context;
pub mod error;

pub use client::{ApiClient, CheckedRequester, Credentials, UncheckedRequester};
pub use config::HarnessConfig;
pub use context::TestContext;
pub use error::{E2eError, E2eResult};
