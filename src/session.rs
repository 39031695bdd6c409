//! The session value that ties a run to its operator.
//!
//! Login, credential storage, and session lifetime belong to the hosting
//! application. The pipeline only needs to know *who owns the records it
//! produces*, so that ownership travels as an explicit value passed into
//! [`crate::process::process_documents`] instead of ambient global state.

use serde::{Deserialize, Serialize};

/// The authenticated operator a run is executed for.
///
/// Every [`crate::output::ChequeRecord`] produced by the run is tagged
/// with this session's `username`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub username: String,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}
