use serde::{Deserialize, Serialize};

/// A favorite (bookmark) kept in the flat favorites file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub title: String,
    pub uri: String,
}
