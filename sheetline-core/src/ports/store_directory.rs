//! Store directory port

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::Store;

/// Source of the stores an import may resolve against
///
/// Read once per import. Inactive stores are included; the resolver does
/// not filter on status.
#[async_trait]
pub trait StoreDirectory: Send + Sync {
    async fn list_stores(&self) -> Result<Vec<Store>>;
}
