pub mod memory;
pub mod postgrest;
pub mod query;
pub mod surveys;

pub use query::{Filter, FilterOp, Order, Query, QueryResponse};

/// The narrow query capability the service needs from the remote store:
/// select columns, filter, order, limit and an exact row count.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    fn store_name(&self) -> &'static str;

    async fn execute(&self, query: &Query) -> anyhow::Result<QueryResponse>;
}
