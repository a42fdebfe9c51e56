use std::future::Future;

use async_trait::async_trait;
use gateway_errors::FailureResult;
use gateway_schema::Resource;

use crate::params::ParameterSet;

/// What a handler produced; the dispatcher encodes it against the operation's
/// declared response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Resource(Resource),
    /// Items wrapped into the declared list envelope.
    Collection(Vec<Resource>),
    /// Rendered as `{}`.
    Empty,
}

#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn handle(&self, params: ParameterSet) -> FailureResult<Outcome>;
}

#[async_trait]
impl<F, Fut> OperationHandler for F
where
    F: Fn(ParameterSet) -> Fut + Send + Sync,
    Fut: Future<Output = FailureResult<Outcome>> + Send,
{
    async fn handle(&self, params: ParameterSet) -> FailureResult<Outcome> {
        (self)(params).await
    }
}
