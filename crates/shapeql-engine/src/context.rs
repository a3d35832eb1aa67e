use shapeql_schema::{NativeKind, NativeType, Reflect};
use tokio_util::sync::CancellationToken;

/// The per-operation context a resolver may take as its first parameter.
///
/// It carries the operation's cancellation token. Long-running resolvers should stop once it is
/// cancelled; their result is discarded anyway.
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
}

impl Context {
    pub fn new(token: CancellationToken) -> Self {
        Context { token }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the operation is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Reflect for Context {
    fn native_type() -> NativeType {
        NativeType::new::<Self>(None, NativeKind::Context)
    }
}
