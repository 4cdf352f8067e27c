use crate::KernelError;

/// Handle to the record store backing the `users` and `rides` collections.
///
/// The store owns all persisted state. It guarantees a single linear
/// version history per document and nothing across documents; writes that
/// protect an invariant go through the conditional updates in
/// [`crate::interface::update`].
#[async_trait::async_trait]
pub trait RecordStore<Connection: Send>: 'static + Sync + Send {
    async fn open(&self) -> error_stack::Result<Connection, KernelError>;
}

pub trait DependOnRecordStore<Connection: Send>: 'static + Sync + Send {
    type RecordStore: RecordStore<Connection>;
    fn record_store(&self) -> &Self::RecordStore;
}

impl<Connection: Send, T> DependOnRecordStore<Connection> for T
where
    T: RecordStore<Connection>,
{
    type RecordStore = T;
    fn record_store(&self) -> &Self::RecordStore {
        self
    }
}
