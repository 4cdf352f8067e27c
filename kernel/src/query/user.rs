use crate::entity::{User, UserId};
use crate::KernelError;

#[async_trait::async_trait]
pub trait UserQuery<Connection: Send>: Sync + Send + 'static {
    async fn find_by_id(
        &self,
        con: &mut Connection,
        id: &UserId,
    ) -> error_stack::Result<Option<User>, KernelError>;
}

pub trait DependOnUserQuery<Connection: Send>: Sync + Send + 'static {
    type UserQuery: UserQuery<Connection>;
    fn user_query(&self) -> &Self::UserQuery;
}
