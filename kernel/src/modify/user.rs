use crate::entity::User;
use crate::KernelError;

#[async_trait::async_trait]
pub trait UserModifier<Connection: Send>: 'static + Sync + Send {
    async fn create(
        &self,
        con: &mut Connection,
        user: &User,
    ) -> error_stack::Result<(), KernelError>;

    /// Conditional write keyed on `user.version()`, same contract as
    /// [`crate::modify::RideModifier::update`].
    async fn update(
        &self,
        con: &mut Connection,
        user: &User,
    ) -> error_stack::Result<(), KernelError>;
}

pub trait DependOnUserModifier<Connection: Send>: 'static + Sync + Send {
    type UserModifier: UserModifier<Connection>;
    fn user_modifier(&self) -> &Self::UserModifier;
}
