use error_stack::Report;
use uuid::Uuid;

use kernel::interface::query::{DependOnUserQuery, UserQuery};
use kernel::interface::store::{DependOnRecordStore, RecordStore};
use kernel::interface::update::{DependOnUserModifier, UserModifier};
use kernel::prelude::entity::{
    DocumentVersion, Hostel, User, UserEmail, UserId, UserName, UserRole,
};
use kernel::KernelError;

use crate::service::{is_transient, MAX_READ_ATTEMPTS};
use crate::transfer::{CreateUserDto, GetUserDto, UserDto};

/// Signup boundary: the auth layer creates the user record once the
/// account exists.
#[async_trait::async_trait]
pub trait CreateUserService<Connection: Send>:
    'static + Sync + Send + DependOnRecordStore<Connection> + DependOnUserModifier<Connection>
{
    async fn create_user(&self, dto: CreateUserDto) -> error_stack::Result<Uuid, KernelError> {
        let name = dto.name.trim();
        let email = dto.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(Report::new(KernelError::Validation));
        }
        let role = dto
            .role
            .parse::<UserRole>()
            .map_err(|()| Report::new(KernelError::Validation))?;

        let id = Uuid::new_v4();
        let user = User::new(
            UserId::new(id),
            UserName::new(name),
            UserEmail::new(email),
            role,
            dto.hostel.map(Hostel::new),
            None,
            DocumentVersion::initial(),
        );
        let mut con = self.record_store().open().await?;
        self.user_modifier().create(&mut con, &user).await?;
        Ok(id)
    }
}

impl<Connection: Send, T> CreateUserService<Connection> for T where
    T: DependOnRecordStore<Connection> + DependOnUserModifier<Connection>
{
}

#[async_trait::async_trait]
pub trait GetUserService<Connection: Send>:
    'static + Sync + Send + DependOnRecordStore<Connection> + DependOnUserQuery<Connection>
{
    async fn get_user(
        &self,
        dto: GetUserDto,
    ) -> error_stack::Result<Option<UserDto>, KernelError> {
        let mut con = self.record_store().open().await?;
        let id = UserId::new(dto.id);
        let mut attempts = 0;
        let user = loop {
            match self.user_query().find_by_id(&mut con, &id).await {
                Ok(found) => break found,
                Err(report) if is_transient(&report) && attempts + 1 < MAX_READ_ATTEMPTS => {
                    attempts += 1;
                }
                Err(report) => return Err(report),
            }
        };
        Ok(user.map(UserDto::from))
    }
}

impl<Connection: Send, T> GetUserService<Connection> for T where
    T: DependOnRecordStore<Connection> + DependOnUserQuery<Connection>
{
}

#[cfg(test)]
mod test {
    use driver::database::MemoryStore;

    use kernel::KernelError;

    use crate::service::{CreateUserService, GetUserService};
    use crate::transfer::{CreateUserDto, GetUserDto};

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = MemoryStore::new();
        let id = store
            .create_user(CreateUserDto {
                name: "Amina".into(),
                email: "amina@example.com".into(),
                role: "passenger".into(),
                hostel: Some("North".into()),
            })
            .await
            .unwrap();

        let user = store.get_user(GetUserDto { id }).await.unwrap().unwrap();
        assert_eq!(user.role, "passenger");
        assert_eq!(user.hostel.as_deref(), Some("North"));
        assert_eq!(user.joined_ride, None);
    }

    #[tokio::test]
    async fn unknown_roles_are_rejected() {
        let store = MemoryStore::new();
        let refused = store
            .create_user(CreateUserDto {
                name: "Amina".into(),
                email: "amina@example.com".into(),
                role: "admin".into(),
                hostel: None,
            })
            .await;
        assert!(matches!(
            refused.unwrap_err().current_context(),
            KernelError::Validation
        ));
    }
}
