//! Managing use cases.

use serde::Serialize;
use tessera::prelude::*;

use crate::code::ERR_CODE_101_DATA_FETCH_FAILED;
use crate::user::{self, Entity};

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ViewUserResponse {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}

impl From<Entity> for ViewUserResponse {
    fn from(entity: Entity) -> Self {
        Self {
            id: entity.id,
            first_name: entity.first_name,
            last_name: entity.last_name,
            email_address: entity.email_address,
        }
    }
}

pub async fn view_user(
    repository: Arc<Repository>,
    id: String,
    _: Headers,
) -> DomainResult<ViewUserResponse> {
    repository
        .find_by_id::<Entity>(user::COLLECTION_NAME, id)
        .await
        .map(ViewUserResponse::from)
        .map_err(|e| e.coded(ERR_CODE_101_DATA_FETCH_FAILED))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repository() -> Arc<Repository> {
        let store = InMemoryStore::new("userService");
        store
            .insert_one(
                user::COLLECTION_NAME,
                doc! {
                    "_id": "u1",
                    "firstName": "Ada",
                    "lastName": "Lovelace",
                    "emailAddress": "ada@example.com",
                },
            )
            .await
            .unwrap();
        Arc::new(Repository::new(DEFAULT_TIMEOUT, Arc::new(store)).await.unwrap())
    }

    #[tokio::test]
    async fn test_view_user() {
        let response = view_user(repository().await, "u1".to_string(), Headers::new())
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            serde_json::json!({
                "id": "u1",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "emailAddress": "ada@example.com",
            })
        );
    }

    #[tokio::test]
    async fn test_missing_user_is_coded() {
        let err = view_user(repository().await, "nobody".to_string(), Headers::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(&ERR_CODE_101_DATA_FETCH_FAILED));
        assert!(err
            .cause_as::<StoreError>()
            .is_some_and(StoreError::is_not_found));
    }
}
