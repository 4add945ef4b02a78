// src/services/category_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CategoryKind, CategoryRepository},
    models::items::{Category, CategoryPayload},
};

#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
}

impl CategoryService {
    pub fn new(category_repo: CategoryRepository) -> Self {
        Self { category_repo }
    }

    pub async fn list(&self, kind: CategoryKind, organization_id: Uuid) -> Result<Vec<Category>, AppError> {
        self.category_repo.list(kind, organization_id).await
    }

    pub async fn create(
        &self,
        kind: CategoryKind,
        organization_id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<Category, AppError> {
        payload.validate()?;
        let name = payload.name.trim();
        self.category_repo
            .create(kind, organization_id, name, payload.description.as_deref())
            .await
    }

    pub async fn update(
        &self,
        kind: CategoryKind,
        organization_id: Uuid,
        id: Uuid,
        payload: &CategoryPayload,
    ) -> Result<Category, AppError> {
        payload.validate()?;
        self.category_repo
            .update(kind, organization_id, id, payload.name.trim(), payload.description.as_deref())
            .await?
            .ok_or(AppError::CategoryNotFound)
    }

    pub async fn delete(&self, kind: CategoryKind, organization_id: Uuid, id: Uuid) -> Result<(), AppError> {
        if !self.category_repo.delete(kind, organization_id, id).await? {
            return Err(AppError::CategoryNotFound);
        }
        Ok(())
    }

    /// Garante que a categoria escolhida é da mesma empresa.
    pub async fn ensure_exists(
        &self,
        kind: CategoryKind,
        organization_id: Uuid,
        category_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        if let Some(id) = category_id {
            self.category_repo
                .find(kind, organization_id, id)
                .await?
                .ok_or(AppError::CategoryNotFound)?;
        }
        Ok(())
    }
}
