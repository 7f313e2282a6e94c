//! User service implementation
//!
//! Profile updates for the account holder and account administration
//! (listing, role changes, removal) for admins.

use futures::future::join_all;
use tracing::debug;
use crate::database::repositories::{ContentRepository, UserRepository};
use crate::models::user::{Actor, Role, UpdateUserRequest, User, UserProfile};
use crate::services::cache::CacheService;
use crate::services::storage::StorageService;
use crate::utils::errors::{PortalError, Result};
use crate::utils::helpers::{is_valid_phone, is_valid_year, Paginated, Pagination};
use crate::utils::logging::{log_admin_action, log_user_action};

const MAX_NAME_LENGTH: usize = 100;

/// Whether `actor` may give `target` the role `new_role`
pub fn check_role_change(actor: &Actor, target: &User, new_role: Role) -> Result<()> {
    if !actor.role.includes(Role::Admin) {
        return Err(PortalError::PermissionDenied("role changes require admin".to_string()));
    }

    if actor.id == target.id {
        return Err(PortalError::PermissionDenied("cannot change your own role".to_string()));
    }

    if !actor.role.can_manage(target.role) {
        return Err(PortalError::PermissionDenied(format!(
            "{} cannot manage a {} account",
            actor.role, target.role
        )));
    }

    if !actor.role.can_grant(new_role) {
        return Err(PortalError::PermissionDenied(format!(
            "{} cannot grant {}",
            actor.role, new_role
        )));
    }

    Ok(())
}

/// Whether `actor` may delete `target`
pub fn check_delete(actor: &Actor, target: &User) -> Result<()> {
    if actor.id == target.id {
        return Err(PortalError::PermissionDenied("cannot delete your own account here".to_string()));
    }

    if !actor.role.can_manage(target.role) {
        return Err(PortalError::PermissionDenied(format!(
            "{} cannot delete a {} account",
            actor.role, target.role
        )));
    }

    Ok(())
}

fn validate_profile_update(request: &UpdateUserRequest) -> Result<UpdateUserRequest> {
    let name = match &request.name {
        Some(name) => {
            let name = name.trim();
            if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
                return Err(PortalError::InvalidInput(format!(
                    "name must be between 1 and {MAX_NAME_LENGTH} characters"
                )));
            }
            Some(name.to_string())
        }
        None => None,
    };

    if let Some(year) = request.batch_year {
        if !is_valid_year(year) {
            return Err(PortalError::InvalidInput(format!("invalid batch year {year}")));
        }
    }

    let phone = match &request.phone {
        Some(phone) if !is_valid_phone(phone) => {
            return Err(PortalError::InvalidInput("invalid phone number".to_string()));
        }
        Some(phone) => Some(phone.trim().to_string()),
        None => None,
    };

    Ok(UpdateUserRequest {
        name,
        batch_year: request.batch_year,
        phone,
    })
}

/// User service for profile and account management
#[derive(Clone)]
#[derive(Debug)]
pub struct UserService {
    users: UserRepository,
    contents: ContentRepository,
    storage: StorageService,
    cache: CacheService,
}

impl UserService {
    pub fn new(users: UserRepository, contents: ContentRepository, storage: StorageService, cache: CacheService) -> Self {
        Self {
            users,
            contents,
            storage,
            cache,
        }
    }

    async fn find(&self, user_id: i64) -> Result<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(PortalError::UserNotFound { user_id })
    }

    /// Update the caller's own profile
    pub async fn update_profile(&self, actor: &Actor, request: UpdateUserRequest) -> Result<UserProfile> {
        let request = validate_profile_update(&request)?;
        let user = self.users.update(actor.id, request).await?;

        log_user_action(actor.id, "update_profile", None);
        Ok(UserProfile::from(user))
    }

    /// Accounts for the admin listing
    pub async fn list(&self, role: Option<Role>, page: Pagination) -> Result<Paginated<UserProfile>> {
        debug!(role = ?role, page = page.page, "Listing users");
        let (users, total) = self.users.list(role, page).await?;
        Ok(Paginated::new(users, total, page).map(UserProfile::from))
    }

    /// Change another account's role
    pub async fn change_role(&self, actor: &Actor, target_id: i64, new_role: Role) -> Result<UserProfile> {
        let target = self.find(target_id).await?;
        check_role_change(actor, &target, new_role)?;

        let updated = self.users.set_role(target_id, new_role).await?;
        log_admin_action(
            actor.id,
            "change_role",
            Some(&target_id.to_string()),
            Some(&format!("{} -> {}", target.role, new_role)),
        );

        Ok(UserProfile::from(updated))
    }

    /// Delete an account and the files of its uploads
    pub async fn delete(&self, actor: &Actor, target_id: i64) -> Result<()> {
        let target = self.find(target_id).await?;
        check_delete(actor, &target)?;

        let content_ids = self.contents.ids_for_owner(target_id).await?;
        self.users.delete(target_id).await?;

        join_all(content_ids.iter().map(|id| self.storage.remove_content(*id))).await;
        if !content_ids.is_empty() {
            self.cache.invalidate_prefix("albums:").await;
        }

        log_admin_action(actor.id, "delete_user", Some(&target_id.to_string()), Some(target.role.as_str()));
        Ok(())
    }
}
