//! Fixed role table. Anything finer-grained belongs in a policy engine.

use domains::{DomainError, DomainResult, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    AddAttachment,
    RemoveAttachment,
    AddNote,
    ViewNotes,
    /// Post a comment whose owner is someone else.
    CommentOnBehalf,
    /// Subscribe or unsubscribe users other than oneself.
    ManageSubscribers,
    RestoreTicket,
}

pub fn allows(role: Role, permission: Permission) -> bool {
    use Permission::*;
    match role {
        Role::Admin => true,
        Role::Mod => !matches!(permission, CommentOnBehalf),
        Role::Support => matches!(
            permission,
            AddAttachment | RemoveAttachment | AddNote | ViewNotes | ManageSubscribers
        ),
        Role::User => matches!(permission, AddAttachment),
    }
}

pub fn require(user: &User, permission: Permission) -> DomainResult<()> {
    if allows(user.role, permission) {
        Ok(())
    } else {
        Err(DomainError::Unauthorized(format!(
            "role '{}' may not {permission:?}",
            user.role.as_str()
        )))
    }
}
