//! Login rows backing the basic-auth middleware.

use sea_orm::entity::prelude::*;

/// Access level of a login.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Admin,
    Parent,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub password: String,
    pub role: String,
}

impl Model {
    /// Unknown role strings fall back to the least-privileged role.
    pub fn role(&self) -> Role {
        match self.role.as_str() {
            "admin" => Role::Admin,
            _ => Role::Parent,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Role::Admin
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> Model {
        Model {
            username: "carla".to_string(),
            password: "password".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn admin_role_is_recognized() {
        assert!(user("admin").is_admin());
        assert!(!user("parent").is_admin());
    }

    #[test]
    fn unknown_roles_default_to_parent() {
        assert_eq!(user("superuser").role(), Role::Parent);
    }
}
