//! Sharing permissions written as `<id>|<group>|<role>|<notify>|<link>`
//!
//! Only `<id>` is required; the remaining tokens may appear in any order:
//!
//! - `group` / `grp`: the id is a group address
//! - `owner`, `writer`, `reader`: role (default `reader`)
//! - `no` / `false`: don't notify
//! - `link`: require the link to access
//!
//! The id is an e-mail address, a domain, or `anyone`.

use crate::error::{Result, SyncError};

/// Grantee kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PermissionType {
    User,
    Group,
    Domain,
    Anyone,
}

/// Access level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    Owner,
    Writer,
    #[default]
    Reader,
}

/// A parsed sharing permission
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permission {
    /// E-mail or domain, absent for `anyone`
    pub value: Option<String>,
    pub perm_type: PermissionType,
    pub role: Role,
    pub notify: bool,
    pub with_link: bool,
}

/// Parse a permission string, see the module docs for the format
pub fn parse_permission(permission: &str) -> Result<Permission> {
    let mut tokens = permission.split('|').map(str::trim);
    let id = tokens
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SyncError::InvalidPermission(format!("'{}' has no id", permission)))?;

    let mut group = false;
    let mut parsed = Permission {
        value: None,
        perm_type: PermissionType::Anyone,
        role: Role::default(),
        notify: true,
        with_link: false,
    };

    for token in tokens {
        match token.to_ascii_lowercase().as_str() {
            "group" | "grp" => group = true,
            "owner" => parsed.role = Role::Owner,
            "writer" => parsed.role = Role::Writer,
            "reader" => parsed.role = Role::Reader,
            "no" | "false" => parsed.notify = false,
            "link" => parsed.with_link = true,
            other => {
                return Err(SyncError::InvalidPermission(format!(
                    "unknown token '{}' in '{}'",
                    other, permission
                )))
            }
        }
    }

    if !id.eq_ignore_ascii_case("anyone") {
        parsed.value = Some(id.to_string());
        parsed.perm_type = match (id.contains('@'), group) {
            (true, true) => PermissionType::Group,
            (true, false) => PermissionType::User,
            (false, _) => PermissionType::Domain,
        };
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_default_reader() {
        let p = parse_permission("someone@example.com").unwrap();
        assert_eq!(p.value.as_deref(), Some("someone@example.com"));
        assert_eq!(p.perm_type, PermissionType::User);
        assert_eq!(p.role, Role::Reader);
        assert!(p.notify);
        assert!(!p.with_link);
    }

    #[test]
    fn test_domain_owner() {
        let p = parse_permission("example.com|owner").unwrap();
        assert_eq!(p.perm_type, PermissionType::Domain);
        assert_eq!(p.role, Role::Owner);
    }

    #[test]
    fn test_anyone() {
        let p = parse_permission("anyone|writer").unwrap();
        assert_eq!(p.value, None);
        assert_eq!(p.perm_type, PermissionType::Anyone);
        assert_eq!(p.role, Role::Writer);

        let p = parse_permission("anyone|link").unwrap();
        assert!(p.with_link);
        assert_eq!(p.role, Role::Reader);
    }

    #[test]
    fn test_group_without_notification() {
        let p = parse_permission("admins@example.com|grp|owner|false|link").unwrap();
        assert_eq!(p.perm_type, PermissionType::Group);
        assert_eq!(p.role, Role::Owner);
        assert!(!p.notify);
        assert!(p.with_link);

        assert!(!parse_permission("someone@example.com|no").unwrap().notify);
    }

    #[test]
    fn test_invalid() {
        assert!(parse_permission("").is_err());
        assert!(parse_permission("someone@example.com|admin").is_err());
    }
}
