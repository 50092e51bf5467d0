//! Cache key namespace.
//!
//! These shapes are shared with every other deployment of the service that
//! reads the same store; changing one orphans existing entries.

pub fn group_by_id(id: &str) -> String {
    format!("groups:id:{id}")
}

pub fn group_by_name(name: &str) -> String {
    format!("groups:name:{name}")
}

pub fn permission_by_id(id: &str) -> String {
    format!("permission:id:{id}")
}

pub fn permission_by_name(name: &str) -> String {
    format!("permission:name:{name}")
}

pub fn user_by_id(id: &str) -> String {
    format!("users:id:{id}")
}

pub fn user_by_username(username: &str) -> String {
    format!("users:username:{username}")
}

pub fn user_by_email(email: &str) -> String {
    format!("users:email:{email}")
}

pub fn user_group(user_id: &str, group_id: &str) -> String {
    format!("user-groups:userID:{user_id}:groupID:{group_id}")
}

pub fn user_groups_of(user_id: &str) -> String {
    format!("user-groups:userID:{user_id}")
}

pub fn group_permission(group_id: &str, permission_id: &str) -> String {
    format!("group-permissions:groupID:{group_id}:permissionID:{permission_id}")
}

/// Hash bucket of permission checks for one group; field = permission name.
pub fn group_permission_bucket(group_id: &str) -> String {
    format!("user-groups:groupID:{group_id}:permissions")
}

pub fn access_token(user_id: &str, token_id: &str) -> String {
    format!("access-token:{user_id}:{token_id}")
}

pub fn refresh_token(user_id: &str, token_id: &str) -> String {
    format!("refresh-token:{user_id}:{token_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        assert_eq!(group_by_id("g1"), "groups:id:g1");
        assert_eq!(group_by_name("ADMIN"), "groups:name:ADMIN");
        assert_eq!(permission_by_id("p1"), "permission:id:p1");
        assert_eq!(permission_by_name("GROUP_READ"), "permission:name:GROUP_READ");
        assert_eq!(user_group("u1", "g1"), "user-groups:userID:u1:groupID:g1");
        assert_eq!(user_groups_of("u1"), "user-groups:userID:u1");
        assert_eq!(
            group_permission("g1", "p1"),
            "group-permissions:groupID:g1:permissionID:p1"
        );
        assert_eq!(
            group_permission_bucket("g1"),
            "user-groups:groupID:g1:permissions"
        );
        assert_eq!(access_token("u1", "t1"), "access-token:u1:t1");
        assert_eq!(refresh_token("u1", "t1"), "refresh-token:u1:t1");
        assert_eq!(user_by_email("a@b.c"), "users:email:a@b.c");
    }
}
