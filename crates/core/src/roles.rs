//! Well-known role name constants.
//!
//! Staff roles double as the staff member's position on a project. These
//! must match the `chk_users_role` constraint in the users migration.

pub const ROLE_ADMINISTRATOR: &str = "ADMINISTRATOR";
pub const ROLE_MANAGER: &str = "MANAGER";
pub const ROLE_CONSULTANT: &str = "CONSULTANT";
pub const ROLE_DESIGNER: &str = "DESIGNER";
pub const ROLE_CONSTRUCTOR: &str = "CONSTRUCTOR";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";

/// Roles that can be assigned to a project as staff.
pub const STAFF_POSITIONS: &[&str] = &[
    ROLE_MANAGER,
    ROLE_CONSULTANT,
    ROLE_DESIGNER,
    ROLE_CONSTRUCTOR,
];

/// Whether `role` is a staff position (anything but customer and admin).
pub fn is_staff_position(role: &str) -> bool {
    STAFF_POSITIONS.contains(&role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_positions_exclude_customer_and_admin() {
        assert!(is_staff_position(ROLE_CONSTRUCTOR));
        assert!(is_staff_position(ROLE_CONSULTANT));
        assert!(!is_staff_position(ROLE_CUSTOMER));
        assert!(!is_staff_position(ROLE_ADMINISTRATOR));
    }
}
