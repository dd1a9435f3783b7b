/*!
 * Roles and permissions carried in access tokens.
 *
 * Permissions are `resource:action` strings. The `admin` role implicitly
 * holds every permission.
 */

pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const CUSTOMER: &str = "customer";
}

pub mod consts {
    pub const PRODUCTS_MANAGE: &str = "products:manage";
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const SHIPPING_MANAGE: &str = "shipping:manage";
}

/// Roles granted to an account.
pub fn roles_for(is_admin: bool) -> Vec<String> {
    if is_admin {
        vec![roles::ADMIN.to_string()]
    } else {
        vec![roles::CUSTOMER.to_string()]
    }
}

/// Explicit permissions granted to an account.
pub fn permissions_for(is_admin: bool) -> Vec<String> {
    if !is_admin {
        return Vec::new();
    }
    [
        consts::PRODUCTS_MANAGE,
        consts::ORDERS_READ,
        consts::ORDERS_UPDATE,
        consts::SHIPPING_MANAGE,
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}
