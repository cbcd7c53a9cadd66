//! Pure authorization decisions. No I/O: callers fetch the resource's
//! current owner first and pass it in, never a caller-supplied claim.

/// Accusations and photos: the owner or an admin may delete.
pub fn can_delete(resource_owner: &str, requester: &str, requester_is_admin: bool) -> bool {
    requester_is_admin || resource_owner == requester
}

/// Comments: owner only. Admin override intentionally not extended here.
pub fn can_delete_comment(resource_owner: &str, requester: &str) -> bool {
    resource_owner == requester
}
