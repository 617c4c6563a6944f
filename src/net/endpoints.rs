//! Backend paths, relative to the configured API base URL.

#[cfg(test)]
#[path = "endpoints_test.rs"]
mod endpoints_test;

/// Safe endpoint whose response sets the anti-forgery cookie.
pub const PING: &str = "ping";
pub const SIGN_IN: &str = "signin";
pub const SIGN_OUT: &str = "signout";
pub const SIGN_UP: &str = "signup";
/// Profile of the signed-in member.
pub const ME: &str = "me";
/// Profile update target; admins may name another member with `member_mid`.
pub const PROFILE: &str = "profile";
/// Sections taught by the signed-in member; non-empty means instructor.
pub const MY_PRESENTED_COURSES: &str = "my-presented-courses";

/// Admin delete for any resource: `admin/{resource}/{id}`.
#[must_use]
pub fn admin_delete_path(resource: &str, id: &str) -> String {
    format!("admin/{}/{}", resource.trim_matches('/'), id.trim_matches('/'))
}

/// `profile`, or `profile?member_mid={mid}` when editing someone else.
#[must_use]
pub fn profile_path(member_mid: Option<&str>) -> String {
    match member_mid.map(str::trim).filter(|mid| !mid.is_empty()) {
        Some(mid) => format!("{PROFILE}?member_mid={mid}"),
        None => PROFILE.to_owned(),
    }
}

/// Display form of a collection path, as used in not-found messages.
#[must_use]
pub fn display_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
