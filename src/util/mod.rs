//! Small helpers shared by the controllers.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

/// Wraps a future to catch panics and convert them to errors.
///
/// Spawned controller tasks run their work through this so a panic turns
/// into a failed event for the owner instead of a task that silently
/// disappears (and a controller stuck in its loading state).
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(crate) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

/// Returns true if `name` is usable as a username subject.
///
/// GitHub logins are 1-39 characters of ASCII alphanumerics and single
/// inner hyphens.
pub fn is_valid_username(name: &str) -> bool {
    if name.is_empty() || name.len() > 39 {
        return false;
    }
    if name.starts_with('-') || name.ends_with('-') || name.contains("--") {
        return false;
    }
    name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_ok() {
        let result = catch_task_panic(async { 7 }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_str_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_catch_task_panic_formatted_message() {
        let n = 3;
        let result: Result<(), String> =
            catch_task_panic(async move { panic!("bad page {}", n) }).await;
        assert_eq!(result, Err("bad page 3".to_string()));
    }

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("octocat"));
        assert!(is_valid_username("a"));
        assert!(is_valid_username("some-user-42"));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("-leading"));
        assert!(!is_valid_username("trailing-"));
        assert!(!is_valid_username("double--hyphen"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("@@@@invalid@@@@"));
        assert!(!is_valid_username(&"a".repeat(40)));
    }
}
