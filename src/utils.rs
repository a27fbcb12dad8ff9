//! Small shared helpers

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, ignoring poison.
/// Organizer state is plain data; a panic elsewhere does not invalidate it.
pub trait IgnorePoison<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T>;
}

impl<T> IgnorePoison<T> for Mutex<T> {
    fn lock_ignore_poison(&self) -> MutexGuard<'_, T> {
        self.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Human-readable folder name for a path ("folder" when it has none)
pub fn folder_name(target_folder: &str) -> String {
    target_folder
        .trim_end_matches(['/', '\\'])
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("folder")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_name() {
        assert_eq!(folder_name("/Users/me/Downloads"), "Downloads");
        assert_eq!(folder_name("/Users/me/Downloads/"), "Downloads");
        assert_eq!(folder_name("C:\\Users\\me\\Desktop"), "Desktop");
        assert_eq!(folder_name("/"), "folder");
    }
}
