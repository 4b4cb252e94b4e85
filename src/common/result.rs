use crate::common::error::SyncError;

/// Result alias used across the crate.
///
/// # Examples
///
/// ```
/// use git_provider_sync::common::result::SyncResult;
/// use git_provider_sync::common::error::SyncError;
///
/// fn example_function() -> SyncResult<String> {
///     Ok("success".to_string())
/// }
///
/// fn example_with_error() -> SyncResult<()> {
///     Err(SyncError::internal_error("Something went wrong"))
/// }
/// ```
pub type SyncResult<T> = Result<T, SyncError>;

/// Conversion helpers from `Option` to [`SyncResult`].
pub trait OptionExt<T> {
    /// Convert `None` into the given error.
    fn ok_or_sync(self, error: SyncError) -> SyncResult<T>;

    /// Convert `None` into an internal error carrying `message`.
    ///
    /// ```
    /// use git_provider_sync::common::result::{SyncResult, OptionExt};
    ///
    /// let none_value: Option<String> = None;
    /// let result: SyncResult<String> = none_value.ok_or_internal_error("Value not found");
    /// assert!(result.is_err());
    /// ```
    fn ok_or_internal_error(self, message: impl Into<String>) -> SyncResult<T>;

    /// Convert `None` into a configuration error carrying `message`.
    fn ok_or_config_error(self, message: impl Into<String>) -> SyncResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_sync(self, error: SyncError) -> SyncResult<T> {
        self.ok_or(error)
    }

    fn ok_or_internal_error(self, message: impl Into<String>) -> SyncResult<T> {
        self.ok_or_else(|| SyncError::internal_error(message))
    }

    fn ok_or_config_error(self, message: impl Into<String>) -> SyncResult<T> {
        self.ok_or_else(|| SyncError::config_error(message))
    }
}
