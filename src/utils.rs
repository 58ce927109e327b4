//! # Utility Functions Module
//!
//! This module provides utility functions that reduce boilerplate when
//! building command lines for the external codec tools.

/// Converts an iterable of string-like items to `Vec<String>`.
///
/// # Example
/// ```rust,ignore
/// use crate::utils::to_string_vec;
///
/// // Instead of:
/// let args = vec!["-copy".to_string(), "none".to_string(), "-optimize".to_string()];
///
/// // You can write:
/// let args = to_string_vec(["-copy", "none", "-optimize"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for building argument vectors from items of the same type.
///
/// # Example
/// ```rust,ignore
/// let level = format!("-o{}", 2);
/// let args = args!["-quiet", level.as_str(), "-fix"];
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item),*])
    };
}
