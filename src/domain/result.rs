//! Result type alias for the exporter

use super::errors::GarError;

/// Result type alias for export operations
///
/// # Examples
///
/// ```
/// use gar_export::domain::result::Result;
/// use gar_export::domain::errors::GarError;
///
/// fn failing_function() -> Result<()> {
///     Err(GarError::Validation("Invalid input".to_string()))
/// }
///
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, GarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_with_question_mark() -> Result<()> {
        fn inner() -> Result<i32> {
            Ok(42)
        }

        let value = inner()?;
        assert_eq!(value, 42);
        Ok(())
    }
}
