use crate::error::EngineError;

/// Check that a name is a safe SQL identifier.
///
/// Identifiers cannot be bound as parameters, so anything interpolated into
/// statement text must pass this check first: letters, digits and
/// underscores, starting with a letter or underscore.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate and backtick-quote an identifier for interpolation.
pub fn quote_ident(name: &str) -> Result<String, EngineError> {
    if !is_valid_identifier(name) {
        return Err(EngineError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{}`", name))
}
