use crate::TransferError;

/// Validates an item name before it is sent to the server.
///
/// Rejects:
/// - Empty names
/// - Hidden names (leading `.`), which the server refuses to store
/// - Path separators (`/` or `\`), since an item lives directly in its share
/// - Control characters
pub fn validate_item_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty item name".into()));
    }

    if name.starts_with('.') {
        return Err(TransferError::InvalidName(format!(
            "hidden item names are not allowed: {name}"
        )));
    }

    if name.contains(['/', '\\']) {
        return Err(TransferError::InvalidName(format!(
            "path separators are not allowed: {name}"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(TransferError::InvalidName(format!(
            "control characters are not allowed: {name:?}"
        )));
    }

    Ok(())
}

/// Validates a share name: ASCII letters, digits, `_` and `-` only.
pub fn validate_share_name(name: &str) -> Result<(), TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidName("empty share name".into()));
    }

    let valid = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        return Err(TransferError::InvalidName(format!(
            "share names may only contain letters, digits, '_' and '-': {name}"
        )));
    }

    Ok(())
}
