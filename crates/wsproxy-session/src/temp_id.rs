use std::fmt::Write as _;

/// Opaque id of a pending SMS challenge: 12 random bytes as 24 hex chars.
#[must_use]
pub fn new_temp_id() -> String {
    let bytes: [u8; 12] = rand::random();
    bytes.iter().fold(String::with_capacity(24), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_are_24_lowercase_hex_chars() {
        let id = new_temp_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn temp_ids_differ() {
        assert_ne!(new_temp_id(), new_temp_id());
    }
}
