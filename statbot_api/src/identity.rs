//! Helpers for player identifiers passed on the command line.

/// Splits `platform:identifier` into its parts.
///
/// Without a usable prefix the whole input is the identifier and
/// `default_platform` is used (falling back to `steam`). Platforms are
/// lowercased; identifiers keep their case.
pub fn split_platform_identifier(raw: &str, default_platform: &str) -> Option<(String, String)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some((platform, identifier)) = raw.split_once(':') {
        let platform = platform.trim().to_lowercase();
        let identifier = identifier.trim();
        if !platform.is_empty() && !identifier.is_empty() {
            return Some((platform, identifier.to_string()));
        }
    }
    let platform = match default_platform.trim().to_lowercase() {
        p if p.is_empty() => "steam".to_string(),
        p => p,
    };
    Some((platform, raw.to_string()))
}

/// Whether `value` has the UUID shape of a tracker network app ID.
pub fn looks_like_trn_app_id(value: &str) -> bool {
    let v = value.trim();
    v.len() == 36 && v.split('-').map(str::len).eq([8, 4, 4, 4, 12])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_platform() {
        assert_eq!(
            split_platform_identifier("Epic: Player One", "steam"),
            Some(("epic".to_string(), "Player One".to_string()))
        );
    }

    #[test]
    fn default_platform_used() {
        assert_eq!(
            split_platform_identifier("  Player ", "XBL"),
            Some(("xbl".to_string(), "Player".to_string()))
        );
        assert_eq!(
            split_platform_identifier("Player", ""),
            Some(("steam".to_string(), "Player".to_string()))
        );
    }

    #[test]
    fn dangling_colon_keeps_raw_identifier() {
        assert_eq!(
            split_platform_identifier("epic:", "steam"),
            Some(("steam".to_string(), "epic:".to_string()))
        );
    }

    #[test]
    fn empty_identifier() {
        assert_eq!(split_platform_identifier("   ", "steam"), None);
    }

    #[test]
    fn trn_app_id_shape() {
        assert!(looks_like_trn_app_id("0f8fad5b-d9cb-469f-a165-70867728950e"));
        assert!(!looks_like_trn_app_id("0f8fad5bd9cb469fa16570867728950e"));
        assert!(!looks_like_trn_app_id("0f8fad5b-d9cb-469f-a16570867728950e-"));
    }
}
