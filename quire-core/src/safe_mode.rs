use std::str::FromStr;

/// Safe mode to use when processing the document. This follows from what is described in
/// <https://docs.asciidoctor.org/asciidoctor/latest/safe-modes/>.
///
/// The safe mode decides whether path resolution is jailed to the document's base
/// directory (see [`crate::Document::normalize_system_path`]).
#[derive(Debug, Clone, Default, PartialOrd, PartialEq, Eq, Copy)]
pub enum SafeMode {
    /// The `UNSAFE` safe mode level disables all security measures. Paths are
    /// resolved without a jail.
    #[default]
    Unsafe = 0,

    /// The `SAFE` safe mode level prevents access to files which reside outside of the
    /// parent directory of the source file. Paths referencing ancestors of the base
    /// directory are clamped back inside it.
    Safe,

    /// The `SERVER` safe mode level additionally prevents the document from seeing
    /// details of the host filesystem.
    Server,

    /// The `SECURE` safe mode level disallows reading files referenced by the
    /// document.
    Secure,
}

impl SafeMode {
    /// Whether paths resolved on behalf of the document must be jailed to the base
    /// directory.
    #[must_use]
    pub fn is_jailed(self) -> bool {
        self >= Self::Safe
    }
}

impl FromStr for SafeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unsafe" => Ok(Self::Unsafe),
            "safe" => Ok(Self::Safe),
            "server" => Ok(Self::Server),
            "secure" => Ok(Self::Secure),
            _ => Err(format!(
                "invalid safe mode: '{s}', expected: unsafe, safe, server, secure"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() -> Result<(), String> {
        assert_eq!(SafeMode::from_str("unsafe")?, SafeMode::Unsafe);
        assert_eq!(SafeMode::from_str("UNSAFE")?, SafeMode::Unsafe);
        assert_eq!(SafeMode::from_str("safe")?, SafeMode::Safe);
        assert_eq!(SafeMode::from_str("server")?, SafeMode::Server);
        assert_eq!(SafeMode::from_str("secure")?, SafeMode::Secure);
        assert!(SafeMode::from_str("invalid").is_err());
        Ok(())
    }

    #[test]
    fn test_jailed_from_safe_upwards() {
        assert!(!SafeMode::Unsafe.is_jailed());
        assert!(SafeMode::Safe.is_jailed());
        assert!(SafeMode::Server.is_jailed());
        assert!(SafeMode::Secure.is_jailed());
    }
}
