//! Result alias shared by the quire crates.
//!
//! Each crate defines its own error enum and returns it inside a rootcause
//! [`Report`]; `?` lifts a bare enum value into a report.

pub use rootcause::Report;

/// A `Result` carrying a [`Report`] with context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct Missing;

    impl fmt::Display for Missing {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "row missing")
        }
    }

    impl std::error::Error for Missing {}

    fn lookup(found: bool) -> Result<u8, Missing> {
        if !found {
            return Err(Missing.into());
        }
        Ok(7)
    }

    #[test]
    fn context_lifts_into_report() {
        assert_eq!(lookup(true).expect("found"), 7);
        let err = lookup(false).expect_err("missing");
        assert!(err.to_string().contains("row missing"));
    }
}
