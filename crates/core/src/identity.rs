//! Stage-prefixed record identifiers (`BC001`, `DIST004`, `RET002`).
//!
//! Identifiers are assigned by counting: the next id for a stage is the
//! number of existing records of that stage plus one, zero-padded to three
//! digits. Nothing else guarantees uniqueness, so deleting and re-adding
//! records can produce a collision the store must reject.

use crate::types::Stage;

/// Minimum width of the numeric part of an identifier.
pub const SEQUENCE_WIDTH: usize = 3;

/// Next identifier for `prefix` given how many records already use it.
pub fn next_id(prefix: &str, existing: usize) -> String {
    format!("{}{:0width$}", prefix, existing + 1, width = SEQUENCE_WIDTH)
}

/// The stage an identifier belongs to, judged by its prefix.
///
/// The remainder after the prefix must be a non-empty run of ASCII digits.
pub fn stage_of(record_id: &str) -> Option<Stage> {
    Stage::ALL.into_iter().find(|stage| {
        record_id
            .strip_prefix(stage.prefix())
            .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_harvest_is_bc003() {
        assert_eq!(next_id(Stage::Harvest.prefix(), 2), "BC003");
        assert_eq!(next_id(Stage::Purchase.prefix(), 3), "DIST004");
        assert_eq!(next_id(Stage::Sale.prefix(), 1), "RET002");
        assert_eq!(next_id("BC", 0), "BC001");
    }

    #[test]
    fn sequence_grows_past_three_digits() {
        assert_eq!(next_id("RET", 999), "RET1000");
    }

    #[test]
    fn stage_from_prefix() {
        assert_eq!(stage_of("BC001"), Some(Stage::Harvest));
        assert_eq!(stage_of("DIST012"), Some(Stage::Purchase));
        assert_eq!(stage_of("RET7"), Some(Stage::Sale));
        assert_eq!(stage_of("QR001"), None);
        assert_eq!(stage_of("BC"), None);
        assert_eq!(stage_of("RET00x"), None);
    }
}
