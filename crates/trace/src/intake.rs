//! How a customer supplies a lookup code.

use krishi_core::ValidationError;

use crate::error::TraceError;

/// A lookup code as entered by a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupInput {
    /// Typed by hand. Surrounding whitespace and letter case are ignored.
    Manual(String),
    /// A photo of a printed code. Decoding images is not supported.
    Image(Vec<u8>),
}

impl LookupInput {
    /// Normalize the input into a record id.
    pub fn into_code(self) -> Result<String, TraceError> {
        match self {
            LookupInput::Manual(raw) => {
                let code = raw.trim().to_ascii_uppercase();
                if code.is_empty() {
                    return Err(ValidationError::MissingField {
                        field: "lookup_code",
                    }
                    .into());
                }
                Ok(code)
            }
            LookupInput::Image(_) => Err(TraceError::ScanUnavailable),
        }
    }
}

impl From<&str> for LookupInput {
    fn from(raw: &str) -> Self {
        LookupInput::Manual(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_codes_are_trimmed_and_uppercased() {
        assert_eq!(LookupInput::from("  ret001 ").into_code().unwrap(), "RET001");
    }

    #[test]
    fn blank_code_is_rejected() {
        assert!(matches!(
            LookupInput::from("   ").into_code(),
            Err(TraceError::Validation(ValidationError::MissingField { .. }))
        ));
    }

    #[test]
    fn images_are_unavailable() {
        assert!(matches!(
            LookupInput::Image(vec![0x89, 0x50]).into_code(),
            Err(TraceError::ScanUnavailable)
        ));
    }
}
