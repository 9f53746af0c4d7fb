//! Validate and format Brazilian tax IDs.
//!
//! # Usage
//!
//! ```bash
//! hoby-cli document validate cpf 123.456.789-09
//! hoby-cli document format cnpj 11222333000181
//! ```

use clap::ValueEnum;

use hoby_loop_core::document::{format_cnpj, format_cpf, strip_non_digits};
use hoby_loop_core::{Cnpj, Cpf, DocumentError};

/// Which kind of tax ID an argument holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocumentKind {
    /// Individual taxpayer number (11 digits)
    Cpf,
    /// Business taxpayer number (14 digits)
    Cnpj,
}

/// Check a tax ID and describe the result.
///
/// # Errors
///
/// Returns the reason the number is invalid.
pub fn validate(kind: DocumentKind, value: &str) -> Result<String, DocumentError> {
    let formatted = match kind {
        DocumentKind::Cpf => Cpf::parse(value)?.formatted(),
        DocumentKind::Cnpj => Cnpj::parse(value)?.formatted(),
    };
    Ok(format!("{formatted} is valid"))
}

/// Punctuate a tax ID. Input of the wrong length comes back as bare digits.
#[must_use]
pub fn format(kind: DocumentKind, value: &str) -> String {
    let formatted = match kind {
        DocumentKind::Cpf => format_cpf(value),
        DocumentKind::Cnpj => format_cnpj(value),
    };
    if formatted == strip_non_digits(value) {
        tracing::warn!(?kind, "Wrong number of digits, left unformatted");
    }
    formatted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_formatted_number() {
        assert_eq!(
            validate(DocumentKind::Cpf, "12345678909").unwrap(),
            "123.456.789-09 is valid"
        );
        assert_eq!(
            validate(DocumentKind::Cnpj, "11.222.333/0001-81").unwrap(),
            "11.222.333/0001-81 is valid"
        );
    }

    #[test]
    fn test_validate_explains_failure() {
        assert_eq!(
            validate(DocumentKind::Cpf, "000.000.000-00").unwrap_err(),
            DocumentError::RepeatedDigits
        );
        assert!(matches!(
            validate(DocumentKind::Cnpj, "123").unwrap_err(),
            DocumentError::WrongLength { expected: 14, actual: 3 }
        ));
    }

    #[test]
    fn test_format() {
        assert_eq!(format(DocumentKind::Cpf, "12345678909"), "123.456.789-09");
        assert_eq!(format(DocumentKind::Cnpj, "1234"), "1234");
    }
}
