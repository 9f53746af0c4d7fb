//! Brazilian tax-ID validation and formatting.
//!
//! Two document kinds are supported:
//!
//! - **CPF** (*Cadastro de Pessoas Físicas*): 11 digits, individual taxpayers.
//!   Consumers register with one.
//! - **CNPJ** (*Cadastro Nacional da Pessoa Jurídica*): 14 digits, businesses.
//!   Sellers register with one.
//!
//! Both end in two check digits computed from the preceding digits with a
//! weighted sum modulo 11. A number made of a single repeated digit
//! (`000.000.000-00`, `11.111.111/1111-11`, ...) is always rejected, even
//! though several of them happen to satisfy the checksum.
//!
//! The free functions are total: any input is accepted, non-digit characters
//! are dropped before checking, and malformed input yields `false` (validation)
//! or the stripped digits unchanged (formatting). Callers that need a reason
//! for the rejection use the [`Cpf`] and [`Cnpj`] newtypes instead.
//!
//! ```
//! use hoby_loop_core::document::{format_cnpj, validate_cpf};
//!
//! assert!(validate_cpf("123.456.789-09"));
//! assert!(validate_cpf("12345678909"));
//! assert!(!validate_cpf("111.111.111-11"));
//! assert_eq!(format_cnpj("11222333000181"), "11.222.333/0001-81");
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of digits in a CPF.
pub const CPF_LENGTH: usize = 11;

/// Number of digits in a CNPJ.
pub const CNPJ_LENGTH: usize = 14;

const CNPJ_FIRST_WEIGHTS: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
const CNPJ_SECOND_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

const CPF_MARKS: &[(usize, char)] = &[(3, '.'), (6, '.'), (9, '-')];
const CNPJ_MARKS: &[(usize, char)] = &[(2, '.'), (5, '.'), (8, '/'), (12, '-')];

/// Why a string was rejected as a CPF or CNPJ.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentError {
    /// Wrong number of digits after stripping punctuation.
    #[error("expected {expected} digits, found {actual}")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digits present in the input.
        actual: usize,
    },
    /// Every digit is the same.
    #[error("all digits are identical")]
    RepeatedDigits,
    /// The trailing check digits do not match the computed ones.
    #[error("check digits do not match")]
    ChecksumMismatch,
}

/// Drop every character that is not an ASCII digit.
#[must_use]
pub fn strip_non_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Validate a CPF, ignoring punctuation.
#[must_use]
pub fn validate_cpf(input: &str) -> bool {
    check_cpf(input).is_ok()
}

/// Validate a CNPJ, ignoring punctuation.
#[must_use]
pub fn validate_cnpj(input: &str) -> bool {
    check_cnpj(input).is_ok()
}

/// Format a CPF as `XXX.XXX.XXX-XX`.
///
/// Input that does not reduce to exactly 11 digits comes back stripped but
/// otherwise unchanged. No checksum validation is performed.
#[must_use]
pub fn format_cpf(input: &str) -> String {
    let digits = strip_non_digits(input);
    if digits.len() == CPF_LENGTH {
        punctuate(&digits, CPF_MARKS)
    } else {
        digits
    }
}

/// Format a CNPJ as `XX.XXX.XXX/XXXX-XX`.
///
/// Input that does not reduce to exactly 14 digits comes back stripped but
/// otherwise unchanged. No checksum validation is performed.
#[must_use]
pub fn format_cnpj(input: &str) -> String {
    let digits = strip_non_digits(input);
    if digits.len() == CNPJ_LENGTH {
        punctuate(&digits, CNPJ_MARKS)
    } else {
        digits
    }
}

/// Append the two check digits to a 9-digit CPF base.
///
/// Returns `None` when `base` does not contain exactly nine digits.
#[must_use]
pub fn complete_cpf(base: &str) -> Option<String> {
    let mut digits = digit_values(base);
    if digits.len() != CPF_LENGTH - 2 {
        return None;
    }
    let first = cpf_check_digit(&digits);
    digits.push(first);
    let second = cpf_check_digit(&digits);
    digits.push(second);
    Some(render(&digits))
}

/// Append the two check digits to a 12-digit CNPJ base.
///
/// Returns `None` when `base` does not contain exactly twelve digits.
#[must_use]
pub fn complete_cnpj(base: &str) -> Option<String> {
    let mut digits = digit_values(base);
    if digits.len() != CNPJ_LENGTH - 2 {
        return None;
    }
    let first = cnpj_check_digit(&digits, &CNPJ_FIRST_WEIGHTS);
    digits.push(first);
    let second = cnpj_check_digit(&digits, &CNPJ_SECOND_WEIGHTS);
    digits.push(second);
    Some(render(&digits))
}

fn check_cpf(input: &str) -> Result<[u32; CPF_LENGTH], DocumentError> {
    let digits = fixed_digits::<CPF_LENGTH>(input)?;
    let [.., tenth, eleventh] = digits;

    // Digit 2 is computed over the input's first ten digits, not over the
    // computed digit 1.
    let (first_nine, _) = digits.split_at(CPF_LENGTH - 2);
    let (first_ten, _) = digits.split_at(CPF_LENGTH - 1);

    if tenth == cpf_check_digit(first_nine) && eleventh == cpf_check_digit(first_ten) {
        Ok(digits)
    } else {
        Err(DocumentError::ChecksumMismatch)
    }
}

fn check_cnpj(input: &str) -> Result<[u32; CNPJ_LENGTH], DocumentError> {
    let digits = fixed_digits::<CNPJ_LENGTH>(input)?;
    let [.., thirteenth, fourteenth] = digits;

    let (first_twelve, _) = digits.split_at(CNPJ_LENGTH - 2);
    let (first_thirteen, _) = digits.split_at(CNPJ_LENGTH - 1);

    if thirteenth == cnpj_check_digit(first_twelve, &CNPJ_FIRST_WEIGHTS)
        && fourteenth == cnpj_check_digit(first_thirteen, &CNPJ_SECOND_WEIGHTS)
    {
        Ok(digits)
    } else {
        Err(DocumentError::ChecksumMismatch)
    }
}

/// Strip, then require exactly `N` digits that are not all identical.
fn fixed_digits<const N: usize>(input: &str) -> Result<[u32; N], DocumentError> {
    let values = digit_values(input);
    let actual = values.len();
    let digits = <[u32; N]>::try_from(values).map_err(|_| DocumentError::WrongLength {
        expected: N,
        actual,
    })?;

    let first = digits.first().copied();
    if digits.iter().all(|d| Some(*d) == first) {
        return Err(DocumentError::RepeatedDigits);
    }
    Ok(digits)
}

fn digit_values(input: &str) -> Vec<u32> {
    input
        .chars()
        .filter(char::is_ascii_digit)
        .filter_map(|c| c.to_digit(10))
        .collect()
}

/// CPF check digit: weights run from `len + 1` down to 2.
fn cpf_check_digit(digits: &[u32]) -> u32 {
    let sum: u32 = digits.iter().rev().zip(2..).map(|(d, w)| d * w).sum();
    let digit = (sum * 10) % 11;
    if digit == 10 { 0 } else { digit }
}

fn cnpj_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let remainder = sum % 11;
    if remainder < 2 { 0 } else { 11 - remainder }
}

fn render(digits: &[u32]) -> String {
    digits
        .iter()
        .filter_map(|d| char::from_digit(*d, 10))
        .collect()
}

fn punctuate(digits: &str, marks: &[(usize, char)]) -> String {
    let mut out = String::with_capacity(digits.len() + marks.len());
    for (i, c) in digits.chars().enumerate() {
        if let Some((_, mark)) = marks.iter().find(|(pos, _)| *pos == i) {
            out.push(*mark);
        }
        out.push(c);
    }
    out
}

/// A checksum-valid CPF, stored as its 11 digits.
///
/// Serializes in canonical punctuation and deserializes through
/// [`Cpf::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cpf(String);

impl Cpf {
    /// Parse a CPF, with or without punctuation.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] describing the first failed check.
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        check_cpf(input).map(|digits| Self(render(&digits)))
    }

    /// The bare 11 digits.
    #[must_use]
    pub fn as_digits(&self) -> &str {
        &self.0
    }

    /// `XXX.XXX.XXX-XX`.
    #[must_use]
    pub fn formatted(&self) -> String {
        punctuate(&self.0, CPF_MARKS)
    }
}

/// A checksum-valid CNPJ, stored as its 14 digits.
///
/// Serializes in canonical punctuation and deserializes through
/// [`Cnpj::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cnpj(String);

impl Cnpj {
    /// Parse a CNPJ, with or without punctuation.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentError`] describing the first failed check.
    pub fn parse(input: &str) -> Result<Self, DocumentError> {
        check_cnpj(input).map(|digits| Self(render(&digits)))
    }

    /// The bare 14 digits.
    #[must_use]
    pub fn as_digits(&self) -> &str {
        &self.0
    }

    /// `XX.XXX.XXX/XXXX-XX`.
    #[must_use]
    pub fn formatted(&self) -> String {
        punctuate(&self.0, CNPJ_MARKS)
    }
}

macro_rules! document_conversions {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.formatted())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DocumentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = DocumentError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.formatted()
            }
        }
    };
}

document_conversions!(Cpf);
document_conversions!(Cnpj);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const VALID_CPFS: &[&str] = &["123.456.789-09", "529.982.247-25", "111.444.777-35"];
    const VALID_CNPJS: &[&str] = &["11.222.333/0001-81", "11.444.777/0001-61"];

    #[test]
    fn test_reference_cpfs_validate() {
        for cpf in VALID_CPFS {
            assert!(validate_cpf(cpf), "{cpf} should be valid");
            assert!(
                validate_cpf(&strip_non_digits(cpf)),
                "{cpf} digits should be valid"
            );
        }
    }

    #[test]
    fn test_reference_cnpjs_validate() {
        for cnpj in VALID_CNPJS {
            assert!(validate_cnpj(cnpj), "{cnpj} should be valid");
            assert!(
                validate_cnpj(&strip_non_digits(cnpj)),
                "{cnpj} digits should be valid"
            );
        }
    }

    #[test]
    fn test_cpf_wrong_length() {
        assert!(!validate_cpf(""));
        assert!(!validate_cpf("1234567890"));
        assert!(!validate_cpf("123456789091"));
        assert_eq!(
            Cpf::parse("123.456"),
            Err(DocumentError::WrongLength {
                expected: 11,
                actual: 6
            })
        );
    }

    #[test]
    fn test_repeated_digits_rejected_even_with_matching_checksum() {
        // 111.111.111-11 satisfies both CPF check digits.
        assert_eq!(cpf_check_digit(&[1; 9]), 1);
        assert_eq!(cpf_check_digit(&[1; 10]), 1);
        for d in 0..=9 {
            let cpf = d.to_string().repeat(CPF_LENGTH);
            assert!(!validate_cpf(&cpf), "{cpf} must be rejected");
            let cnpj = d.to_string().repeat(CNPJ_LENGTH);
            assert!(!validate_cnpj(&cnpj), "{cnpj} must be rejected");
        }
        assert_eq!(
            Cpf::parse("111.111.111-11"),
            Err(DocumentError::RepeatedDigits)
        );
        assert_eq!(
            Cnpj::parse("00000000000000"),
            Err(DocumentError::RepeatedDigits)
        );
    }

    #[test]
    fn test_cpf_bad_check_digit() {
        assert!(!validate_cpf("123.456.789-08"));
        assert!(!validate_cpf("123.456.789-19"));
        assert_eq!(
            Cpf::parse("12345678900"),
            Err(DocumentError::ChecksumMismatch)
        );
    }

    #[test]
    fn test_cnpj_bad_check_digit() {
        assert!(!validate_cnpj("11.222.333/0001-82"));
        assert!(!validate_cnpj("11.222.333/0001-71"));
    }

    #[test]
    fn test_cpf_and_cnpj_are_not_interchangeable() {
        assert!(!validate_cnpj("123.456.789-09"));
        assert!(!validate_cpf("11.222.333/0001-81"));
    }

    #[test]
    fn test_arbitrary_bytes_are_filtered() {
        assert!(validate_cpf("CPF: 123 456 789 / 09 \u{1F600}"));
        assert!(!validate_cpf("abc"));
    }

    #[test]
    fn test_format_cpf() {
        assert_eq!(format_cpf("12345678909"), "123.456.789-09");
        assert_eq!(format_cpf("123.456.789-09"), "123.456.789-09");
        assert_eq!(format_cpf("12-34"), "1234");
    }

    #[test]
    fn test_format_cnpj() {
        assert_eq!(format_cnpj("11222333000181"), "11.222.333/0001-81");
        assert_eq!(format_cnpj("11.222.333/0001"), "112223330001");
    }

    #[test]
    fn test_complete() {
        assert_eq!(complete_cpf("123.456.789").as_deref(), Some("12345678909"));
        assert_eq!(
            complete_cnpj("11.222.333/0001").as_deref(),
            Some("11222333000181")
        );
        assert_eq!(complete_cpf("1234"), None);
        assert_eq!(complete_cnpj("1234"), None);
    }

    #[test]
    fn test_newtype_serde_uses_formatted_text() {
        let cpf: Cpf = serde_json::from_str("\"12345678909\"").unwrap();
        assert_eq!(cpf.as_digits(), "12345678909");
        assert_eq!(serde_json::to_string(&cpf).unwrap(), "\"123.456.789-09\"");

        let cnpj: Cnpj = "11.222.333/0001-81".parse().unwrap();
        assert_eq!(cnpj.to_string(), "11.222.333/0001-81");

        assert!(serde_json::from_str::<Cpf>("\"12345678900\"").is_err());
    }

    fn digit_string(len: usize) -> impl Strategy<Value = String> {
        proptest::collection::vec(0u32..10, len).prop_map(|digits| render(&digits))
    }

    fn is_repeated(s: &str) -> bool {
        s.chars().all(|c| Some(c) == s.chars().next())
    }

    fn bump_digit(s: &str, index_from_end: usize, by: u32) -> String {
        let mut digits = digit_values(s);
        let len = digits.len();
        if let Some(d) = digits.get_mut(len - 1 - index_from_end) {
            *d = (*d + by) % 10;
        }
        render(&digits)
    }

    proptest! {
        #[test]
        fn prop_completed_cpf_validates(base in digit_string(9)) {
            let cpf = complete_cpf(&base).unwrap();
            prop_assert_eq!(validate_cpf(&cpf), !is_repeated(&cpf));
        }

        #[test]
        fn prop_flipped_cpf_check_digit_fails(
            base in digit_string(9),
            which in 0usize..2,
            by in 1u32..10,
        ) {
            let cpf = complete_cpf(&base).unwrap();
            prop_assert!(!validate_cpf(&bump_digit(&cpf, which, by)));
        }

        #[test]
        fn prop_completed_cnpj_validates(base in digit_string(12)) {
            let cnpj = complete_cnpj(&base).unwrap();
            prop_assert_eq!(validate_cnpj(&cnpj), !is_repeated(&cnpj));
        }

        #[test]
        fn prop_flipped_cnpj_check_digit_fails(
            base in digit_string(12),
            which in 0usize..2,
            by in 1u32..10,
        ) {
            let cnpj = complete_cnpj(&base).unwrap();
            prop_assert!(!validate_cnpj(&bump_digit(&cnpj, which, by)));
        }

        #[test]
        fn prop_format_preserves_digits(input in ".*") {
            let digits = strip_non_digits(&input);
            prop_assert_eq!(strip_non_digits(&format_cpf(&digits)), digits.clone());
            prop_assert_eq!(strip_non_digits(&format_cnpj(&digits)), digits);
        }

        #[test]
        fn prop_punctuation_does_not_change_validity(cpf in digit_string(11), cnpj in digit_string(14)) {
            prop_assert_eq!(validate_cpf(&format_cpf(&cpf)), validate_cpf(&cpf));
            prop_assert_eq!(validate_cnpj(&format_cnpj(&cnpj)), validate_cnpj(&cnpj));
        }
    }
}
