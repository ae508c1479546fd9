use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw width of an account address.
pub const ADDRESS_BYTES: usize = 20;
/// Width of the textual form: `0x` and two hex digits per byte.
pub const ADDRESS_HEX_LEN: usize = 2 + 2 * ADDRESS_BYTES;

/// Why a string is not an account address.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum AddressError {
    #[error("address {0:?} does not start with 0x")]
    MissingPrefix(String),
    #[error("address has {actual} characters, expected {}", ADDRESS_HEX_LEN)]
    WrongLength { actual: usize },
    #[error("address contains non-hex digits: {0}")]
    BadHex(#[from] hex::FromHexError),
}

/// Account identity as supplied by the signing provider.
///
/// Serialises to and from its `0x` string form so snapshots stay readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    /// The null address. Never a valid owner, grantee or claimant.
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    pub fn from_bytes(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        *self == Self::ZERO
    }

    /// Lowercase `0x` form.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Parse the `0x` form. Digits may be upper or lower case; surrounding
    /// whitespace is not accepted here (see [`FromStr`]).
    pub fn parse_hex(text: &str) -> Result<Self, AddressError> {
        let digits = match text.get(..2) {
            Some("0x") | Some("0X") => &text[2..],
            _ => return Err(AddressError::MissingPrefix(text.to_string())),
        };
        if text.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::WrongLength { actual: text.len() });
        }

        let mut bytes = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(digits, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s.trim())
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(bytes: [u8; ADDRESS_BYTES]) -> Self {
        Self(bytes)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_hex()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse_hex(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER_HEX: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

    #[test]
    fn test_display_matches_parsed_input() {
        let owner: Address = OWNER_HEX.parse().unwrap();
        assert_eq!(owner.to_string(), OWNER_HEX);
        assert_eq!(owner.to_hex().len(), ADDRESS_HEX_LEN);
        assert_eq!(owner.as_bytes()[0], 0x5a);
    }

    #[test]
    fn test_mixed_case_is_folded() {
        let mixed: Address = " 0X5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed ".parse().unwrap();
        assert_eq!(mixed.to_string(), OWNER_HEX);
    }

    #[test]
    fn test_rejects_malformed_text() {
        assert!(matches!(
            Address::parse_hex(&OWNER_HEX[2..]),
            Err(AddressError::MissingPrefix(_))
        ));
        assert_eq!(
            Address::parse_hex(&OWNER_HEX[..40]),
            Err(AddressError::WrongLength { actual: 40 })
        );
        let not_hex = format!("0x{}", "zz".repeat(ADDRESS_BYTES));
        assert!(matches!(
            Address::parse_hex(&not_hex),
            Err(AddressError::BadHex(_))
        ));
        // Whitespace is only trimmed by FromStr.
        assert!(Address::parse_hex(&format!(" {OWNER_HEX}")).is_err());
    }

    #[test]
    fn test_null_address() {
        assert!(Address::ZERO.is_null());
        assert!("0x0000000000000000000000000000000000000000"
            .parse::<Address>()
            .unwrap()
            .is_null());
        assert!(!Address([1u8; ADDRESS_BYTES]).is_null());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let addr = Address([7u8; ADDRESS_BYTES]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "07".repeat(ADDRESS_BYTES)));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"not-an-address\"").is_err());
    }
}
