//! Mapping between creative dimensions and the exchange's numeric size ids.

use core::fmt;

use crate::types::AdSize;

/// Numeric size identifier understood by the exchange renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeId(pub u32);

impl fmt::Display for SizeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every size the exchange can render.
pub const SIZE_TABLE: &[(AdSize, SizeId)] = &[
    (AdSize::new(728, 90), SizeId(2)),
    (AdSize::new(160, 600), SizeId(9)),
    (AdSize::new(300, 600), SizeId(10)),
    (AdSize::new(300, 250), SizeId(15)),
    (AdSize::new(320, 50), SizeId(43)),
    (AdSize::new(300, 1050), SizeId(54)),
    (AdSize::new(970, 250), SizeId(57)),
];

/// Look up the size id for a `width` x `height` creative.
///
/// Returns `None` for sizes the exchange does not know. There is no fallback
/// size: callers must treat `None` as a failure.
#[must_use]
pub fn encode(width: u32, height: u32) -> Option<SizeId> {
    let size = AdSize::new(width, height);
    SIZE_TABLE
        .iter()
        .find(|(known, _)| *known == size)
        .map(|(_, id)| *id)
}

/// Inverse of [`encode`].
#[must_use]
pub fn decode(id: SizeId) -> Option<AdSize> {
    SIZE_TABLE
        .iter()
        .find(|(_, known)| *known == id)
        .map(|(size, _)| *size)
}

/// Render the whole table for error messages, e.g. `728x90=2, 160x600=9, ...`.
#[must_use]
pub fn describe_table() -> String {
    SIZE_TABLE
        .iter()
        .map(|(size, id)| format!("{size}={id}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_sizes() {
        assert_eq!(encode(300, 250), Some(SizeId(15)));
        assert_eq!(encode(728, 90), Some(SizeId(2)));
        assert_eq!(encode(970, 250), Some(SizeId(57)));
    }

    #[test]
    fn test_encode_unknown_size_is_absent() {
        assert_eq!(encode(999, 999), None);
        assert_eq!(encode(250, 300), None, "Dimensions are not interchangeable");
    }

    #[test]
    fn test_decode_is_inverse_of_encode() {
        for (size, id) in SIZE_TABLE {
            assert_eq!(encode(size.width, size.height), Some(*id));
            assert_eq!(decode(*id), Some(*size));
        }
        assert_eq!(decode(SizeId(1)), None);
    }

    #[test]
    fn test_describe_table_lists_every_entry() {
        let table = describe_table();
        assert!(table.starts_with("728x90=2, 160x600=9"));
        assert!(table.ends_with("970x250=57"));
        assert_eq!(table.matches('=').count(), SIZE_TABLE.len());
    }
}
