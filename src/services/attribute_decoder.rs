//! Rendering of typed attribute buffers for display.
//!
//! Upstream systems store custom document properties as fixed-layout binary
//! buffers tagged with a small type code. This module turns such a buffer,
//! handed over as base64 text, into a human-readable string. Decoding is
//! presentation-only: malformed input never fails, it renders as
//! [`NULL_PLACEHOLDER`].

use crate::models::attribute::{DocumentProperty, RenderedProperty, TypedAttributeValue};
use base64::{Engine as _, engine::general_purpose};
use thiserror::Error;

/// Rendered for unknown tags and for buffers that cannot be decoded.
pub const NULL_PLACEHOLDER: &str = "<< null >>";

/// A property arrived without any buffer at all.
///
/// Callers must never pass a null value; this is reported as a fault instead
/// of being rendered as a placeholder.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("attribute value for property `{property}` is null")]
pub struct NullAttributeValue {
    pub property: String,
}

impl TypedAttributeValue {
    /// Render this value for display.
    pub fn decode(&self) -> String {
        decode_attribute(&self.value, self.tag)
    }
}

/// Decode `encoded` (base64) according to `tag`.
pub fn decode_attribute(encoded: &str, tag: i32) -> String {
    render(encoded, tag).unwrap_or_else(|| NULL_PLACEHOLDER.to_string())
}

/// Render a property row, refusing null values.
pub fn translate_property(
    property: &DocumentProperty,
) -> Result<RenderedProperty, NullAttributeValue> {
    let encoded = property.value.as_deref().ok_or_else(|| NullAttributeValue {
        property: property.name.clone(),
    })?;

    Ok(RenderedProperty {
        id: property.id,
        name: property.name.clone(),
        value: decode_attribute(encoded, property.tag),
    })
}

fn render(encoded: &str, tag: i32) -> Option<String> {
    // Tag 5 renders the code of the first character of the base64 text itself
    // (`AQ==` shows 65), matching what upstream clients already display for
    // this tag. It never depends on base64 validity.
    if tag == 5 {
        return encoded.as_bytes().first().map(|b| b.to_string());
    }

    let mut buffer = decode_base64(encoded)?;
    let value = match tag {
        0 => {
            if let Some(last) = buffer.last_mut() {
                if *last == 0x00 {
                    *last = 0x0A;
                }
            }
            String::from_utf8_lossy(&buffer).trim().to_string()
        }
        1 => read_u16(&buffer, 0)?.to_string(),
        2 => {
            if buffer.len() == 4 {
                read_u32(&buffer, 0)?.to_string()
            } else {
                read_u16(&buffer, 0)?.to_string()
            }
        }
        3 => read_u64(&buffer, 0)?.to_string(),
        12 => format!("{}/{}", read_u32(&buffer, 0)?, read_u32(&buffer, 4)?),
        13 => read_u32(&buffer, 2)?.to_string(),
        18 => format!(
            "[{},{},{},{}]",
            read_u32(&buffer, 0)?,
            read_u32(&buffer, 8)?,
            read_u32(&buffer, 16)?,
            read_u32(&buffer, 24)?
        ),
        _ => return None,
    };
    Some(value)
}

/// Padding is optional; upstream producers are not consistent about it.
fn decode_base64(encoded: &str) -> Option<Vec<u8>> {
    let trimmed = encoded.trim();
    general_purpose::STANDARD
        .decode(trimmed)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(trimmed.trim_end_matches('=')))
        .ok()
}

fn read_array<const N: usize>(buffer: &[u8], offset: usize) -> Option<[u8; N]> {
    let end = offset.checked_add(N)?;
    buffer.get(offset..end)?.try_into().ok()
}

fn read_u16(buffer: &[u8], offset: usize) -> Option<u16> {
    read_array(buffer, offset).map(u16::from_le_bytes)
}

fn read_u32(buffer: &[u8], offset: usize) -> Option<u32> {
    read_array(buffer, offset).map(u32::from_le_bytes)
}

fn read_u64(buffer: &[u8], offset: usize) -> Option<u64> {
    read_array(buffer, offset).map(u64::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    fn u32_at(values: &[(usize, u32)], len: usize) -> Vec<u8> {
        let mut buffer = vec![0u8; len];
        for (offset, value) in values {
            buffer[*offset..*offset + 4].copy_from_slice(&value.to_le_bytes());
        }
        buffer
    }

    #[test]
    fn test_u16_value() {
        assert_eq!(decode_attribute(&b64(&[0x2C, 0x01]), 1), "300");
    }

    #[test]
    fn test_u64_value() {
        assert_eq!(decode_attribute(&b64(&1u64.to_le_bytes()), 3), "1");
    }

    #[test]
    fn test_composite_key() {
        let buffer = u32_at(&[(0, 1), (8, 2), (16, 3), (24, 4)], 32);
        assert_eq!(decode_attribute(&b64(&buffer), 18), "[1,2,3,4]");
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(decode_attribute(&b64(&[1, 2, 3]), 99), NULL_PLACEHOLDER);
        assert_eq!(decode_attribute(&b64(&[1, 2, 3]), 4), NULL_PLACEHOLDER);
    }

    #[test]
    fn test_text_trailing_null_becomes_newline_and_is_trimmed() {
        assert_eq!(decode_attribute(&b64(b"  hello\0"), 0), "hello");
        assert_eq!(decode_attribute(&b64(b"a\0b"), 0), "a\0b");
        assert_eq!(decode_attribute(&b64(b""), 0), "");
    }

    #[test]
    fn test_tag_two_width_depends_on_length() {
        assert_eq!(decode_attribute(&b64(&70_000u32.to_le_bytes()), 2), "70000");
        // Not four bytes long: only the low 16 bits are read.
        assert_eq!(decode_attribute(&b64(&[0x2C, 0x01, 0xFF]), 2), "300");
    }

    #[test]
    fn test_tag_five_reads_first_byte_of_undecoded_value() {
        assert_eq!(decode_attribute("AQ==", 5), "65");
        assert_eq!(decode_attribute("", 5), NULL_PLACEHOLDER);
    }

    #[test]
    fn test_pair_and_offset_values() {
        let pair = u32_at(&[(0, 3), (4, 4)], 8);
        assert_eq!(decode_attribute(&b64(&pair), 12), "3/4");

        let offset = u32_at(&[(2, 123_456)], 6);
        assert_eq!(decode_attribute(&b64(&offset), 13), "123456");
    }

    #[test]
    fn test_short_buffers_render_placeholder() {
        assert_eq!(decode_attribute(&b64(&[0x01]), 1), NULL_PLACEHOLDER);
        assert_eq!(decode_attribute(&b64(&[0; 7]), 3), NULL_PLACEHOLDER);
        assert_eq!(decode_attribute(&b64(&[0; 7]), 12), NULL_PLACEHOLDER);
        assert_eq!(decode_attribute(&b64(&[0; 27]), 18), NULL_PLACEHOLDER);
    }

    #[test]
    fn test_invalid_base64_renders_placeholder() {
        assert_eq!(decode_attribute("!!not base64!!", 1), NULL_PLACEHOLDER);
    }

    #[test]
    fn test_missing_padding_is_accepted() {
        assert_eq!(decode_attribute("LAE", 1), "300");
    }

    #[test]
    fn test_numeric_values_round_trip() {
        for value in [0u16, 1, 300, u16::MAX] {
            let shown = decode_attribute(&b64(&value.to_le_bytes()), 1);
            assert_eq!(shown.parse::<u16>().unwrap(), value);
        }
        for value in [0u32, 65_536, u32::MAX] {
            let shown = decode_attribute(&b64(&value.to_le_bytes()), 2);
            assert_eq!(shown.parse::<u32>().unwrap(), value);
        }
        for value in [0u64, 1 << 40, u64::MAX] {
            let shown = decode_attribute(&b64(&value.to_le_bytes()), 3);
            assert_eq!(shown.parse::<u64>().unwrap(), value);
        }

        let (a, b) = (u32::MAX, 17);
        let shown = decode_attribute(&b64(&u32_at(&[(0, a), (4, b)], 8)), 12);
        let parts: Vec<u32> = shown.split('/').map(|p| p.parse().unwrap()).collect();
        assert_eq!(parts, vec![a, b]);

        let shown = decode_attribute(&b64(&u32_at(&[(2, 99_999)], 6)), 13);
        assert_eq!(shown.parse::<u32>().unwrap(), 99_999);

        let values = [7u32, u32::MAX, 0, 42];
        let buffer = u32_at(
            &[(0, values[0]), (8, values[1]), (16, values[2]), (24, values[3])],
            28,
        );
        let shown = decode_attribute(&b64(&buffer), 18);
        let parsed: Vec<u32> = shown
            .trim_matches(|c| c == '[' || c == ']')
            .split(',')
            .map(|p| p.parse().unwrap())
            .collect();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let value = TypedAttributeValue::new(12, b64(&u32_at(&[(0, 5), (4, 6)], 8)));
        assert_eq!(value.decode(), value.decode());
        assert_eq!(value.decode(), "5/6");
    }

    #[test]
    fn test_translate_property_rejects_null() {
        let property = DocumentProperty {
            id: 3,
            name: "weight".into(),
            tag: 1,
            value: None,
        };
        let err = translate_property(&property).unwrap_err();
        assert_eq!(err.property, "weight");
    }

    #[test]
    fn test_translate_property_renders_value() {
        let property = DocumentProperty {
            id: 3,
            name: "weight".into(),
            tag: 1,
            value: Some(b64(&[0x2C, 0x01])),
        };
        let rendered = translate_property(&property).unwrap();
        assert_eq!(rendered.value, "300");
        assert_eq!(rendered.id, 3);
    }
}
