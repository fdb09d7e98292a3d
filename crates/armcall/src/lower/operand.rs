//! Call-operand syntax: argument forms, address expressions and literal
//! evaluation.
//!
//! Classification of a name as local/parameter versus global happens later,
//! against the active procedure context; parsing here is purely syntactic.
//! Anything that is not a recognized bracketed form, register, string or
//! literal is a malformed operand and aborts the lowering.

use crate::arm::{MemWidth, Reg};
use crate::error::{Error, Result};

/// A 32-bit immediate together with the shape it was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImmValue {
    pub value: u32,
    /// Width of the original literal in bytes: 1, 2 or 4.
    pub width: u8,
    pub signed: bool,
}

/// A symbolic address with an optional folded adjustment
/// (`buf+4`, `table-8`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressExpr {
    pub name: String,
    pub adjust: i32,
}

/// One call argument. Every variant resolves to exactly one register-sized
/// value at the call boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Immediate(ImmValue),
    MemoryRef { expr: AddressExpr, width: MemWidth },
    AddressOf { expr: AddressExpr },
    RegisterValue { reg: Reg },
    StringLiteral { bytes: Vec<u8>, wide: bool },
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '.'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Evaluate a numeric or packed-character literal to a 32-bit immediate.
///
/// Decimal, `0x` hex, and `'..'` constants of one to four characters packed
/// little-endian are accepted.
pub fn eval_literal(text: &str) -> Result<ImmValue> {
    let t = text.trim();
    if t.is_empty() {
        return Err(Error::InvalidLiteral(text.to_string()));
    }

    if let Some(inner) = t.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        let bytes = inner.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(Error::InvalidLiteral(text.to_string()));
        }
        let mut value: u32 = 0;
        for (i, b) in bytes.iter().enumerate() {
            value |= u32::from(*b) << (8 * i);
        }
        let width = match bytes.len() {
            1 => 1,
            2 => 2,
            _ => 4,
        };
        return Ok(ImmValue {
            value,
            width,
            signed: false,
        });
    }

    let (signed, digits) = match t.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, t),
    };
    let magnitude: i64 = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| Error::InvalidLiteral(text.to_string()))?
    } else {
        digits
            .parse()
            .map_err(|_| Error::InvalidLiteral(text.to_string()))?
    };
    let value = if signed { -magnitude } else { magnitude };
    if value > i64::from(u32::MAX) || value < i64::from(i32::MIN) {
        return Err(Error::InvalidLiteral(text.to_string()));
    }
    Ok(ImmValue {
        value: value as u32,
        width: 4,
        signed,
    })
}

impl AddressExpr {
    /// Parse `name`, `name+off`, `name-off` or `name,off`.
    pub fn parse(text: &str) -> Result<Self> {
        let t = text.trim();
        let malformed = || Error::MalformedAddressExpression(text.to_string());

        let mut chars = t.char_indices();
        match chars.next() {
            Some((_, c)) if is_name_start(c) => {}
            _ => return Err(malformed()),
        }
        let split = t
            .char_indices()
            .skip(1)
            .find(|(_, c)| !is_name_char(*c))
            .map(|(i, _)| i);

        let (name, rest) = match split {
            Some(i) => t.split_at(i),
            None => (t, ""),
        };
        let rest = rest.trim();
        let adjust = if rest.is_empty() {
            0
        } else {
            let (sign, lit) = match rest.as_bytes()[0] {
                b'+' | b',' => (1i64, &rest[1..]),
                b'-' => (-1i64, &rest[1..]),
                _ => return Err(malformed()),
            };
            let imm = eval_literal(lit).map_err(|_| malformed())?;
            let magnitude = i64::from(imm.value);
            i32::try_from(sign * magnitude).map_err(|_| malformed())?
        };
        Ok(Self {
            name: name.to_string(),
            adjust,
        })
    }
}

fn parse_string(text: &str, wide: bool) -> Result<Argument> {
    let malformed = || Error::MalformedAddressExpression(text.to_string());
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(malformed)?;

    let mut decoded = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => decoded.push('\n'),
                Some('t') => decoded.push('\t'),
                Some('0') => decoded.push('\0'),
                Some('\\') => decoded.push('\\'),
                Some('"') => decoded.push('"'),
                _ => return Err(malformed()),
            }
        } else {
            decoded.push(c);
        }
    }

    let bytes = if wide {
        decoded
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect()
    } else {
        decoded.into_bytes()
    };
    Ok(Argument::StringLiteral { bytes, wide })
}

const WIDTH_KEYWORDS: [(&str, MemWidth); 5] = [
    ("sbyte", MemWidth::SByte),
    ("shword", MemWidth::SHword),
    ("byte", MemWidth::Byte),
    ("hword", MemWidth::Hword),
    ("word", MemWidth::Word),
];

impl Argument {
    /// Parse one textual call operand.
    pub fn parse(text: &str) -> Result<Self> {
        let t = text.trim();
        let malformed = || Error::MalformedAddressExpression(text.to_string());
        if t.is_empty() {
            return Err(malformed());
        }

        if t.starts_with('"') {
            return parse_string(t, false);
        }
        if let Some(rest) = t.strip_prefix('w')
            && rest.trim_start().starts_with('"')
        {
            return parse_string(rest.trim_start(), true);
        }

        if let Some(rest) = t.strip_prefix('&') {
            return Ok(Self::AddressOf {
                expr: AddressExpr::parse(rest)?,
            });
        }

        if let Some(reg) = Reg::from_name(t) {
            return Ok(Self::RegisterValue { reg });
        }

        // Width-prefixed or bare bracketed memory reference.
        let (width, rest) = WIDTH_KEYWORDS
            .iter()
            .find_map(|(kw, w)| {
                t.strip_prefix(kw)
                    .filter(|r| r.trim_start().starts_with('['))
                    .map(|r| (*w, r.trim_start()))
            })
            .unwrap_or((MemWidth::Word, t));
        if let Some(inner) = rest.strip_prefix('[') {
            let inner = inner.strip_suffix(']').ok_or_else(malformed)?;
            return Ok(Self::MemoryRef {
                expr: AddressExpr::parse(inner)?,
                width,
            });
        }
        if rest.starts_with(']') || t.contains('[') {
            return Err(malformed());
        }

        Ok(Self::Immediate(eval_literal(t)?))
    }
}
