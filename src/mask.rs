//! Attribute masks: which metadata fields participate in a digest.
//!
//! A [`Mask`] pairs a 12-bit permission [`Mode`] with an [`Attr`] option
//! bitset. It has two textual encodings that round-trip losslessly: a human
//! form (`0644+ugi`) and an opaque fixed-length hex form (`a1a40103`)
//! versioned by its leading `a`.

use std::fmt;

use crate::error::MaskError;

/// Option-flag bitset with fixed, version-stable bit positions.
///
/// The `atime` and `btime` bits are reserved: they have assigned positions
/// but are never set by this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Attr(u16);

impl Attr {
    pub const UID: Attr = Attr(1 << 0);
    pub const GID: Attr = Attr(1 << 1);
    pub const ATIME: Attr = Attr(1 << 2);
    pub const MTIME: Attr = Attr(1 << 3);
    pub const CTIME: Attr = Attr(1 << 4);
    pub const BTIME: Attr = Attr(1 << 5);
    pub const SPECIAL: Attr = Attr(1 << 6);
    pub const XATTR: Attr = Attr(1 << 7);
    pub const INCLUSIVE: Attr = Attr(1 << 8);
    pub const NO_NAME: Attr = Attr(1 << 9);
    pub const NO_DATA: Attr = Attr(1 << 10);
    pub const FOLLOW: Attr = Attr(1 << 11);

    pub const EMPTY: Attr = Attr(0);

    /// Flags that require stat data from the platform.
    pub const STAT: Attr = Attr(
        Self::UID.0 | Self::GID.0 | Self::SPECIAL.0 | Self::MTIME.0 | Self::CTIME.0,
    );

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, other: Attr) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Attr) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Attr) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Attr) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// Parse the letter form, e.g. `ugi`. Duplicate letters are idempotent;
    /// unknown letters fail.
    pub fn parse(s: &str) -> Result<Attr, MaskError> {
        let mut attr = Attr::EMPTY;
        'letters: for c in s.chars() {
            for &(flag, rep) in ATTR_REP {
                if rep == c {
                    attr.insert(flag);
                    continue 'letters;
                }
            }
            return Err(MaskError::InvalidAttr(c));
        }
        Ok(attr)
    }

    /// Parse the big-endian hex form. Shorter inputs are padded to 16 bits;
    /// excess hex beyond 16 bits is ignored.
    pub fn parse_hex(s: &str) -> Result<Attr, MaskError> {
        if s.len() % 2 != 0 {
            return Err(MaskError::HexAttrLength);
        }
        let bytes = hex::decode(s).map_err(|_| MaskError::InvalidHexAttr(s.to_string()))?;
        let (hi, lo) = match bytes.len() {
            0 => (0, 0),
            1 => (0, bytes[0]),
            _ => (bytes[0], bytes[1]),
        };
        Ok(Attr(u16::from_be_bytes([hi, lo])))
    }

    pub fn hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl std::ops::BitOr for Attr {
    type Output = Attr;
    fn bitor(self, rhs: Attr) -> Attr {
        Attr(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for Attr {
    fn bitor_assign(&mut self, rhs: Attr) {
        self.0 |= rhs.0;
    }
}

/// Letter representations in canonical output order.
const ATTR_REP: &[(Attr, char)] = &[
    (Attr::UID, 'u'),
    (Attr::GID, 'g'),
    (Attr::SPECIAL, 's'),
    (Attr::MTIME, 't'),
    (Attr::CTIME, 'c'),
    (Attr::XATTR, 'x'),
    (Attr::INCLUSIVE, 'i'),
    (Attr::NO_NAME, 'n'),
    (Attr::NO_DATA, 'e'),
    (Attr::FOLLOW, 'l'),
];

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(flag, rep) in ATTR_REP {
            if self.contains(flag) {
                write!(f, "{}", rep)?;
            }
        }
        Ok(())
    }
}

/// 12-bit UNIX permission bits plus the setuid/setgid/sticky bits.
///
/// File-type bits are never stored here; they derive from the filesystem
/// entry kind and always participate in the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Mode(u16);

impl Mode {
    pub fn new(bits: u16) -> Mode {
        Mode(bits & 0o7777)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    /// Parse an octal string fitting 12 bits. Empty input is mode 0000.
    pub fn parse(s: &str) -> Result<Mode, MaskError> {
        if s.is_empty() {
            return Ok(Mode(0));
        }
        let bits =
            u16::from_str_radix(s, 8).map_err(|_| MaskError::InvalidMode(s.to_string()))?;
        if bits > 0o7777 {
            return Err(MaskError::InvalidMode(s.to_string()));
        }
        Ok(Mode(bits))
    }

    /// Parse the 3-digit big-endian hex form.
    pub fn parse_hex(s: &str) -> Result<Mode, MaskError> {
        if s.len() != 3 {
            return Err(MaskError::HexModeLength);
        }
        let bits = u16::from_str_radix(s, 16)
            .map_err(|_| MaskError::InvalidHexMode(s.to_string()))?;
        Ok(Mode(bits))
    }

    pub fn hex(self) -> String {
        format!("{:03x}", self.0)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

/// The (mode, attributes) selector applied to a checksum operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Mask {
    pub mode: Mode,
    pub attr: Attr,
}

impl Mask {
    pub fn new(mode: u16, attr: Attr) -> Mask {
        Mask {
            mode: Mode::new(mode),
            attr,
        }
    }

    /// Parse the human form: `<octal>[+letters]`. The octal part may be empty
    /// or whitespace-padded.
    pub fn parse(s: &str) -> Result<Mask, MaskError> {
        let (mode_part, attr_part) = match s.split_once('+') {
            Some((m, a)) => (m, a),
            None => (s, ""),
        };
        let mode = Mode::parse(mode_part.trim())?;
        let attr = Attr::parse(attr_part)?;
        Ok(Mask { mode, attr })
    }

    /// Parse the opaque form: `a` + 3 hex mode digits + at-least-4 hex
    /// attribute digits.
    pub fn parse_opaque(s: &str) -> Result<Mask, MaskError> {
        if s.len() < 4 {
            return Err(MaskError::TooShort);
        }
        if !s.starts_with('a') && !s.starts_with('A') {
            return Err(MaskError::InvalidCode);
        }
        let mode = Mode::parse_hex(&s[1..4])?;
        let attr = Attr::parse_hex(&s[4..])?;
        Ok(Mask { mode, attr })
    }

    /// Parse either encoding: the opaque form when it looks like one, the
    /// human form otherwise.
    pub fn parse_any(s: &str) -> Result<Mask, MaskError> {
        if s.len() == 8
            && (s.starts_with('a') || s.starts_with('A'))
            && s[1..].chars().all(|c| c.is_ascii_hexdigit())
        {
            return Mask::parse_opaque(s);
        }
        Mask::parse(s)
    }

    /// Fixed-length opaque encoding, versioned by the leading `a`.
    pub fn opaque(self) -> String {
        format!("a{}{}", self.mode.hex(), self.attr.hex())
    }
}

impl fmt::Display for Mask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attr.is_empty() {
            write!(f, "{}", self.mode)
        } else {
            write!(f, "{}+{}", self.mode, self.attr)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr_all() -> Attr {
        let mut a = Attr(Attr::FOLLOW.bits() * 2 - 1);
        a.remove(Attr::ATIME);
        a.remove(Attr::BTIME);
        a
    }

    #[test]
    fn parse_human() {
        let cases = [
            ("0777+ugstcxinel", Mask::new(0o777, attr_all())),
            ("4321+ul", Mask::new(0o4321, Attr::UID | Attr::FOLLOW)),
            ("", Mask::new(0, Attr::EMPTY)),
            ("+", Mask::new(0, Attr::EMPTY)),
            ("1", Mask::new(0o1, Attr::EMPTY)),
            ("1+", Mask::new(0o1, Attr::EMPTY)),
            ("+u", Mask::new(0, Attr::UID)),
            (" 644 +u", Mask::new(0o644, Attr::UID)),
        ];
        for (input, want) in cases {
            assert_eq!(Mask::parse(input).unwrap(), want, "input {input:?}");
        }
    }

    #[test]
    fn parse_human_rejects_unknown_letters() {
        assert_eq!(
            Mask::parse("0644+uz").unwrap_err(),
            MaskError::InvalidAttr('z')
        );
    }

    #[test]
    fn parse_human_rejects_wide_modes() {
        assert!(Mask::parse("17777").is_err());
        assert!(Mask::parse("088").is_err());
    }

    #[test]
    fn format_human() {
        let cases = [
            (Mask::new(0o777, attr_all()), "0777+ugstcxinel"),
            (Mask::new(0o4321, Attr::UID | Attr::FOLLOW), "4321+ul"),
            (Mask::new(0, Attr::EMPTY), "0000"),
            (Mask::new(0o1, Attr::EMPTY), "0001"),
            (Mask::new(0, Attr::UID), "0000+u"),
        ];
        for (mask, want) in cases {
            assert_eq!(mask.to_string(), want);
        }
    }

    #[test]
    fn parse_opaque() {
        let cases = [
            ("A1FF0FDB", Mask::new(0o777, attr_all())),
            ("a8d10801", Mask::new(0o4321, Attr::UID | Attr::FOLLOW)),
            ("a000", Mask::new(0, Attr::EMPTY)),
            ("a001", Mask::new(0o1, Attr::EMPTY)),
            ("a00001", Mask::new(0, Attr::UID)),
        ];
        for (input, want) in cases {
            assert_eq!(Mask::parse_opaque(input).unwrap(), want, "input {input:?}");
        }
    }

    #[test]
    fn parse_opaque_rejects_bad_input() {
        assert_eq!(Mask::parse_opaque("a0").unwrap_err(), MaskError::TooShort);
        assert_eq!(
            Mask::parse_opaque("b0000000").unwrap_err(),
            MaskError::InvalidCode
        );
        assert_eq!(
            Mask::parse_opaque("a000000").unwrap_err(),
            MaskError::HexAttrLength
        );
        assert!(Mask::parse_opaque("a0zz0000").is_err());
    }

    #[test]
    fn opaque_ignores_excess_attr_bits() {
        assert_eq!(
            Mask::parse_opaque("a1ff0fdb0000").unwrap(),
            Mask::new(0o777, attr_all())
        );
    }

    #[test]
    fn format_opaque() {
        let cases = [
            (Mask::new(0o777, attr_all()), "a1ff0fdb"),
            (Mask::new(0o4321, Attr::UID | Attr::FOLLOW), "a8d10801"),
            (Mask::new(0, Attr::EMPTY), "a0000000"),
            (Mask::new(0o1, Attr::EMPTY), "a0010000"),
            (Mask::new(0, Attr::UID), "a0000001"),
        ];
        for (mask, want) in cases {
            assert_eq!(mask.opaque(), want);
        }
    }

    #[test]
    fn round_trip_both_forms() {
        let masks = [
            Mask::new(0, Attr::EMPTY),
            Mask::new(0o644, Attr::INCLUSIVE),
            Mask::new(0o7777, Attr::UID | Attr::GID | Attr::XATTR | Attr::SPECIAL),
            Mask::new(0o100, Attr::NO_NAME | Attr::NO_DATA),
            Mask::new(0o777, attr_all()),
        ];
        for mask in masks {
            assert_eq!(Mask::parse(&mask.to_string()).unwrap(), mask);
            assert_eq!(Mask::parse_opaque(&mask.opaque()).unwrap(), mask);
            assert_eq!(Mask::parse_any(&mask.to_string()).unwrap(), mask);
            assert_eq!(Mask::parse_any(&mask.opaque()).unwrap(), mask);
        }
    }
}
