//! Category codes and the scoped category code table.

use texparser_stdext::collections::scopedmap::{Scope, ScopedMap};

/// Lexical category of a character.
///
/// The discriminants are the numeric codes used by `\catcode`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CatCode {
    Escape = 0,
    BeginGroup = 1,
    EndGroup = 2,
    MathShift = 3,
    AlignmentTab = 4,
    EndOfLine = 5,
    Parameter = 6,
    Superscript = 7,
    Subscript = 8,
    Ignored = 9,
    Space = 10,
    Letter = 11,
    #[default]
    Other = 12,
    Active = 13,
    Comment = 14,
    Invalid = 15,
}

/// Error returned when converting a number that is not a valid category code.
#[derive(Debug, PartialEq, Eq)]
pub struct InvalidCatCodeError(pub i64);

impl std::fmt::Display for InvalidCatCodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is not a valid category code (0..=15)", self.0)
    }
}

impl std::error::Error for InvalidCatCodeError {}

impl TryFrom<i64> for CatCode {
    type Error = InvalidCatCodeError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        use CatCode::*;
        Ok(match n {
            0 => Escape,
            1 => BeginGroup,
            2 => EndGroup,
            3 => MathShift,
            4 => AlignmentTab,
            5 => EndOfLine,
            6 => Parameter,
            7 => Superscript,
            8 => Subscript,
            9 => Ignored,
            10 => Space,
            11 => Letter,
            12 => Other,
            13 => Active,
            14 => Comment,
            15 => Invalid,
            _ => return Err(InvalidCatCodeError(n)),
        })
    }
}

impl TryFrom<u8> for CatCode {
    type Error = InvalidCatCodeError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        CatCode::try_from(n as i64)
    }
}

impl CatCode {
    /// Returns the category a character has before any assignment.
    ///
    /// This is the plain TeX assignment extended with `\r` as an end of line character
    /// and tab as a space character.
    pub fn default_for(c: char) -> CatCode {
        use CatCode::*;
        match c {
            '\\' => Escape,
            '{' => BeginGroup,
            '}' => EndGroup,
            '$' => MathShift,
            '&' => AlignmentTab,
            '\n' | '\r' => EndOfLine,
            '#' => Parameter,
            '^' => Superscript,
            '_' => Subscript,
            '\u{0}' => Ignored,
            ' ' | '\t' => Space,
            'a'..='z' | 'A'..='Z' => Letter,
            '~' => Active,
            '%' => Comment,
            '\u{7F}' => Invalid,
            _ => Other,
        }
    }

    pub fn int(self) -> u8 {
        self as u8
    }

    /// Returns the lowercase name of the category code, like `letter` or `end group`.
    pub fn name(&self) -> &'static str {
        use CatCode::*;
        match self {
            Escape => "escape",
            BeginGroup => "begin group",
            EndGroup => "end group",
            MathShift => "math shift",
            AlignmentTab => "alignment tab",
            EndOfLine => "end of line",
            Parameter => "parameter",
            Superscript => "superscript",
            Subscript => "subscript",
            Ignored => "ignored",
            Space => "space",
            Letter => "letter",
            Other => "other",
            Active => "active",
            Comment => "comment",
            Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for CatCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.int())
    }
}

/// Source of category codes for the lexer.
pub trait CatCodeFn {
    fn cat_code(&self, c: char) -> CatCode;
}

impl CatCodeFn for std::collections::HashMap<char, CatCode> {
    fn cat_code(&self, c: char) -> CatCode {
        self.get(&c).copied().unwrap_or_else(|| CatCode::default_for(c))
    }
}

/// Category code table with TeX's scoping rules.
///
/// Only assignments that differ from the defaults are stored.
#[derive(Debug, Default)]
pub struct CatCodeTable {
    assignments: ScopedMap<char, CatCode>,
}

impl CatCodeTable {
    /// Returns the current category of the character.
    #[inline]
    pub fn cat_code(&self, c: char) -> CatCode {
        match self.assignments.get(&c) {
            None => CatCode::default_for(c),
            Some(cat_code) => *cat_code,
        }
    }

    /// Assigns a category to the character.
    pub fn set(&mut self, c: char, cat_code: CatCode, scope: Scope) {
        self.assignments.insert(c, cat_code, scope);
    }

    pub(crate) fn begin_scope(&mut self) {
        self.assignments.begin_scope();
    }

    pub(crate) fn end_scope(&mut self) {
        // The engine keeps every scoped table in lockstep, so a missing scope cannot happen here.
        let _ = self.assignments.end_scope();
    }
}

impl CatCodeFn for CatCodeTable {
    #[inline]
    fn cat_code(&self, c: char) -> CatCode {
        CatCodeTable::cat_code(self, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_name_and_number() {
        assert_eq!(CatCode::EndGroup.name(), "end group");
        assert_eq!(format!("{}", CatCode::Letter), "letter (11)");
    }

    #[test]
    fn defaults_for_ascii() {
        for u in 0_u32..128 {
            let c = char::from_u32(u).unwrap();
            let want = if c.is_ascii_alphabetic() {
                CatCode::Letter
            } else {
                match c {
                    '\\' => CatCode::Escape,
                    '{' => CatCode::BeginGroup,
                    '}' => CatCode::EndGroup,
                    '$' => CatCode::MathShift,
                    '&' => CatCode::AlignmentTab,
                    '\n' | '\r' => CatCode::EndOfLine,
                    '#' => CatCode::Parameter,
                    '^' => CatCode::Superscript,
                    '_' => CatCode::Subscript,
                    '\u{0}' => CatCode::Ignored,
                    ' ' | '\t' => CatCode::Space,
                    '~' => CatCode::Active,
                    '%' => CatCode::Comment,
                    '\u{7F}' => CatCode::Invalid,
                    _ => CatCode::Other,
                }
            };
            assert_eq!(CatCodeTable::default().cat_code(c), want, "character {c:?}");
        }
    }

    #[test]
    fn non_ascii_is_other() {
        assert_eq!(CatCodeTable::default().cat_code('é'), CatCode::Other);
    }

    #[test]
    fn local_assignment_reverts() {
        let mut table = CatCodeTable::default();
        table.begin_scope();
        table.set('@', CatCode::Letter, Scope::Local);
        assert_eq!(table.cat_code('@'), CatCode::Letter);
        table.end_scope();
        assert_eq!(table.cat_code('@'), CatCode::Other);
    }

    #[test]
    fn global_assignment_persists() {
        let mut table = CatCodeTable::default();
        table.begin_scope();
        table.begin_scope();
        table.set('@', CatCode::Letter, Scope::Global);
        table.end_scope();
        table.end_scope();
        assert_eq!(table.cat_code('@'), CatCode::Letter);
    }

    #[test]
    fn try_from_rejects_reserved_values() {
        assert_eq!(CatCode::try_from(16_i64), Err(InvalidCatCodeError(16)));
        assert_eq!(CatCode::try_from(-1_i64), Err(InvalidCatCodeError(-1)));
        assert_eq!(CatCode::try_from(11_u8), Ok(CatCode::Letter));
    }
}
