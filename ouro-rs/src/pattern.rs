//! LIKE pattern compiler.
//!
//! A pattern is classified once into the cheapest matcher that decides it.
//! [`general_match`] is the reference every specialised matcher agrees with.
//!
//! ## Pattern syntax
//!
//! | Element | Matches |
//! |---------|---------|
//! | `%` | any run of characters, possibly empty |
//! | `_` | exactly one character |
//! | `#` | exactly one ASCII digit |
//! | `[abc]`, `[a-z]` | one character of the class; ranges may be reversed |
//! | `[^abc]` | one character outside the class; `[^]` matches any character |
//! | `[]` | nothing; the whole pattern is false |
//!
//! The empty pattern matches nothing, not even the empty string.
//!
//! A `[` with no `]` after it is a literal character.  Matching is
//! case-sensitive.
//!
//! ## Matchers
//!
//! | Shape | Matcher |
//! |-------|---------|
//! | empty, `%`, `%%…`, `[]…` | [`LikeMatcher::Constant`] |
//! | `abc` | [`LikeMatcher::Equals`] |
//! | `___` | [`LikeMatcher::ConstantLength`] |
//! | `%__` | [`LikeMatcher::MinLength`] |
//! | `###` | [`LikeMatcher::OnlyDigits`] |
//! | `abc%` / `%abc` / `%abc%` | `StartsWith` / `EndsWith` / `Contains` |
//! | `_abc` / `abc_` / `_abc_` | `UnderscoreStart` / `UnderscoreEnd` / `UnderscoreStartEnd` |
//! | `%abc_` / `_abc%` | `PercentUnderscore` / `UnderscorePercent` |
//! | no `%`, mixed holes or classes | [`LikeMatcher::Field`] |
//! | anything else | [`LikeMatcher::General`] |

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};

const MANY: char = '%';
const ONE: char = '_';
const DIGIT: char = '#';
const SET_START: char = '[';
const SET_END: char = ']';
const SET_NEGATION: char = '^';
const RANGE: char = '-';

// ── Character classes ────────────────────────────────────────────────────────

/// Compiled `[...]` class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    negated: bool,
    chars: Vec<char>,
    ranges: Vec<(char, char)>,
}

impl CharClass {
    /// Compile the text between `[` and `]`.
    fn parse(body: &[char]) -> Self {
        let (negated, body) = match body.first() {
            Some(&SET_NEGATION) => (true, &body[1..]),
            _ => (false, body),
        };
        let mut chars = Vec::new();
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < body.len() {
            if i + 2 < body.len() && body[i + 1] == RANGE {
                let (a, b) = (body[i], body[i + 2]);
                ranges.push(if a <= b { (a, b) } else { (b, a) });
                i += 3;
            } else {
                chars.push(body[i]);
                i += 1;
            }
        }
        CharClass { negated, chars, ranges }
    }

    pub fn contains(&self, c: char) -> bool {
        let hit = self.chars.contains(&c) || self.ranges.iter().any(|&(a, b)| a <= c && c <= b);
        hit != self.negated
    }

    /// `[]`: no character can match.
    fn is_void(&self) -> bool {
        !self.negated && self.chars.is_empty() && self.ranges.is_empty()
    }
}

// ── Pre-scan ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Many,
    One,
    Digit,
    Char(char),
    Class(CharClass),
}

/// Split a pattern into pieces.  The flag is `false` when some `[` was left
/// unclosed and therefore read literally.
fn scan(pattern: &str) -> (Vec<Piece>, bool) {
    let chars: Vec<char> = pattern.chars().collect();
    let mut pieces = Vec::with_capacity(chars.len());
    let mut closed = true;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            MANY => pieces.push(Piece::Many),
            ONE => pieces.push(Piece::One),
            DIGIT => pieces.push(Piece::Digit),
            SET_START => match chars[i + 1..].iter().position(|&x| x == SET_END) {
                Some(offset) => {
                    let end = i + 1 + offset;
                    pieces.push(Piece::Class(CharClass::parse(&chars[i + 1..end])));
                    i = end;
                }
                None => {
                    closed = false;
                    pieces.push(Piece::Char(c));
                }
            },
            _ => pieces.push(Piece::Char(c)),
        }
        i += 1;
    }
    (pieces, closed)
}

/// `false` if the pattern has a `[` that is never closed.
pub fn pattern_is_valid(pattern: &str) -> bool {
    scan(pattern).1
}

// ── General matcher ──────────────────────────────────────────────────────────

/// Backtracking matcher for any pattern.
///
/// Classes are replaced by a placeholder character during the pre-scan; the
/// side table maps each placeholder position to its compiled class.
#[derive(Debug, Clone)]
pub struct GeneralMatcher {
    pattern: Vec<char>,
    classes: HashMap<usize, CharClass>,
    /// Start of the trailing run of `%`, or `pattern.len()` when there is none.
    tail: usize,
}

impl GeneralMatcher {
    pub fn new(pattern: &str) -> Self {
        Self::from_pieces(scan(pattern).0)
    }

    fn from_pieces(pieces: Vec<Piece>) -> Self {
        let mut chars = Vec::with_capacity(pieces.len());
        let mut classes = HashMap::new();
        for piece in pieces {
            match piece {
                Piece::Many => chars.push(MANY),
                Piece::One => chars.push(ONE),
                Piece::Digit => chars.push(DIGIT),
                Piece::Char(c) => chars.push(c),
                Piece::Class(class) => {
                    classes.insert(chars.len(), class);
                    chars.push(SET_START);
                }
            }
        }
        let mut tail = chars.len();
        while tail > 0 && chars[tail - 1] == MANY && !classes.contains_key(&(tail - 1)) {
            tail -= 1;
        }
        GeneralMatcher { pattern: chars, classes, tail }
    }

    fn is_many(&self, at: usize) -> bool {
        self.pattern[at] == MANY && !self.classes.contains_key(&at)
    }

    fn matches_one(&self, at: usize, c: char) -> bool {
        if let Some(class) = self.classes.get(&at) {
            return class.contains(c);
        }
        match self.pattern[at] {
            ONE => true,
            DIGIT => c.is_ascii_digit(),
            p => p == c,
        }
    }

    pub fn is_match(&self, value: &str) -> bool {
        let text: Vec<char> = value.chars().collect();
        let plen = self.pattern.len();
        let (mut pi, mut ti) = (0, 0);
        let mut star: Option<(usize, usize)> = None;

        while ti < text.len() {
            if pi >= self.tail && self.tail < plen {
                return true;
            }
            if pi < plen && self.is_many(pi) {
                star = Some((pi, ti));
                pi += 1;
                continue;
            }
            if pi < plen && self.matches_one(pi, text[ti]) {
                pi += 1;
                ti += 1;
                continue;
            }
            match star {
                Some((sp, st)) => {
                    pi = sp + 1;
                    ti = st + 1;
                    star = Some((sp, st + 1));
                }
                None => return false,
            }
        }
        (pi..plen).all(|i| self.is_many(i))
    }
}

/// Reference matcher.
pub fn general_match(pattern: &str, value: &str) -> bool {
    !pattern.is_empty() && GeneralMatcher::new(pattern).is_match(value)
}

// ── Specialised matchers ─────────────────────────────────────────────────────

/// One position of a fixed-length pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Any,
    Digit,
    Char(char),
    Class(CharClass),
}

impl Slot {
    fn matches(&self, c: char) -> bool {
        match self {
            Slot::Any => true,
            Slot::Digit => c.is_ascii_digit(),
            Slot::Char(x) => *x == c,
            Slot::Class(class) => class.contains(c),
        }
    }
}

#[derive(Debug, Clone)]
pub enum LikeMatcher {
    Constant(bool),
    Equals(String),
    ConstantLength(usize),
    MinLength(usize),
    OnlyDigits(usize),
    StartsWith(String),
    EndsWith(String),
    Contains(AhoCorasick),
    UnderscoreStart(String),
    UnderscoreEnd(String),
    UnderscoreStartEnd(String),
    PercentUnderscore(String),
    UnderscorePercent(String),
    Field(Vec<Slot>),
    General(GeneralMatcher),
}

fn skip_first(s: &str) -> Option<&str> {
    let mut it = s.chars();
    it.next()?;
    Some(it.as_str())
}

fn drop_last(s: &str) -> Option<&str> {
    let mut it = s.chars();
    it.next_back()?;
    Some(it.as_str())
}

/// `Some(text)` when every piece is a literal character.
fn literal(pieces: &[Piece]) -> Option<String> {
    pieces
        .iter()
        .map(|p| match p {
            Piece::Char(c) => Some(*c),
            _ => None,
        })
        .collect()
}

impl LikeMatcher {
    /// Classify a pattern.
    pub fn compile(pattern: &str) -> Self {
        if pattern.is_empty() {
            return LikeMatcher::Constant(false);
        }
        let (pieces, _) = scan(pattern);
        let matcher = Self::classify(pieces);
        tracing::trace!(pattern, matcher = matcher.name(), "like pattern classified");
        matcher
    }

    /// Matcher for one segment of an asterisk path pattern, where `*` is the
    /// only wildcard.
    pub fn wildcard(segment: &str) -> Self {
        let pieces = segment
            .chars()
            .map(|c| if c == '*' { Piece::Many } else { Piece::Char(c) })
            .collect();
        Self::classify(pieces)
    }

    fn classify(raw: Vec<Piece>) -> Self {
        if raw.iter().any(|p| matches!(p, Piece::Class(c) if c.is_void())) {
            return LikeMatcher::Constant(false);
        }

        let mut pieces: Vec<Piece> = Vec::with_capacity(raw.len());
        for piece in raw {
            if piece == Piece::Many && pieces.last() == Some(&Piece::Many) {
                continue;
            }
            pieces.push(piece);
        }

        let manys = pieces.iter().filter(|p| **p == Piece::Many).count();
        if manys == 0 {
            return Self::classify_fixed(pieces);
        }

        let ones = pieces.iter().filter(|p| **p == Piece::One).count();
        if manys + ones == pieces.len() {
            return if ones == 0 {
                LikeMatcher::Constant(true)
            } else {
                LikeMatcher::MinLength(ones)
            };
        }

        if manys == 1 && pieces.len() >= 2 {
            let last = pieces.len() - 1;
            if pieces[0] == Piece::Many {
                if let Some(text) = literal(&pieces[1..]) {
                    return LikeMatcher::EndsWith(text);
                }
                if pieces[last] == Piece::One {
                    if let Some(text) = literal(&pieces[1..last]) {
                        return LikeMatcher::PercentUnderscore(text);
                    }
                }
            } else if pieces[last] == Piece::Many {
                if let Some(text) = literal(&pieces[..last]) {
                    return LikeMatcher::StartsWith(text);
                }
                if pieces[0] == Piece::One {
                    if let Some(text) = literal(&pieces[1..last]) {
                        return LikeMatcher::UnderscorePercent(text);
                    }
                }
            }
        }

        if manys == 2 && pieces.len() >= 3 {
            let last = pieces.len() - 1;
            if pieces[0] == Piece::Many && pieces[last] == Piece::Many {
                if let Some(text) = literal(&pieces[1..last]) {
                    let ac = AhoCorasickBuilder::new().build([text.as_str()]);
                    return LikeMatcher::Contains(ac);
                }
            }
        }

        LikeMatcher::General(GeneralMatcher::from_pieces(pieces))
    }

    fn classify_fixed(pieces: Vec<Piece>) -> Self {
        if let Some(text) = literal(&pieces) {
            return LikeMatcher::Equals(text);
        }
        if pieces.iter().all(|p| *p == Piece::One) {
            return LikeMatcher::ConstantLength(pieces.len());
        }
        if pieces.iter().all(|p| *p == Piece::Digit) {
            return LikeMatcher::OnlyDigits(pieces.len());
        }

        let last = pieces.len() - 1;
        let first_one = pieces[0] == Piece::One;
        let last_one = pieces[last] == Piece::One;
        if first_one && last_one && pieces.len() >= 3 {
            if let Some(text) = literal(&pieces[1..last]) {
                return LikeMatcher::UnderscoreStartEnd(text);
            }
        }
        if first_one {
            if let Some(text) = literal(&pieces[1..]) {
                return LikeMatcher::UnderscoreStart(text);
            }
        }
        if last_one {
            if let Some(text) = literal(&pieces[..last]) {
                return LikeMatcher::UnderscoreEnd(text);
            }
        }

        let slots = pieces
            .into_iter()
            .map(|p| match p {
                Piece::One => Slot::Any,
                Piece::Digit => Slot::Digit,
                Piece::Char(c) => Slot::Char(c),
                Piece::Class(class) => Slot::Class(class),
                Piece::Many => Slot::Any,
            })
            .collect();
        LikeMatcher::Field(slots)
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            LikeMatcher::Constant(b) => *b,
            LikeMatcher::Equals(text) => value == text,
            LikeMatcher::ConstantLength(n) => value.chars().count() == *n,
            LikeMatcher::MinLength(n) => value.chars().count() >= *n,
            LikeMatcher::OnlyDigits(n) => {
                value.chars().count() == *n && value.chars().all(|c| c.is_ascii_digit())
            }
            LikeMatcher::StartsWith(text) => value.starts_with(text.as_str()),
            LikeMatcher::EndsWith(text) => value.ends_with(text.as_str()),
            LikeMatcher::Contains(ac) => ac.is_match(value),
            LikeMatcher::UnderscoreStart(text) => skip_first(value) == Some(text.as_str()),
            LikeMatcher::UnderscoreEnd(text) => drop_last(value) == Some(text.as_str()),
            LikeMatcher::UnderscoreStartEnd(text) => {
                skip_first(value).and_then(drop_last) == Some(text.as_str())
            }
            LikeMatcher::PercentUnderscore(text) => {
                drop_last(value).is_some_and(|rest| rest.ends_with(text.as_str()))
            }
            LikeMatcher::UnderscorePercent(text) => {
                skip_first(value).is_some_and(|rest| rest.starts_with(text.as_str()))
            }
            LikeMatcher::Field(slots) => {
                value.chars().count() == slots.len()
                    && value.chars().zip(slots).all(|(c, slot)| slot.matches(c))
            }
            LikeMatcher::General(general) => general.is_match(value),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LikeMatcher::Constant(_) => "constant",
            LikeMatcher::Equals(_) => "equals",
            LikeMatcher::ConstantLength(_) => "constant-length",
            LikeMatcher::MinLength(_) => "min-length",
            LikeMatcher::OnlyDigits(_) => "only-digits",
            LikeMatcher::StartsWith(_) => "starts-with",
            LikeMatcher::EndsWith(_) => "ends-with",
            LikeMatcher::Contains(_) => "contains",
            LikeMatcher::UnderscoreStart(_) => "underscore-start",
            LikeMatcher::UnderscoreEnd(_) => "underscore-end",
            LikeMatcher::UnderscoreStartEnd(_) => "underscore-start-end",
            LikeMatcher::PercentUnderscore(_) => "percent-underscore",
            LikeMatcher::UnderscorePercent(_) => "underscore-percent",
            LikeMatcher::Field(_) => "field",
            LikeMatcher::General(_) => "general",
        }
    }
}

/// Compiles `pattern` and tests `value` in one call.
pub fn like(pattern: &str, value: &str) -> bool {
    LikeMatcher::compile(pattern).is_match(value)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &[(&str, &str, bool)] = &[
        ("u%", "uro", true),
        ("u%", "aro", false),
        ("_", "", false),
        ("_", "a", true),
        ("", "", false),
        ("", "a", false),
        ("%", "", true),
        ("%%%", "abc", true),
        ("[B-D]", "C", true),
        ("[B-D]", "E", false),
        ("[^B-D]", "A", true),
        ("[^B-D]", "C", false),
        ("%Uroboros.txt%", "TestUroboros.txt.img", true),
        ("%Uroboros.txt%", "Uroboros.tx", false),
        ("ta[[]##]%", "ta[21]", true),
        ("ta[[]##]%", "ta]11]ki", false),
        ("[]%", "anything", false),
        ("[]", "", false),
        ("[^]_", "aa", true),
        ("[^]_", "%", false),
        ("[^]%", "^", true),
        ("[-U]%", "U", true),
        ("[-U]%", "-x", true),
        ("_[b-d-]", "--", true),
        ("_[b-d-]", "-e", false),
        ("[e-g][u-s]", "ft", true),
        ("[e-g][u-s]", "fT", false),
        ("[-e-g]", "-", true),
        ("#[a^c]", "0^", true),
        ("#[a^c]", "0b", false),
        ("[a^b]", "^", true),
        ("]%", "]h", true),
        ("-^", "-^", true),
        ("e%57", "e557", true),
        ("e#", "e55", false),
        ("%[c-a]%", "voce", true),
        ("%[c-a]%", "xyz", false),
        ("[^b-]%", "u-train", true),
        ("[^b-]%", "-train", false),
        ("#[^o]#", "569", true),
        ("#[^o]#", "5o9", false),
        ("k%_st", "kastastast", true),
        ("%#%", "Urob7oros", true),
        ("%#%", "Uroboros", false),
        ("[0-9]#", "32", true),
        ("[abc", "[abc", true),
        ("[ab%", "[abzzz", true),
        ("_abc", "xabc", true),
        ("_abc", "abc", false),
        ("abc_", "abcd", true),
        ("_abc_", "xabcy", true),
        ("%abc_", "zzabcq", true),
        ("%abc_", "zzabc", false),
        ("_abc%", "xabcdef", true),
        ("%__", "ab", true),
        ("%__", "a", false),
        ("###", "123", true),
        ("###", "12a", false),
        ("a_#", "ax7", true),
        ("a%b%c", "aXbYc", true),
        ("a%b%c", "aXbY", false),
        ("ö_", "öx", true),
    ];

    #[test]
    fn seeded_cases() {
        for &(pattern, value, expected) in CASES {
            assert_eq!(like(pattern, value), expected, "specialised: {pattern:?} like {value:?}");
            assert_eq!(general_match(pattern, value), expected, "general: {pattern:?} like {value:?}");
        }
    }

    #[test]
    fn classification() {
        assert_eq!(LikeMatcher::compile("abc").name(), "equals");
        assert_eq!(LikeMatcher::compile("%").name(), "constant");
        assert_eq!(LikeMatcher::compile("").name(), "constant");
        assert_eq!(LikeMatcher::compile("[]x").name(), "constant");
        assert_eq!(LikeMatcher::compile("___").name(), "constant-length");
        assert_eq!(LikeMatcher::compile("%_").name(), "min-length");
        assert_eq!(LikeMatcher::compile("##").name(), "only-digits");
        assert_eq!(LikeMatcher::compile("ab%").name(), "starts-with");
        assert_eq!(LikeMatcher::compile("%ab").name(), "ends-with");
        assert_eq!(LikeMatcher::compile("%ab%").name(), "contains");
        assert_eq!(LikeMatcher::compile("_ab").name(), "underscore-start");
        assert_eq!(LikeMatcher::compile("ab_").name(), "underscore-end");
        assert_eq!(LikeMatcher::compile("_ab_").name(), "underscore-start-end");
        assert_eq!(LikeMatcher::compile("%ab_").name(), "percent-underscore");
        assert_eq!(LikeMatcher::compile("_ab%").name(), "underscore-percent");
        assert_eq!(LikeMatcher::compile("a#_[xy]").name(), "field");
        assert_eq!(LikeMatcher::compile("a%b%").name(), "general");
    }

    #[test]
    fn validity() {
        assert!(pattern_is_valid("a[bc]%"));
        assert!(pattern_is_valid("[[]"));
        assert!(pattern_is_valid("]"));
        assert!(!pattern_is_valid("a[bc"));
        assert!(!pattern_is_valid("["));
    }

    #[test]
    fn asterisk_segments() {
        let m = LikeMatcher::wildcard("*.txt");
        assert!(m.is_match("notes.txt"));
        assert!(!m.is_match("notes.txt.bak"));
        let m = LikeMatcher::wildcard("a_b*");
        assert!(m.is_match("a_bc"));
        assert!(!m.is_match("axbc"));
        assert!(LikeMatcher::wildcard("*").is_match(""));
    }

    #[test]
    fn backtracking_does_not_blow_up() {
        let text = "a".repeat(200);
        assert!(!general_match("%a%a%a%a%a%b", &text));
        assert!(general_match("%a%a%a%a%a%", &text));
    }
}
