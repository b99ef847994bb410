use std::fmt;

/// Length of a single header record.
pub const CARD_LEN: usize = 80;

/// Keywords whose cards carry free text instead of a value.
const COMMENTARY: [&str; 3] = ["COMMENT", "HISTORY", ""];

// ---------------------------------------------------------------------------
// HeaderValue – the typed value of one keyword record
// ---------------------------------------------------------------------------

/// A typed header value, mirroring the fixed-format value types of the
/// FITS standard.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    String(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
    /// Complex values are kept verbatim, e.g. `(1.0, 2.0)`.
    Complex(String),
    /// `KEY =` with an empty value field.
    Undefined,
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view. Floats with no fractional part are accepted because
    /// some writers emit `NAXIS1 = 512.0`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            HeaderValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Logical(b) => Some(*b),
            _ => None,
        }
    }

    /// Render the value field of a fixed-format card (columns 11..80).
    fn to_field(&self) -> String {
        match self {
            HeaderValue::String(s) => {
                let quoted = format!("'{:<8}'", s.replace('\'', "''"));
                format!("{quoted:<20}")
            }
            HeaderValue::Integer(i) => format!("{i:>20}"),
            HeaderValue::Float(f) => format!("{:>20}", format_float(*f)),
            HeaderValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            HeaderValue::Complex(c) => format!("{c:>20}"),
            HeaderValue::Undefined => " ".repeat(20),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::String(s) => write!(f, "{s}"),
            HeaderValue::Integer(i) => write!(f, "{i}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Complex(c) => write!(f, "{c}"),
            HeaderValue::Undefined => Ok(()),
        }
    }
}

fn format_float(v: f64) -> String {
    let s = format!("{v:?}").replace('e', "E");
    if s.contains('.') || s.contains('E') || !v.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}

// ---------------------------------------------------------------------------
// Card – one 80-column record
// ---------------------------------------------------------------------------

/// A single header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    /// `None` for commentary records (COMMENT, HISTORY, blank keyword).
    pub value: Option<HeaderValue>,
    pub comment: Option<String>,
    raw: String,
}

impl Card {
    /// Parse one 80-byte record. Non-printable bytes are replaced by spaces
    /// so the record can be sliced by column.
    pub fn parse(record: &[u8]) -> Card {
        let text: String = record
            .iter()
            .take(CARD_LEN)
            .map(|&b| {
                if (0x20..=0x7e).contains(&b) {
                    b as char
                } else {
                    ' '
                }
            })
            .collect();
        let text = format!("{text:<80}");

        let mut keyword = text[..8].trim_end().to_ascii_uppercase();
        let mut value_field = None;

        if &text[8..10] == "= " && !COMMENTARY.contains(&keyword.as_str()) {
            value_field = Some(&text[10..]);
        } else if keyword == "HIERARCH" {
            if let Some(eq) = text[8..].find('=') {
                keyword = text[8..8 + eq].trim().to_ascii_uppercase();
                value_field = Some(&text[8 + eq + 1..]);
            }
        }

        let raw = text.trim_end().to_string();
        match value_field {
            Some(field) => {
                let (value, comment) = parse_value_field(field);
                Card {
                    keyword,
                    value: Some(value),
                    comment,
                    raw,
                }
            }
            None => {
                let body = text[8..].trim();
                Card {
                    keyword,
                    value: None,
                    comment: (!body.is_empty()).then(|| body.to_string()),
                    raw,
                }
            }
        }
    }

    /// Build a valued card in fixed format.
    pub fn new(keyword: &str, value: HeaderValue, comment: Option<&str>) -> Card {
        let keyword = keyword.to_ascii_uppercase();
        let mut raw = format!("{keyword:<8}= {}", value.to_field());
        if let Some(c) = comment {
            raw.push_str(" / ");
            raw.push_str(c);
        }
        raw.truncate(CARD_LEN);
        Card {
            keyword,
            value: Some(value),
            comment: comment.map(str::to_string),
            raw: raw.trim_end().to_string(),
        }
    }

    /// Build a COMMENT / HISTORY record.
    pub fn commentary(keyword: &str, text: &str) -> Card {
        let keyword = keyword.to_ascii_uppercase();
        let mut raw = format!("{keyword:<8}{text}");
        raw.truncate(CARD_LEN);
        Card {
            keyword,
            value: None,
            comment: Some(text.to_string()),
            raw: raw.trim_end().to_string(),
        }
    }

    pub fn end() -> Card {
        Card {
            keyword: "END".to_string(),
            value: None,
            comment: None,
            raw: "END".to_string(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END" && self.value.is_none()
    }

    pub fn is_commentary(&self) -> bool {
        self.value.is_none()
    }

    /// The record as it appeared in the file, without trailing blanks.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The record padded to exactly 80 bytes.
    pub fn to_record(&self) -> [u8; CARD_LEN] {
        let mut out = [b' '; CARD_LEN];
        for (dst, src) in out.iter_mut().zip(self.raw.bytes()) {
            *dst = src;
        }
        out
    }
}

/// Split a value field into its typed value and the trailing comment.
fn parse_value_field(field: &str) -> (HeaderValue, Option<String>) {
    let trimmed = field.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        // Quoted string; '' is an escaped quote.
        let mut value = String::new();
        let mut chars = rest.char_indices().peekable();
        let mut end = rest.len();
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if matches!(chars.peek(), Some((_, '\''))) {
                    value.push('\'');
                    chars.next();
                } else {
                    end = i + 1;
                    break;
                }
            } else {
                value.push(c);
            }
        }
        let comment = split_comment(&rest[end..]);
        return (HeaderValue::String(value.trim_end().to_string()), comment);
    }

    let (value_text, comment) = match trimmed.find('/') {
        Some(idx) => (&trimmed[..idx], split_comment(&trimmed[idx..])),
        None => (trimmed, None),
    };
    let value_text = value_text.trim();

    let value = if value_text.is_empty() {
        HeaderValue::Undefined
    } else if value_text == "T" {
        HeaderValue::Logical(true)
    } else if value_text == "F" {
        HeaderValue::Logical(false)
    } else if value_text.starts_with('(') {
        HeaderValue::Complex(value_text.to_string())
    } else if let Ok(i) = value_text.parse::<i64>() {
        HeaderValue::Integer(i)
    } else if let Ok(f) = value_text.replace(['D', 'd'], "E").parse::<f64>() {
        HeaderValue::Float(f)
    } else {
        HeaderValue::String(value_text.to_string())
    };
    (value, comment)
}

fn split_comment(rest: &str) -> Option<String> {
    let rest = rest.trim_start().strip_prefix('/')?;
    let c = rest.trim();
    (!c.is_empty()).then(|| c.to_string())
}

// ---------------------------------------------------------------------------
// Header – ordered card list with keyword lookup
// ---------------------------------------------------------------------------

/// An ordered FITS header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a card, joining `CONTINUE` records onto a preceding long
    /// string that ends in `&`.
    pub fn push(&mut self, card: Card) {
        if card.keyword == "CONTINUE" {
            if let Some(HeaderValue::String(more)) = continue_value(&card) {
                if let Some(HeaderValue::String(prev)) = self
                    .cards
                    .iter_mut()
                    .rev()
                    .find(|c| !c.is_commentary())
                    .and_then(|c| c.value.as_mut())
                {
                    if let Some(stem) = prev.strip_suffix('&') {
                        *prev = format!("{stem}{more}");
                    }
                }
            }
        }
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Value of the first valued card with this keyword (case-insensitive).
    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .filter(|c| !c.is_commentary())
            .find(|c| c.keyword.eq_ignore_ascii_case(keyword))
            .and_then(|c| c.value.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn get_float(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        self.get(keyword).and_then(HeaderValue::as_bool)
    }

    /// Whole header as text, one record per line.
    pub fn dump(&self) -> String {
        let mut out = String::with_capacity(self.cards.len() * 81);
        for card in &self.cards {
            out.push_str(card.raw());
            out.push('\n');
        }
        out
    }
}

fn continue_value(card: &Card) -> Option<HeaderValue> {
    let body = card.raw().get(8..)?;
    let (value, _) = parse_value_field(body);
    Some(value)
}

impl FromIterator<Card> for Header {
    fn from_iter<I: IntoIterator<Item = Card>>(iter: I) -> Self {
        let mut header = Header::new();
        for card in iter {
            header.push(card);
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(s: &str) -> Vec<u8> {
        format!("{s:<80}").into_bytes()
    }

    #[test]
    fn parses_typed_values_and_comments() {
        let c = Card::parse(&record("BITPIX  =                  -32 / array data type"));
        assert_eq!(c.keyword, "BITPIX");
        assert_eq!(c.value, Some(HeaderValue::Integer(-32)));
        assert_eq!(c.comment.as_deref(), Some("array data type"));

        let c = Card::parse(&record("EXPTIME =                300.0"));
        assert_eq!(c.value, Some(HeaderValue::Float(300.0)));

        let c = Card::parse(&record("BSCALE  =           1.0D+00"));
        assert_eq!(c.value, Some(HeaderValue::Float(1.0)));

        let c = Card::parse(&record("SIMPLE  =                    T"));
        assert_eq!(c.value, Some(HeaderValue::Logical(true)));

        let c = Card::parse(&record("BLANKKEY="));
        assert_eq!(c.keyword, "BLANKKEY");
        assert_eq!(c.value, Some(HeaderValue::Undefined));
    }

    #[test]
    fn parses_quoted_strings_with_escapes() {
        let c = Card::parse(&record("OBJECT  = 'M31 ''core'' '     / target"));
        assert_eq!(c.value, Some(HeaderValue::String("M31 'core'".into())));
        assert_eq!(c.comment.as_deref(), Some("target"));

        let c = Card::parse(&record("TELESCOP= 'a/b     '"));
        assert_eq!(c.value, Some(HeaderValue::String("a/b".into())));
        assert_eq!(c.comment, None);
    }

    #[test]
    fn commentary_cards_are_not_looked_up() {
        let header: Header = [
            Card::parse(&record("COMMENT = not a value")),
            Card::parse(&record("HISTORY processed")),
            Card::parse(&record("OBJECT  = 'NGC 7000'")),
        ]
        .into_iter()
        .collect();

        assert!(header.get("COMMENT").is_none());
        assert!(header.get("HISTORY").is_none());
        assert_eq!(header.get_str("object"), Some("NGC 7000"));
        assert_eq!(header.len(), 3);
    }

    #[test]
    fn hierarch_keywords_keep_their_full_name() {
        let c = Card::parse(&record("HIERARCH ESO DET DIT = 2.5 / exposure"));
        assert_eq!(c.keyword, "ESO DET DIT");
        assert_eq!(c.value, Some(HeaderValue::Float(2.5)));
    }

    #[test]
    fn continue_records_extend_long_strings() {
        let header: Header = [
            Card::parse(&record("LONGSTR = 'first half&'")),
            Card::parse(&record("CONTINUE  ' second half'")),
        ]
        .into_iter()
        .collect();
        assert_eq!(header.get_str("LONGSTR"), Some("first half second half"));
    }

    #[test]
    fn built_cards_parse_back() {
        for (key, value) in [
            ("OBJECT", HeaderValue::String("Vega".into())),
            ("NAXIS1", HeaderValue::Integer(512)),
            ("EXPTIME", HeaderValue::Float(12.5)),
            ("BZERO", HeaderValue::Float(32768.0)),
            ("EXTEND", HeaderValue::Logical(false)),
        ] {
            let card = Card::new(key, value.clone(), Some("note"));
            let parsed = Card::parse(&card.to_record());
            assert_eq!(parsed.keyword, key);
            assert_eq!(parsed.value, Some(value));
            assert_eq!(parsed.comment.as_deref(), Some("note"));
        }
    }

    #[test]
    fn dump_lists_every_record() {
        let header: Header = [
            Card::new("SIMPLE", HeaderValue::Logical(true), None),
            Card::commentary("COMMENT", "hello"),
            Card::end(),
        ]
        .into_iter()
        .collect();
        let dump = header.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("SIMPLE  ="));
        assert_eq!(lines[1], "COMMENT hello");
        assert_eq!(lines[2], "END");
    }
}
