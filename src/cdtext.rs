//! CD-TEXT values as written by cdrdao: `KEYWORD "escaped text"`.
//!
//! The escape dialect is small and quirky. `\"` and `\\` escape a quote and a
//! backslash, `\ooo` is one Latin-1 byte in octal, and anything else after a
//! backslash is left alone, backslash included.

use std::collections::BTreeMap;

use core::fmt;

/// A CD-TEXT keyword.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CdTextField {
	Title,
	Performer,
	Songwriter,
	Composer,
	Arranger,
	Message,
	DiscId,
	UpcEan,
	Isrc,
	/// Any keyword we don't know about, kept verbatim.
	Other(String),
}

impl CdTextField {
	pub fn from_keyword(s: &str) -> Self {
		match s {
			"TITLE" => Self::Title,
			"PERFORMER" => Self::Performer,
			"SONGWRITER" => Self::Songwriter,
			"COMPOSER" => Self::Composer,
			"ARRANGER" => Self::Arranger,
			"MESSAGE" => Self::Message,
			"DISC_ID" => Self::DiscId,
			"UPC_EAN" => Self::UpcEan,
			"ISRC" => Self::Isrc,
			_ => Self::Other(s.to_string()),
		}
	}

	pub fn keyword(&self) -> &str {
		match self {
			Self::Title => "TITLE",
			Self::Performer => "PERFORMER",
			Self::Songwriter => "SONGWRITER",
			Self::Composer => "COMPOSER",
			Self::Arranger => "ARRANGER",
			Self::Message => "MESSAGE",
			Self::DiscId => "DISC_ID",
			Self::UpcEan => "UPC_EAN",
			Self::Isrc => "ISRC",
			Self::Other(s) => s,
		}
	}
}

impl fmt::Display for CdTextField {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.keyword())
	}
}

/// Decoded CD-TEXT for one scope (the disc or a single track).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdText {
	fields: BTreeMap<CdTextField, String>,
}

impl CdText {
	/// Inserts a value; a repeated keyword replaces the earlier value.
	pub fn insert(&mut self, field: CdTextField, value: String) -> Option<String> {
		self.fields.insert(field, value)
	}

	pub fn get(&self, field: &CdTextField) -> Option<&str> {
		self.fields.get(field).map(String::as_str)
	}

	pub fn title(&self) -> Option<&str> {
		self.get(&CdTextField::Title)
	}

	pub fn performer(&self) -> Option<&str> {
		self.get(&CdTextField::Performer)
	}

	pub fn songwriter(&self) -> Option<&str> {
		self.get(&CdTextField::Songwriter)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&CdTextField, &str)> {
		self.fields.iter().map(|(k, v)| (k, v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

/// A `KEYWORD "payload"` match at the start of some text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate<'a> {
	pub keyword: &'a str,
	/// The text between the quotes, escapes still in place.
	pub payload: &'a str,
	pub start: usize,
	/// One past the closing quote.
	pub end: usize,
}

impl Candidate<'_> {
	pub fn field(&self) -> CdTextField {
		CdTextField::from_keyword(self.keyword)
	}

	pub fn value(&self) -> String {
		decode(self.payload)
	}
}

/// Matches a bare uppercase keyword, whitespace, and a double-quoted payload
/// at the very start of `text`. Only an unescaped quote closes the payload.
pub fn extract(text: &str) -> Option<Candidate<'_>> {
	let bytes = text.as_bytes();

	let kw_end = bytes
		.iter()
		.position(|&c| !(c.is_ascii_uppercase() || c == b'_'))
		.unwrap_or(bytes.len());
	if kw_end == 0 {
		return None;
	}

	let quote = bytes[kw_end..]
		.iter()
		.position(|&c| c != b' ' && c != b'\t')
		.filter(|&n| n > 0)?
		+ kw_end;
	if bytes[quote] != b'"' {
		return None;
	}

	let payload_start = quote + 1;
	let mut i = payload_start;
	while i < bytes.len() {
		match bytes[i] {
			b'"' => {
				return Some(Candidate {
					keyword: &text[..kw_end],
					payload: &text[payload_start..i],
					start: 0,
					end: i + 1,
				})
			}
			// Whatever follows a backslash can't close the string.
			b'\\' => i += 2,
			_ => i += 1,
		}
	}

	None
}

fn octal_byte(s: &[u8]) -> Option<u8> {
	match s {
		[a @ b'0'..=b'7', b @ b'0'..=b'7', c @ b'0'..=b'7', ..] => {
			let n = u32::from(a - b'0') * 64 + u32::from(b - b'0') * 8 + u32::from(c - b'0');
			u8::try_from(n).ok()
		}
		_ => None,
	}
}

/// Decodes a raw payload. Never fails: malformed escapes pass through as-is.
pub fn decode(raw: &str) -> String {
	let bytes = raw.as_bytes();
	let mut buf = String::with_capacity(raw.len());
	let mut lit = 0;
	let mut i = 0;

	while i < bytes.len() {
		if bytes[i] != b'\\' {
			i += 1;
			continue;
		}

		buf.push_str(&raw[lit..i]);
		match bytes.get(i + 1) {
			Some(&c @ (b'"' | b'\\')) => {
				buf.push(char::from(c));
				i += 2;
			}
			_ => match octal_byte(&bytes[i + 1..]) {
				// Latin-1 maps one-to-one onto the first 256 code points.
				Some(b) => {
					buf.push(char::from(b));
					i += 4;
				}
				None => {
					buf.push('\\');
					i += 1;
				}
			},
		}
		lit = i;
	}

	buf.push_str(&raw[lit..]);
	buf
}
