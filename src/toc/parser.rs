use log::{
	debug,
	warn,
};

use super::{
	error::{
		Error,
		ErrorCtx,
		ErrorKind,
		Result,
	},
	AudioSource,
	DiscType,
	Index,
	Table,
	Track,
	TrackFlags,
	TrackMode,
};
use crate::{
	cdtext::{
		self,
		CdText,
	},
	msf,
};

macro_rules! err {
	[$ln:expr, $kind:expr] => {
		Err(Error {
			line: $ln,
			kind: $kind,
		})
	};
}

const MAX_TRACKS: usize = 99;

fn next_word(s: &str) -> Option<(&str, &str)> {
	let start = s.find(|c: char| !c.is_ascii_whitespace())?;
	let s = &s[start..];
	let end = s.find(|c: char| c.is_ascii_whitespace()).unwrap_or(s.len());

	Some((&s[end..], &s[..end]))
}

/// Splits off a `//` comment that isn't inside a quoted string.
fn split_comment(line: &str) -> (&str, Option<&str>) {
	let bytes = line.as_bytes();
	let mut in_str = false;
	let mut i = 0;

	while i < bytes.len() {
		match bytes[i] {
			b'\\' if in_str => i += 1,
			b'"' => in_str = !in_str,
			b'/' if !in_str && bytes.get(i + 1) == Some(&b'/') => {
				return (&line[..i], Some(&line[i + 2..]));
			}
			_ => (),
		}
		i += 1;
	}

	(line, None)
}

/// cdrdao writes `// Track N` before every track.
fn track_hint(comment: &str) -> Option<u32> {
	let n = comment.trim().strip_prefix("Track")?;
	if !n.starts_with(|c: char| c.is_ascii_whitespace()) {
		return None;
	}
	n.trim().parse().ok()
}

/// Length of a quoted string at the start of `s`, quotes included. An
/// unterminated string runs to the end.
fn quoted_len(s: &str) -> usize {
	let bytes = s.as_bytes();
	let mut i = 1;
	while i < bytes.len() {
		match bytes[i] {
			b'"' => return i + 1,
			b'\\' => i += 2,
			_ => i += 1,
		}
	}
	s.len()
}

/// A token inside a CD-TEXT block that isn't a brace or a keyword/value pair.
fn next_token(s: &str) -> (&str, &str) {
	let end = if s.starts_with('"') {
		quoted_len(s)
	} else {
		s.find(|c: char| c.is_whitespace() || c == '{' || c == '}')
			.unwrap_or(s.len())
	};
	(&s[..end], &s[end..])
}

fn length(word: &str) -> Result<u32, ErrorKind> {
	msf::parse_sectors(word).ok_or_else(|| ErrorKind::InvalidLength(word.to_string()))
}

fn required_length(kw: &'static str, rest: &str) -> Result<u32, ErrorKind> {
	let (_, word) = next_word(rest).ok_or(ErrorKind::MissingArgument(kw))?;
	length(word)
}

fn optional_length(rest: &str) -> Result<Option<u32>, ErrorKind> {
	next_word(rest).map(|(_, word)| length(word)).transpose()
}

/// A quoted argument directly after the directive keyword.
fn quoted_arg<'a>(kw: &'static str, line: &'a str) -> Result<(String, &'a str), ErrorKind> {
	match cdtext::extract(line) {
		Some(c) => Ok((c.value(), &line[c.end..])),
		None => Err(ErrorKind::ExpectedString(kw)),
	}
}

/// Like [`quoted_arg`] but falls back to the bare next word.
fn string_arg(kw: &'static str, line: &str, rest: &str) -> Result<String, ErrorKind> {
	if let Some(c) = cdtext::extract(line) {
		return Ok(c.value());
	}

	debug!("`{kw}` value is not quoted, taking it verbatim");
	next_word(rest)
		.map(|(_, w)| w.to_string())
		.ok_or(ErrorKind::MissingArgument(kw))
}

/// One statement outside of a CD-TEXT block.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Directive<'a> {
	DiscType(DiscType),
	Catalog(String),
	Track(TrackMode),
	Copy(bool),
	PreEmphasis(bool),
	Channels(u8),
	Isrc(String),
	/// Holds whatever follows the keyword on the same line.
	CdText(&'a str),
	Silence(u32),
	File {
		name: String,
		start: u32,
		length: Option<u32>,
	},
	DataFile {
		name: String,
		length: Option<u32>,
	},
	Pregap(u32),
	Start(Option<u32>),
	Index(u32),
	Unknown(&'a str),
}

impl<'a> Directive<'a> {
	fn parse(line: &'a str) -> Result<Self, ErrorKind> {
		let Some((rest, kw)) = next_word(line) else {
			return Ok(Self::Unknown(line));
		};

		if let Some(t) = DiscType::from_keyword(kw) {
			return Ok(Self::DiscType(t));
		}

		Ok(match kw {
			"CATALOG" => Self::Catalog(string_arg("CATALOG", line, rest)?),
			"ISRC" => Self::Isrc(string_arg("ISRC", line, rest)?),
			"TRACK" => {
				let (rest, mode) = next_word(rest).ok_or(ErrorKind::MissingArgument("TRACK"))?;
				let mode = TrackMode::from_keyword(mode)
					.ok_or_else(|| ErrorKind::UnknownTrackMode(mode.to_string()))?;
				if let Some((_, sub)) = next_word(rest) {
					debug!("ignoring sub-channel mode {sub}");
				}
				Self::Track(mode)
			}
			"COPY" => Self::Copy(true),
			"PRE_EMPHASIS" => Self::PreEmphasis(true),
			"NO" => match next_word(rest) {
				Some((_, "COPY")) => Self::Copy(false),
				Some((_, "PRE_EMPHASIS")) => Self::PreEmphasis(false),
				_ => Self::Unknown(line),
			},
			"TWO_CHANNEL_AUDIO" => Self::Channels(2),
			"FOUR_CHANNEL_AUDIO" => Self::Channels(4),
			"CD_TEXT" => Self::CdText(rest),
			"SILENCE" => Self::Silence(required_length("SILENCE", rest)?),
			// `ZERO [<data mode>] <length>`
			"ZERO" => {
				let last = rest
					.split_ascii_whitespace()
					.last()
					.ok_or(ErrorKind::MissingArgument("ZERO"))?;
				Self::Silence(length(last)?)
			}
			"FILE" | "AUDIOFILE" => {
				let (name, rest) = quoted_arg("FILE", line)?;
				let (rest, start) = next_word(rest).ok_or(ErrorKind::MissingArgument("FILE"))?;
				Self::File {
					name,
					start: length(start)?,
					length: optional_length(rest)?,
				}
			}
			"DATAFILE" => {
				let (name, rest) = quoted_arg("DATAFILE", line)?;
				Self::DataFile {
					name,
					length: optional_length(rest)?,
				}
			}
			"PREGAP" => Self::Pregap(required_length("PREGAP", rest)?),
			"START" => Self::Start(optional_length(rest)?),
			"INDEX" => Self::Index(required_length("INDEX", rest)?),
			_ => Self::Unknown(line),
		})
	}

	fn keyword(&self) -> &'static str {
		match self {
			Self::DiscType(_) => "CD_DA",
			Self::Catalog(_) => "CATALOG",
			Self::Track(_) => "TRACK",
			Self::Copy(_) => "COPY",
			Self::PreEmphasis(_) => "PRE_EMPHASIS",
			Self::Channels(2) => "TWO_CHANNEL_AUDIO",
			Self::Channels(_) => "FOUR_CHANNEL_AUDIO",
			Self::Isrc(_) => "ISRC",
			Self::CdText(_) => "CD_TEXT",
			Self::Silence(_) => "SILENCE",
			Self::File { .. } => "FILE",
			Self::DataFile { .. } => "DATAFILE",
			Self::Pregap(_) => "PREGAP",
			Self::Start(_) => "START",
			Self::Index(_) => "INDEX",
			Self::Unknown(_) => "?",
		}
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Scope {
	Disc,
	Track,
}

#[derive(Debug)]
struct CdTextBlock {
	scope: Scope,
	opened_at: usize,
	opened: bool,
	depth: usize,
	text: CdText,
	/// The first language seen; later languages are skipped.
	language: Option<u32>,
	pending_language: Option<u32>,
	lang_depth: Option<usize>,
	lang_accept: bool,
}

impl CdTextBlock {
	fn new(scope: Scope, ln: usize) -> Self {
		Self {
			scope,
			opened_at: ln,
			opened: false,
			depth: 0,
			text: CdText::default(),
			language: None,
			pending_language: None,
			lang_depth: None,
			lang_accept: true,
		}
	}

	fn accepts(&self) -> bool {
		self.lang_depth.is_none() || self.lang_accept
	}

	fn enter_language(&mut self, n: u32) {
		self.lang_depth = Some(self.depth);
		self.lang_accept = match self.language {
			None => {
				self.language = Some(n);
				true
			}
			Some(l) => l == n,
		};
		if !self.lang_accept {
			debug!("skipping CD-TEXT language {n}");
		}
	}

	/// Consumes block content. Returns the text after the closing brace once
	/// the block ends.
	fn scan<'t>(&mut self, mut rest: &'t str) -> Result<Option<&'t str>, ErrorKind> {
		loop {
			rest = rest.trim_start();
			if rest.is_empty() {
				return Ok(None);
			}

			if let Some(r) = rest.strip_prefix('{') {
				self.opened = true;
				self.depth += 1;
				if let Some(n) = self.pending_language.take() {
					self.enter_language(n);
				}
				rest = r;
				continue;
			}

			if !self.opened {
				return Err(ErrorKind::MissingArgument("CD_TEXT"));
			}

			if let Some(r) = rest.strip_prefix('}') {
				if self.lang_depth == Some(self.depth) {
					self.lang_depth = None;
				}
				self.depth -= 1;
				if self.depth == 0 {
					return Ok(Some(r));
				}
				rest = r;
				continue;
			}

			if let Some(c) = cdtext::extract(rest) {
				self.pending_language = None;
				if self.accepts() {
					let field = c.field();
					if self.text.insert(field.clone(), c.value()).is_some() {
						debug!("CD-TEXT {field} given twice, keeping the last value");
					}
				}
				rest = &rest[c.end..];
				continue;
			}

			let (tok, r) = next_token(rest);
			rest = r;
			if tok == "LANGUAGE" {
				let (num, r) = next_token(rest.trim_start());
				if let Ok(n) = num.parse() {
					self.pending_language = Some(n);
					rest = r;
				}
			} else {
				debug!("skipping CD-TEXT token {tok}");
			}
		}
	}
}

#[derive(Debug)]
struct TrackBuilder {
	line: usize,
	number: u8,
	mode: TrackMode,
	first: u32,
	flags: TrackFlags,
	isrc: Option<String>,
	cdtext: Option<CdText>,
	source: Option<AudioSource>,
	length: u32,
	length_known: bool,
	has_data: bool,
	start: Option<u32>,
	// (line, offset relative to index 1)
	indices: Vec<(usize, u32)>,
}

impl TrackBuilder {
	fn grow(&mut self, n: u32) -> Result<(), ErrorKind> {
		self.has_data = true;
		self.length = self.length.checked_add(n).ok_or(ErrorKind::Overflow)?;
		Ok(())
	}

	fn build(self) -> Result<Track> {
		let number = self.number;
		if !self.has_data {
			return err!(self.line, ErrorKind::NoIndices(number));
		}

		let pregap = self.start.unwrap_or(0);
		if self.length_known && pregap >= self.length {
			return err!(self.line, ErrorKind::StartPastEnd(number));
		}

		let mut indices = Vec::with_capacity(self.indices.len() + 2);
		if pregap > 0 {
			indices.push(Index {
				number: 0,
				offset: self.first,
			});
		}
		let start = self
			.first
			.checked_add(pregap)
			.ok_or(ErrorKind::Overflow)
			.line(self.line)?;
		indices.push(Index {
			number: 1,
			offset: start,
		});

		let mut prev = 0;
		for (i, &(ln, rel)) in self.indices.iter().enumerate() {
			let index = u8::try_from(i + 2)
				.ok()
				.filter(|&n| n <= 99)
				.ok_or(ErrorKind::TooManyIndices(number))
				.line(ln)?;
			if rel <= prev {
				return err!(ln, ErrorKind::IndexNotIncreasing { track: number, index });
			}
			if self.length_known && rel >= self.length - pregap {
				return err!(ln, ErrorKind::IndexPastEnd { track: number, index });
			}
			prev = rel;
			indices.push(Index {
				number: index,
				offset: start.checked_add(rel).ok_or(ErrorKind::Overflow).line(ln)?,
			});
		}

		let (isrc, cdtext) = if self.mode.is_audio() {
			(self.isrc, self.cdtext)
		} else {
			if self.isrc.is_some() || self.cdtext.is_some() {
				warn!("track {number} is a data track, dropping its ISRC and CD-TEXT");
			}
			(None, None)
		};

		Ok(Track {
			number,
			mode: self.mode,
			indices,
			pregap_length: (pregap > 0).then_some(pregap),
			length: self.length_known.then_some(self.length),
			isrc,
			cdtext,
			source: self.source,
			flags: self.flags,
		})
	}
}

#[derive(Debug)]
enum Phase {
	BeforeFirstTrack,
	InTrack,
	InCdText(CdTextBlock),
}

/// Everything the parser knows between two lines.
#[derive(Debug)]
struct State {
	table: Table,
	phase: Phase,
	current: Option<TrackBuilder>,
	/// Absolute offset the next track starts at; `None` once a track of
	/// unknown length was seen.
	position: Option<u32>,
	hint: Option<u32>,
}

impl State {
	fn new() -> Self {
		Self {
			table: Table::default(),
			phase: Phase::BeforeFirstTrack,
			current: None,
			position: Some(0),
			hint: None,
		}
	}

	fn line(&mut self, ln: usize, code: &str) -> Result<()> {
		let mut rest = code;
		if let Phase::InCdText(block) = &mut self.phase {
			match block.scan(code).line(ln)? {
				None => return Ok(()),
				Some(r) => {
					self.close_cdtext();
					rest = r;
				}
			}
		}

		let rest = rest.trim();
		if rest.is_empty() {
			return Ok(());
		} else if rest.starts_with('}') {
			return err!(ln, ErrorKind::UnmatchedBrace);
		}

		let d = Directive::parse(rest).line(ln)?;
		self.apply(ln, d)
	}

	fn close_cdtext(&mut self) {
		let phase = if self.current.is_some() {
			Phase::InTrack
		} else {
			Phase::BeforeFirstTrack
		};

		let Phase::InCdText(block) = std::mem::replace(&mut self.phase, phase) else {
			return;
		};

		let slot = match block.scope {
			Scope::Disc => &mut self.table.cdtext,
			Scope::Track => match &mut self.current {
				Some(t) => &mut t.cdtext,
				None => return,
			},
		};
		let text = slot.get_or_insert_with(CdText::default);
		for (k, v) in block.text.iter() {
			text.insert(k.clone(), v.to_string());
		}
	}

	fn finish_track(&mut self) -> Result<()> {
		let Some(b) = self.current.take() else {
			return Ok(());
		};

		let (ln, number) = (b.line, b.number);
		let track = b.build()?;
		self.position = match track.length {
			Some(n) => Some(
				track
					.first_sector()
					.checked_add(n)
					.ok_or(ErrorKind::Overflow)
					.line(ln)?,
			),
			None => {
				debug!("track {number} has no known length");
				None
			}
		};
		self.table.tracks.push(track);
		Ok(())
	}

	fn start_track(&mut self, ln: usize, mode: TrackMode) -> Result<()> {
		self.finish_track()?;

		let count = self.table.tracks.len() + 1;
		if count > MAX_TRACKS {
			return err!(ln, ErrorKind::TooManyTracks);
		}
		// Bounded by MAX_TRACKS above.
		let number = count as u8;

		if let Some(found) = self.hint.take() {
			if found != u32::from(number) {
				return err!(
					ln,
					ErrorKind::TrackOutOfOrder {
						expected: number,
						found,
					}
				);
			}
		}

		let Some(first) = self.position else {
			return err!(ln, ErrorKind::UnknownLength(number - 1));
		};

		self.current = Some(TrackBuilder {
			line: ln,
			number,
			mode,
			first,
			flags: TrackFlags::default(),
			isrc: None,
			cdtext: None,
			source: None,
			length: 0,
			length_known: true,
			has_data: false,
			start: None,
			indices: Vec::new(),
		});
		self.phase = Phase::InTrack;
		Ok(())
	}

	fn apply(&mut self, ln: usize, d: Directive) -> Result<()> {
		match d {
			Directive::DiscType(t) => self.table.disc_type = t,
			Directive::Catalog(c) => self.table.catalog = Some(c),
			Directive::Track(mode) => self.start_track(ln, mode)?,
			Directive::Unknown(s) => warn!("line {}: skipping unknown directive: {s}", ln + 1),
			Directive::CdText(rest) => {
				let scope = if self.current.is_some() {
					Scope::Track
				} else {
					Scope::Disc
				};
				self.phase = Phase::InCdText(CdTextBlock::new(scope, ln));
				return self.line(ln, rest);
			}
			d => {
				let kw = d.keyword();
				let Some(t) = self.current.as_mut() else {
					return err!(ln, ErrorKind::OutsideTrack(kw));
				};

				match d {
					Directive::Copy(b) => t.flags.copy = b,
					Directive::PreEmphasis(b) => t.flags.pre_emphasis = b,
					Directive::Channels(n) => t.flags.four_channel = n == 4,
					Directive::Isrc(s) => t.isrc = Some(s),
					Directive::Silence(n) => t.grow(n).line(ln)?,
					Directive::Pregap(n) => {
						t.grow(n).line(ln)?;
						t.start = Some(t.length);
					}
					Directive::Start(pos) => {
						t.start = Some(pos.unwrap_or(t.length));
					}
					Directive::File {
						name,
						start,
						length,
					} => {
						let track_offset = t.length;
						t.source.get_or_insert(AudioSource {
							name,
							offset: start,
							track_offset,
						});
						match length {
							Some(n) => t.grow(n).line(ln)?,
							None => {
								t.has_data = true;
								t.length_known = false;
							}
						}
					}
					Directive::DataFile { name, length } => {
						let track_offset = t.length;
						t.source.get_or_insert(AudioSource {
							name,
							offset: 0,
							track_offset,
						});
						match length {
							Some(n) => t.grow(n).line(ln)?,
							None => {
								t.has_data = true;
								t.length_known = false;
							}
						}
					}
					Directive::Index(n) => t.indices.push((ln, n)),
					_ => unreachable!("handled above"),
				}
			}
		}

		Ok(())
	}

	fn finish(mut self, last_ln: usize) -> Result<Table> {
		if let Phase::InCdText(block) = &self.phase {
			return err!(block.opened_at, ErrorKind::UnterminatedCdText);
		}

		self.finish_track()?;
		if self.table.tracks.is_empty() {
			return err!(last_ln, ErrorKind::NoTracks);
		}

		Ok(self.table)
	}
}

pub struct Parser<'a> {
	text: &'a str,
}

impl<'a> Parser<'a> {
	pub fn new(text: &'a str) -> Self {
		Self { text }
	}

	pub fn parse(self) -> Result<Table> {
		let mut state = State::new();
		let mut last_ln = 0;

		for (ln, line) in self.text.lines().enumerate() {
			last_ln = ln;
			let (code, comment) = split_comment(line);

			// A hint inside a CD-TEXT block would be a comment on metadata.
			if !matches!(state.phase, Phase::InCdText(_)) {
				if let Some(n) = comment.and_then(track_hint) {
					state.hint = Some(n);
				}
			}

			state.line(ln, code)?;
		}

		state.finish(last_ln)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn comments_outside_strings_only() {
		assert_eq!(split_comment("TRACK AUDIO // x"), ("TRACK AUDIO ", Some(" x")));
		assert_eq!(
			split_comment(r#"TITLE "http://a \"//\"" // c"#),
			(r#"TITLE "http://a \"//\"" "#, Some(" c"))
		);
		assert_eq!(split_comment("CD_DA"), ("CD_DA", None));
	}

	#[test]
	fn track_hints() {
		assert_eq!(track_hint(" Track 3"), Some(3));
		assert_eq!(track_hint("Track 12 "), Some(12));
		assert_eq!(track_hint("Tracks 3"), None);
		assert_eq!(track_hint("Track"), None);
		assert_eq!(track_hint(" something else"), None);
	}

	#[test]
	fn directive_kinds() {
		assert_eq!(Directive::parse("CD_ROM_XA"), Ok(Directive::DiscType(DiscType::CdRomXa)));
		assert_eq!(
			Directive::parse(r#"CATALOG "0724384260910""#),
			Ok(Directive::Catalog("0724384260910".into()))
		);
		assert_eq!(Directive::parse("ISRC GBAYE0000351"), Ok(Directive::Isrc("GBAYE0000351".into())));
		assert_eq!(
			Directive::parse("TRACK MODE1_RAW RW_RAW"),
			Ok(Directive::Track(TrackMode::Mode1Raw))
		);
		assert_eq!(Directive::parse("NO COPY"), Ok(Directive::Copy(false)));
		assert_eq!(Directive::parse("NO PRE_EMPHASIS"), Ok(Directive::PreEmphasis(false)));
		assert_eq!(Directive::parse("ZERO AUDIO 00:00:10"), Ok(Directive::Silence(10)));
		assert_eq!(
			Directive::parse(r#"FILE "data.wav" 00:01:00 00:02:00"#),
			Ok(Directive::File {
				name: "data.wav".into(),
				start: 75,
				length: Some(150),
			})
		);
		assert_eq!(
			Directive::parse(r#"AUDIOFILE "a \"b\".wav" 0"#),
			Ok(Directive::File {
				name: r#"a "b".wav"#.into(),
				start: 0,
				length: None,
			})
		);
		assert_eq!(Directive::parse("START"), Ok(Directive::Start(None)));
		assert_eq!(Directive::parse("INDEX 00:00:30"), Ok(Directive::Index(30)));
		assert_eq!(Directive::parse("CD_TEXT {"), Ok(Directive::CdText(" {")));
		assert_eq!(Directive::parse("SUBCHANNEL x"), Ok(Directive::Unknown("SUBCHANNEL x")));
	}

	#[test]
	fn directive_argument_errors() {
		assert_eq!(Directive::parse("TRACK"), Err(ErrorKind::MissingArgument("TRACK")));
		assert_eq!(
			Directive::parse("TRACK VIDEO"),
			Err(ErrorKind::UnknownTrackMode("VIDEO".into()))
		);
		assert_eq!(
			Directive::parse("INDEX 00:61:00"),
			Err(ErrorKind::InvalidLength("00:61:00".into()))
		);
		assert_eq!(
			Directive::parse("FILE data.wav 0"),
			Err(ErrorKind::ExpectedString("FILE"))
		);
	}

	#[test]
	fn cdtext_block_scanning() {
		let mut b = CdTextBlock::new(Scope::Disc, 0);
		assert_eq!(b.scan("{ LANGUAGE_MAP { 0 : EN }"), Ok(None));
		assert_eq!(b.scan(r#"LANGUAGE 0 { TITLE "a" PERFORMER "b" }"#), Ok(None));
		assert_eq!(b.scan(r#"LANGUAGE 1 { TITLE "ignored" }"#), Ok(None));
		assert_eq!(b.scan("} // rest"), Ok(Some(" // rest")));
		assert_eq!(b.text.title(), Some("a"));
		assert_eq!(b.text.performer(), Some("b"));
	}

	#[test]
	fn cdtext_block_needs_a_brace() {
		let mut b = CdTextBlock::new(Scope::Track, 3);
		assert_eq!(b.scan(""), Ok(None));
		assert_eq!(b.scan(r#"TITLE "x""#), Err(ErrorKind::MissingArgument("CD_TEXT")));
	}
}
