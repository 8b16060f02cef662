use anyhow::{
	anyhow,
	bail,
	Result,
};

use super::{
	error::{
		Error,
		ErrorCtx,
	},
	CueFile,
	CueSheet,
	CueTrack,
};
use crate::{
	msf::Msf,
	toc::Index,
};

macro_rules! err {
	[$ln:expr, $($args:tt)+] => {
		Err($crate::cue::error::Error {
			ln: $ln,
			msg: anyhow::anyhow!($($args)+),
		})
	};
}

pub struct Parser<'a> {
	lines: &'a [&'a str],
	ln: usize,
}

fn next_word(s: &str) -> Option<(&str, &str)> {
	let start = s.find(|c: char| !c.is_ascii_whitespace())?;
	let s = &s[start..];
	let end = s.find(|c: char| c.is_ascii_whitespace()).unwrap_or(s.len());

	Some((&s[end..], &s[..end]))
}

fn parse_msf(word: &str) -> Result<u32> {
	Msf::parse(word)
		.and_then(Msf::to_sectors)
		.ok_or_else(|| anyhow!("invalid time: {word}"))
}

fn parse_index(input: &str) -> Result<Index> {
	let (input, number) = next_word(input).ok_or_else(|| anyhow!("missing index number"))?;
	let number = number
		.parse::<u8>()
		.ok()
		.filter(|&n| n <= 99)
		.ok_or_else(|| anyhow!("invalid index number: {number}"))?;
	let (_, time) =
		next_word(input).ok_or_else(|| anyhow!("missing time specifier after index number"))?;

	Ok(Index {
		number,
		offset: parse_msf(time)?,
	})
}

fn escaped(c: char) -> char {
	match c {
		'n' => '\n',
		't' => '\t',
		'r' => '\r',
		_ => c,
	}
}

fn parse_str(input: &str) -> Result<(&str, String)> {
	let input = input.trim_start();
	let mut buf = String::new();
	let mut chars = input.char_indices();

	if !input.starts_with('"') {
		let end = input
			.find(|c: char| c.is_ascii_whitespace())
			.unwrap_or(input.len());
		if end == 0 {
			bail!("missing value");
		}
		return Ok((&input[end..], input[..end].to_string()));
	}

	let _ = chars.next();
	while let Some((i, c)) = chars.next() {
		match c {
			'"' => return Ok((&input[i + 1..], buf)),
			'\\' => {
				let Some((_, esc)) = chars.next() else {
					break;
				};
				buf.push(escaped(esc));
			}
			_ => buf.push(c),
		}
	}

	Err(anyhow!("unterminated double-quoted string"))
}

fn parse_rem(input: &str) -> Result<(String, String)> {
	let input = input.trim_start();
	if input.is_empty() {
		bail!("expected 2 values, have none");
	}

	let (rest, key) = parse_str(input)?;
	if rest.trim().is_empty() {
		return Ok((key, String::new()));
	}

	let val = parse_val(rest)?.trim().to_string();
	Ok((key, val))
}

fn parse_val(input: &str) -> Result<String> {
	let input = input.trim();
	if input.is_empty() {
		bail!("missing value");
	} else if input.len() > 1 && input.starts_with('"') && input.ends_with('"') {
		let (rest, val) = parse_str(input)?;
		if !rest.trim().is_empty() {
			bail!("too many values in line");
		}

		Ok(val)
	} else {
		Ok(input.to_string())
	}
}

impl<'a> Iterator for Parser<'a> {
	// (line_no, field_name, field_value)
	type Item = (usize, &'a str, &'a str);

	fn next(&mut self) -> Option<Self::Item> {
		while self.ln < self.lines.len() {
			let i = self.ln;
			let s = self.lines[i];
			self.ln += 1;

			let Some((rest, field)) = next_word(s) else {
				continue;
			};
			return Some((i, field, rest));
		}

		None
	}
}

impl<'a> Parser<'a> {
	pub fn new(lines: &'a [&'a str]) -> Self {
		Self { lines, ln: 0 }
	}

	fn is_exhausted(&self) -> bool {
		self.ln >= self.lines.len()
	}

	pub fn parse(mut self) -> Result<CueSheet, Error> {
		let mut cue = CueSheet::default();

		// Disc-wide declarations
		for (ln, field, val) in &mut self {
			match field.to_uppercase().as_str() {
				"REM" => {
					let (k, v) = parse_rem(val).line(ln)?;
					cue.rems.insert(k, v);
				}
				"TITLE" => cue.title = Some(parse_val(val).line(ln)?),
				"PERFORMER" => cue.performer = Some(parse_val(val).line(ln)?),
				"CATALOG" => cue.catalog = Some(parse_val(val).line(ln)?),
				"SONGWRITER" => cue.songwriter = Some(parse_val(val).line(ln)?),
				"CDTEXTFILE" => (),
				"FILE" => {
					self.ln = ln;
					break;
				}
				"TRACK" => return err!(ln, "`TRACK` declared before any `FILE`"),
				_ => return err!(ln, "unknown field for a disc: {field}"),
			}
		}

		if self.is_exhausted() {
			return err!(0, "cue sheet is missing a `FILE` declaration");
		}

		let mut expected = 1;
		while !self.is_exhausted() {
			let file = self.parse_file(&mut expected)?;
			cue.files.push(file);
		}

		if expected == 1 {
			return err!(0, "cue sheet has no tracks");
		}

		Ok(cue)
	}

	fn parse_file(&mut self, expected: &mut u8) -> Result<CueFile, Error> {
		let Some((ln, _, rest)) = self.next() else {
			return err!(self.ln, "expected a `FILE` declaration");
		};

		let (rest, name) = parse_str(rest).line(ln)?;
		let file_type = next_word(rest)
			.map(|(_, t)| t.to_string())
			.ok_or_else(|| anyhow!("`FILE` is missing a file type"))
			.line(ln)?;

		let mut file = CueFile {
			name,
			file_type,
			..CueFile::default()
		};

		while let Some((ln, field, val)) = self.next() {
			match field.to_uppercase().as_str() {
				"TRACK" => {
					self.ln = ln;
					break;
				}
				"FILE" => {
					self.ln = ln;
					return Ok(file);
				}
				"REM" => {
					let (k, v) = parse_rem(val).line(ln)?;
					file.rems.insert(k, v);
				}
				_ => return err!(ln, "unknown field for a file: {field}"),
			}
		}

		while let Some((ln, field, val)) = self.next() {
			if !field.eq_ignore_ascii_case("TRACK") {
				return err!(ln, "expected `TRACK`, found {field}");
			}

			let (rest, no) = parse_str(val).line(ln)?;
			let number = no
				.parse::<u8>()
				.map_err(|_| anyhow!("invalid track number: {no}"))
				.line(ln)?;
			if number != *expected {
				return err!(ln, "track {number} appears where track {expected} was expected");
			}
			*expected = expected.saturating_add(1);

			let mode = parse_val(rest).line(ln)?;
			let mut track = CueTrack {
				number,
				mode,
				..CueTrack::default()
			};
			let track_ln = ln;

			while let Some((ln, field, val)) = self.next() {
				match field.to_uppercase().as_str() {
					"TRACK" => {
						self.ln = ln;
						break;
					}
					"FILE" => {
						self.ln = ln;
						break;
					}
					"INDEX" => {
						let idx = parse_index(val).line(ln)?;
						if track.indices.last().is_some_and(|last| {
							last.number >= idx.number || last.offset >= idx.offset
						}) {
							return err!(ln, "index {} is out of order", idx.number);
						}
						track.indices.push(idx);
					}
					"TITLE" => track.title = Some(parse_val(val).line(ln)?),
					"PERFORMER" => track.performer = Some(parse_val(val).line(ln)?),
					"SONGWRITER" => track.songwriter = Some(parse_val(val).line(ln)?),
					"ISRC" => track.isrc = Some(parse_val(val).line(ln)?),
					"FLAGS" => track.flags = val.split_ascii_whitespace().map(String::from).collect(),
					"PREGAP" => track.pregap = Some(parse_msf(val.trim()).line(ln)?),
					"POSTGAP" => track.postgap = Some(parse_msf(val.trim()).line(ln)?),
					"REM" => {
						let (k, v) = parse_rem(val).line(ln)?;
						track.rems.insert(k, v);
					}
					_ => return err!(ln, "unknown field for a track: {field}"),
				}
			}

			if track.indices.is_empty() {
				return err!(track_ln, "track is missing an `INDEX` declaration");
			}

			file.tracks.push(track);

			let next_is_file = self
				.lines
				.get(self.ln)
				.and_then(|s| next_word(s))
				.is_some_and(|(_, f)| f.eq_ignore_ascii_case("FILE"));
			if next_is_file {
				break;
			}
		}

		Ok(file)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strings_and_escapes() {
		assert_eq!(parse_str(r#""a \"b\" \\c" WAVE"#).unwrap(), (" WAVE", r#"a "b" \c"#.to_string()));
		assert_eq!(parse_str("bare rest").unwrap(), (" rest", "bare".to_string()));
		assert!(parse_str(r#""open"#).is_err());
	}

	#[test]
	fn index_times_are_sectors() {
		assert_eq!(
			parse_index("01 01:02:03").unwrap(),
			Index {
				number: 1,
				offset: (60 + 2) * 75 + 3,
			}
		);
		assert!(parse_index("01").is_err());
		assert!(parse_index("100 00:00:00").is_err());
		assert!(parse_index("01 00:00:75").is_err());
	}

	#[test]
	fn rem_pairs() {
		assert_eq!(
			parse_rem("DATE 1994").unwrap(),
			("DATE".to_string(), "1994".to_string())
		);
		assert_eq!(
			parse_rem(r#"COMMENT "ripped with love""#).unwrap(),
			("COMMENT".to_string(), "ripped with love".to_string())
		);
		assert_eq!(parse_rem("LONELY").unwrap(), ("LONELY".to_string(), String::new()));
	}
}
