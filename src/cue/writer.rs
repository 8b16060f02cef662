use core::fmt;

use crate::{
	cdtext::CdText,
	msf::Msf,
	toc::{
		Table,
		Track,
	},
};

#[derive(Debug, Clone)]
pub struct CueOptions {
	/// File name for tracks whose TOC entry names no file.
	pub default_file: String,
	/// File type written for audio files.
	pub file_type: String,
}

impl Default for CueOptions {
	fn default() -> Self {
		Self {
			default_file: "data.wav".to_string(),
			file_type: "WAVE".to_string(),
		}
	}
}

/// Renders a [`Table`] as a cue sheet through [`fmt::Display`].
pub struct CueWriter<'a> {
	table: &'a Table,
	opts: &'a CueOptions,
}

impl<'a> CueWriter<'a> {
	pub fn new(table: &'a Table, opts: &'a CueOptions) -> Self {
		Self { table, opts }
	}
}

pub fn render(table: &Table, opts: &CueOptions) -> String {
	CueWriter::new(table, opts).to_string()
}

struct Quoted<'a>(&'a str);

impl fmt::Display for Quoted<'_> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("\"")?;
		for c in self.0.chars() {
			match c {
				'"' => f.write_str("\\\"")?,
				'\\' => f.write_str("\\\\")?,
				'\n' => f.write_str("\\n")?,
				'\r' => f.write_str("\\r")?,
				'\t' => f.write_str("\\t")?,
				_ => write!(f, "{c}")?,
			}
		}
		f.write_str("\"")
	}
}

fn write_cdtext(f: &mut fmt::Formatter, indent: &str, text: Option<&CdText>) -> fmt::Result {
	let Some(text) = text else {
		return Ok(());
	};

	for (kw, v) in [
		("PERFORMER", text.performer()),
		("TITLE", text.title()),
		("SONGWRITER", text.songwriter()),
	] {
		if let Some(v) = v.filter(|s| !s.is_empty()) {
			writeln!(f, "{indent}{kw} {}", Quoted(v))?;
		}
	}

	Ok(())
}

fn write_flags(f: &mut fmt::Formatter, t: &Track) -> fmt::Result {
	let flags = [
		(t.flags.copy, "DCP"),
		(t.flags.pre_emphasis, "PRE"),
		(t.flags.four_channel, "4CH"),
	];
	if flags.iter().any(|&(on, _)| on) {
		f.write_str("    FLAGS")?;
		for (_, name) in flags.iter().filter(|&&(on, _)| on) {
			write!(f, " {name}")?;
		}
		writeln!(f)?;
	}

	Ok(())
}

impl fmt::Display for CueWriter<'_> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let table = self.table;

		if let Some(catalog) = &table.catalog {
			writeln!(f, "CATALOG {catalog}")?;
		}
		write_cdtext(f, "", table.cdtext.as_ref())?;

		let mut file: Option<&str> = None;
		// Position in the current file right after the previous track's data.
		let mut cursor = 0_u32;

		for t in &table.tracks {
			let first = t.first_sector();
			// Disc sector where this track's file data begins, and the matching
			// position inside the file.
			let (name, data_start, file_pos) = match &t.source {
				Some(s) => (
					s.name.as_str(),
					first.saturating_add(s.track_offset),
					s.offset,
				),
				None => (
					file.unwrap_or(&self.opts.default_file),
					first,
					cursor,
				),
			};

			if file != Some(name) {
				let file_type = if t.is_audio() {
					self.opts.file_type.as_str()
				} else {
					"BINARY"
				};
				writeln!(f, "FILE {} {file_type}", Quoted(name))?;
				file = Some(name);
			}

			writeln!(f, "  TRACK {:02} {}", t.number, t.mode.cue_keyword())?;
			write_cdtext(f, "    ", t.cdtext.as_ref())?;
			write_flags(f, t)?;
			if let Some(isrc) = t.isrc.as_deref().filter(|s| !s.is_empty()) {
				writeln!(f, "    ISRC {isrc}")?;
			}

			let start = t.start();
			// Silence before the file data isn't in the file.
			let silence = data_start.min(start).saturating_sub(first);
			if silence > 0 {
				writeln!(f, "    PREGAP {}", Msf::from_sectors(silence))?;
			}
			for i in &t.indices {
				if i.number == 0 && start <= data_start {
					continue;
				}
				let pos = file_pos.saturating_add(i.offset.saturating_sub(data_start));
				writeln!(f, "    INDEX {:02} {}", i.number, Msf::from_sectors(pos))?;
			}

			if let Some(end) = t.end() {
				cursor = file_pos.saturating_add(end.saturating_sub(data_start));
			}
		}

		Ok(())
	}
}
