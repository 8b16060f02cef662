//! The structural model of a cdrdao TOC file.

mod error;
mod parser;

use core::fmt;

pub use self::error::{
	Error,
	ErrorKind,
	Result,
};
use crate::{
	cdtext::CdText,
	msf::Msf,
};

/// The disc type declared at the top of a TOC file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DiscType {
	#[default]
	CdDa,
	CdRom,
	CdRomXa,
	CdI,
}

impl DiscType {
	pub fn from_keyword(s: &str) -> Option<Self> {
		Some(match s {
			"CD_DA" => Self::CdDa,
			"CD_ROM" => Self::CdRom,
			"CD_ROM_XA" => Self::CdRomXa,
			"CD_I" => Self::CdI,
			_ => return None,
		})
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackMode {
	Audio,
	Mode0,
	Mode1,
	Mode1Raw,
	Mode2,
	Mode2Form1,
	Mode2Form2,
	Mode2FormMix,
	Mode2Raw,
}

impl TrackMode {
	pub fn from_keyword(s: &str) -> Option<Self> {
		use TrackMode::*;
		Some(match s {
			"AUDIO" => Audio,
			"MODE0" => Mode0,
			"MODE1" => Mode1,
			"MODE1_RAW" => Mode1Raw,
			"MODE2" => Mode2,
			"MODE2_FORM1" => Mode2Form1,
			"MODE2_FORM2" => Mode2Form2,
			"MODE2_FORM_MIX" => Mode2FormMix,
			"MODE2_RAW" => Mode2Raw,
			_ => return None,
		})
	}

	pub const fn is_audio(self) -> bool {
		matches!(self, Self::Audio)
	}

	/// The closest cue sheet track type.
	pub const fn cue_keyword(self) -> &'static str {
		use TrackMode::*;
		match self {
			Audio => "AUDIO",
			Mode1 => "MODE1/2048",
			Mode0 | Mode1Raw => "MODE1/2352",
			Mode2 => "MODE2/2336",
			Mode2Form1 | Mode2Form2 | Mode2FormMix | Mode2Raw => "MODE2/2352",
		}
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct TrackFlags {
	pub copy: bool,
	pub pre_emphasis: bool,
	pub four_channel: bool,
}

/// The file a track's data is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
	pub name: String,
	/// Where the track's data begins inside the file, in sectors.
	pub offset: u32,
	/// Sectors of silence between the track's first sector and the point
	/// where data from the file begins.
	pub track_offset: u32,
}

/// One index point. `number` 0 is the pregap, 1 the audible start.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Index {
	pub number: u8,
	/// Absolute sector offset from the start of the disc.
	pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
	pub number: u8,
	pub mode: TrackMode,
	/// Strictly increasing offsets; index 1 is always present.
	pub indices: Vec<Index>,
	pub pregap_length: Option<u32>,
	/// Sectors from index 0 (or 1) to the end of the track, if known.
	pub length: Option<u32>,
	pub isrc: Option<String>,
	pub cdtext: Option<CdText>,
	pub source: Option<AudioSource>,
	pub flags: TrackFlags,
}

impl Track {
	pub fn index(&self, number: u8) -> Option<u32> {
		self.indices
			.iter()
			.find(|i| i.number == number)
			.map(|i| i.offset)
	}

	/// The first sector of the track, pregap included.
	pub fn first_sector(&self) -> u32 {
		self.indices.first().map_or(0, |i| i.offset)
	}

	/// The sector index 1 points at.
	pub fn start(&self) -> u32 {
		// The parser guarantees index 1.
		self.index(1).unwrap_or_else(|| self.first_sector())
	}

	/// One past the last sector of the track.
	pub fn end(&self) -> Option<u32> {
		self.length
			.and_then(|n| self.first_sector().checked_add(n))
	}

	pub fn is_audio(&self) -> bool {
		self.mode.is_audio()
	}
}

/// A validated TOC. Build one with [`parse`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
	pub disc_type: DiscType,
	pub catalog: Option<String>,
	pub cdtext: Option<CdText>,
	pub tracks: Vec<Track>,
}

impl Table {
	pub fn track(&self, number: u8) -> Option<&Track> {
		usize::from(number)
			.checked_sub(1)
			.and_then(|i| self.tracks.get(i))
	}

	pub fn audio_tracks(&self) -> impl Iterator<Item = &Track> {
		self.tracks.iter().filter(|t| t.is_audio())
	}

	pub fn has_data_tracks(&self) -> bool {
		self.tracks.iter().any(|t| !t.is_audio())
	}

	/// Index 1 of the given track.
	pub fn track_start(&self, number: u8) -> Option<u32> {
		self.track(number).map(Track::start)
	}

	/// One past the last sector of the given track: the next track's first
	/// sector, or the track's own length for the last one.
	pub fn track_end(&self, number: u8) -> Option<u32> {
		let t = self.track(number)?;
		number
			.checked_add(1)
			.and_then(|n| self.track(n))
			.map(Track::first_sector)
			.or_else(|| t.end())
	}

	/// Sectors from index 1 up to the end of the track.
	pub fn track_length(&self, number: u8) -> Option<u32> {
		self.track_end(number)?
			.checked_sub(self.track_start(number)?)
	}

	/// The first sector after the last track, if its length is known.
	pub fn leadout(&self) -> Option<u32> {
		self.tracks.last().and_then(Track::end)
	}

	/// Length of the hidden audio before track 1's index 1, if any.
	pub fn hidden_track_audio(&self) -> Option<u32> {
		self.tracks
			.first()
			.filter(|t| t.is_audio())
			.and_then(|t| t.pregap_length)
	}
}

impl fmt::Display for Table {
	/// A human readable layout, one track per line.
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		if let Some(catalog) = &self.catalog {
			writeln!(f, "catalog {catalog}")?;
		}
		if let Some(t) = &self.cdtext {
			for (k, v) in t.iter() {
				writeln!(f, "{k}: {v}")?;
			}
		}

		for t in &self.tracks {
			write!(f, "track {:02} {:<10}", t.number, t.mode.cue_keyword())?;
			for i in &t.indices {
				write!(f, " {:02}@{}", i.number, Msf::from_sectors(i.offset))?;
			}
			if let Some(end) = self.track_end(t.number) {
				write!(f, " end@{}", Msf::from_sectors(end))?;
			}
			if let Some(title) = t.cdtext.as_ref().and_then(|c| c.title()) {
				write!(f, " {title:?}")?;
			}
			writeln!(f)?;
		}

		Ok(())
	}
}

/// Parses the text of a cdrdao TOC file.
pub fn parse(toc: &str) -> Result<Table> {
	parser::Parser::new(toc).parse()
}
