//! Cue sheets: rendering a [`Table`](crate::toc::Table) and reading the
//! structural parts back.

mod error;
mod parser;
mod writer;

use std::collections::BTreeMap;

use anyhow::{
	anyhow,
	Result,
};

pub use self::writer::{
	render,
	CueOptions,
	CueWriter,
};
use crate::toc::Index;

#[derive(Debug, Clone, Default)]
pub struct CueSheet {
	pub rems: BTreeMap<String, String>,
	pub title: Option<String>,
	pub performer: Option<String>,
	pub songwriter: Option<String>,
	pub catalog: Option<String>,
	pub files: Vec<CueFile>,
}

#[derive(Debug, Clone, Default)]
pub struct CueFile {
	pub name: String,
	pub file_type: String,
	pub rems: BTreeMap<String, String>,
	pub tracks: Vec<CueTrack>,
}

#[derive(Debug, Clone, Default)]
pub struct CueTrack {
	pub number: u8,
	pub mode: String,
	pub title: Option<String>,
	pub performer: Option<String>,
	pub songwriter: Option<String>,
	pub isrc: Option<String>,
	pub flags: Vec<String>,
	pub pregap: Option<u32>,
	pub postgap: Option<u32>,
	/// Offsets are relative to the start of the enclosing file.
	pub indices: Vec<Index>,
	pub rems: BTreeMap<String, String>,
}

impl CueSheet {
	pub fn tracks(&self) -> impl Iterator<Item = &CueTrack> {
		self.files.iter().flat_map(|f| f.tracks.iter())
	}
}

pub fn parse(cuesheet: &str) -> Result<CueSheet> {
	let lines = cuesheet.lines().collect::<Vec<_>>();
	parser::Parser::new(&lines).parse().map_err(|e| {
		let excerpt = lines.get(e.ln).copied().unwrap_or_default();
		anyhow!("{e}\n> {excerpt}")
	})
}
