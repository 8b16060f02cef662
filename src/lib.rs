//! Parses cdrdao TOC files, including their CD-TEXT, into a validated track
//! layout and renders that layout as a cue sheet.
//!
//! ```
//! let table = toccata::toc::parse(
//! 	r#"
//! CD_DA
//! // Track 1
//! TRACK AUDIO
//! FILE "data.wav" 0 03:00:00
//! "#,
//! )
//! .unwrap();
//!
//! let cue = toccata::cue::render(&table, &Default::default());
//! assert!(cue.contains("INDEX 01 00:00:00"));
//! ```

pub mod cdtext;
pub mod cue;
pub mod msf;
pub mod toc;

pub use crate::{
	cue::CueOptions,
	toc::{
		Table,
		Track,
	},
};
