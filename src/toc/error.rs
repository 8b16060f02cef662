use thiserror::Error as ThisError;

/// A structural problem in a TOC file, tagged with the 0-based line it was
/// found on.
#[derive(Debug, ThisError)]
#[error("line {}: {}", .line + 1, .kind)]
pub struct Error {
	pub line: usize,
	pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum ErrorKind {
	#[error("the TOC contains no tracks")]
	NoTracks,
	#[error("more than 99 tracks")]
	TooManyTracks,
	#[error("track {found} appears where track {expected} was expected")]
	TrackOutOfOrder { expected: u8, found: u32 },
	#[error("`{0}` appears before any `TRACK`")]
	OutsideTrack(&'static str),
	#[error("track {0} has no index points")]
	NoIndices(u8),
	#[error("track {track}: index {index} does not come after the previous index")]
	IndexNotIncreasing { track: u8, index: u8 },
	#[error("track {track}: index {index} lies past the end of the track")]
	IndexPastEnd { track: u8, index: u8 },
	#[error("track {0} has more than 99 index points")]
	TooManyIndices(u8),
	#[error("track {0}: index 1 lies past the end of the track")]
	StartPastEnd(u8),
	#[error("track {0} has no known length but is followed by another track")]
	UnknownLength(u8),
	#[error("`CD_TEXT` block is never closed")]
	UnterminatedCdText,
	#[error("unmatched `}}`")]
	UnmatchedBrace,
	#[error("unknown track mode: {0}")]
	UnknownTrackMode(String),
	#[error("invalid time or length: {0}")]
	InvalidLength(String),
	#[error("`{0}` is missing an argument")]
	MissingArgument(&'static str),
	#[error("`{0}` expects a double-quoted string")]
	ExpectedString(&'static str),
	#[error("disc is longer than the sector counter can address")]
	Overflow,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub trait ErrorCtx<T> {
	fn line(self, ln: usize) -> Result<T>;
}

impl<T> ErrorCtx<T> for Result<T, ErrorKind> {
	fn line(self, ln: usize) -> Result<T> {
		self.map_err(|kind| Error { line: ln, kind })
	}
}
