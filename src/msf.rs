use core::fmt;

pub const FRAMES_PER_SECOND: u32 = 75;
pub const SECONDS_PER_MINUTE: u32 = 60;
pub const SAMPLES_PER_FRAME: u32 = 588;

/// A minutes:seconds:frames position, where one frame is one CD sector.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Msf {
	pub minutes: u32,
	pub seconds: u32,
	pub frames: u32,
}

impl Msf {
	pub const fn from_sectors(sectors: u32) -> Self {
		let frames = sectors % FRAMES_PER_SECOND;
		let secs = sectors / FRAMES_PER_SECOND;

		Self {
			minutes: secs / SECONDS_PER_MINUTE,
			seconds: secs % SECONDS_PER_MINUTE,
			frames,
		}
	}

	/// `None` if the position doesn't fit in a `u32` sector count.
	pub fn to_sectors(self) -> Option<u32> {
		self.minutes
			.checked_mul(SECONDS_PER_MINUTE)?
			.checked_add(self.seconds)?
			.checked_mul(FRAMES_PER_SECOND)?
			.checked_add(self.frames)
	}

	/// Parses `MM:SS:FF`. Minutes are unbounded, seconds must be below 60 and
	/// frames below 75.
	pub fn parse(s: &str) -> Option<Self> {
		let mut fields = s.split(':');
		let mut next = || -> Option<u32> {
			let f = fields.next()?;
			if f.is_empty() || !f.bytes().all(|c| c.is_ascii_digit()) {
				return None;
			}
			f.parse().ok()
		};

		let msf = Self {
			minutes: next()?,
			seconds: next()?,
			frames: next()?,
		};

		if fields.next().is_some()
			|| msf.seconds >= SECONDS_PER_MINUTE
			|| msf.frames >= FRAMES_PER_SECOND
		{
			return None;
		}

		msf.to_sectors().map(|_| msf)
	}
}

impl fmt::Display for Msf {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(
			f,
			"{:02}:{:02}:{:02}",
			self.minutes, self.seconds, self.frames
		)
	}
}

/// Parses a TOC length or position: either `MM:SS:FF` or a plain sample count.
pub fn parse_sectors(s: &str) -> Option<u32> {
	if s.contains(':') {
		Msf::parse(s).and_then(Msf::to_sectors)
	} else if !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit()) {
		s.parse::<u64>()
			.ok()
			.and_then(|samples| u32::try_from(samples / u64::from(SAMPLES_PER_FRAME)).ok())
	} else {
		None
	}
}
