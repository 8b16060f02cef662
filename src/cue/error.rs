use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
#[error("line {}: {msg}", .ln + 1)]
pub struct Error {
	pub ln: usize,
	pub msg: anyhow::Error,
}

pub trait ErrorCtx<T> {
	fn line(self, ln: usize) -> Result<T, Error>;
}

impl<T> ErrorCtx<T> for Result<T, anyhow::Error> {
	fn line(self, ln: usize) -> Result<T, Error> {
		self.map_err(|msg| Error { ln, msg })
	}
}
