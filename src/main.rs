use std::{
	collections::{
		btree_map::Entry,
		BTreeMap,
	},
	fs,
	io::{
		self,
		Write,
	},
	path::{
		Path,
		PathBuf,
	},
};

use anyhow::{
	anyhow,
	bail,
	ensure,
	Result,
};
use clap::Parser;
use encoding_rs::CoderResult;
use jwalk::WalkDir;
use log::{
	debug,
	info,
	warn,
	LevelFilter,
};
use rayon::prelude::*;
use toccata::{
	cue,
	toc,
	CueOptions,
	Table,
};

#[derive(Parser)]
/// Toccata turns cdrdao TOC files into cue sheets.
///
/// CD-TEXT in the TOC is decoded and carried over as TITLE, PERFORMER and
/// SONGWRITER fields.
#[command(version)]
struct Args {
	/// Path to a .toc file or a directory containing them
	path: PathBuf,
	/// Maximum number of files processed in parallel; defaults to about half the available logical CPU cores
	#[arg(short, long)]
	jobs: Option<usize>,

	/// Write cue sheets into this directory instead of next to each TOC file
	#[arg(short, long)]
	out_dir: Option<PathBuf>,
	/// File name used for tracks that don't name an audio file
	#[arg(long, default_value = "data.wav")]
	file: String,
	/// File type written on FILE lines for audio
	#[arg(long, default_value = "WAVE")]
	file_type: String,

	/// Print to stdout instead of writing .cue files
	#[arg(long)]
	stdout: bool,
	/// Print the parsed track layout instead of a cue sheet; implies --stdout
	#[arg(long)]
	dump: bool,
	/// Only parse and validate; write nothing
	#[arg(long, conflicts_with_all = ["stdout", "dump"])]
	dry: bool,
	/// Overwrite existing .cue files
	#[arg(short, long)]
	force: bool,

	/// Log more; repeat for even more
	#[arg(short, long, action = clap::ArgAction::Count)]
	verbose: u8,
	/// Only log errors
	#[arg(short, long, conflicts_with = "verbose")]
	quiet: bool,
}

impl Args {
	fn log_level(&self) -> LevelFilter {
		if self.quiet {
			return LevelFilter::Error;
		}
		match self.verbose {
			0 => LevelFilter::Warn,
			1 => LevelFilter::Info,
			2 => LevelFilter::Debug,
			_ => LevelFilter::Trace,
		}
	}
}

struct Job {
	toc_path: PathBuf,
	out: PathBuf,
}

fn is_toc(p: &Path) -> bool {
	p.extension().is_some_and(|s| s.eq_ignore_ascii_case("toc"))
}

fn find_tocs(path: &Path) -> Vec<PathBuf> {
	if path.is_file() {
		return vec![path.to_path_buf()];
	}

	WalkDir::new(path)
		.skip_hidden(false)
		.follow_links(true)
		.into_iter()
		.filter_map(|res| match res {
			Ok(entry)
				if entry.file_type.is_file() && is_toc(Path::new(&entry.file_name)) =>
			{
				Some(entry.parent_path.join(entry.file_name))
			}
			Ok(_) => None,
			Err(e) => {
				warn!("skipping unreadable entry: {e}");
				None
			}
		})
		.collect()
}

fn read_toc(p: &Path) -> Result<Table> {
	let data = fs::read(p).map_err(|e| anyhow!("error reading {}: {}", p.display(), e))?;

	// cdrdao escapes most non-ASCII bytes, but hand-edited files show up in
	// all sorts of encodings.
	let mut detect = chardetng::EncodingDetector::new();
	detect.feed(&data, true);
	let mut dec = detect.guess(None, true).new_decoder();
	let cap = dec
		.max_utf8_buffer_length(data.len())
		.ok_or_else(|| anyhow!("{} is too large to decode", p.display()))?;
	let mut text = String::with_capacity(cap);
	let (res, _read, had_errors) = dec.decode_to_string(&data, &mut text, true);
	ensure!(
		res == CoderResult::InputEmpty,
		"{}: decoding stopped early",
		p.display()
	);

	let name = dec.encoding().name();
	if had_errors {
		warn!("{}: invalid {name} sequences were replaced", p.display());
	}
	debug!("{}: decoding as {name}", p.display());

	toc::parse(&text).map_err(|e| anyhow!("error parsing {}: {}", p.display(), e))
}

impl Job {
	fn new_jobs(args: &Args, tocs: Vec<PathBuf>) -> Result<Vec<Self>> {
		let mut outs = BTreeMap::new();
		let mut jobs = Vec::with_capacity(tocs.len());

		for toc_path in tocs {
			let dir = match &args.out_dir {
				Some(d) => d.clone(),
				None => toc_path
					.parent()
					.map_or_else(PathBuf::new, Path::to_path_buf),
			};
			let out = dir.join(toc_path.with_extension("cue").file_name().unwrap_or_default());

			match outs.entry(out.clone()) {
				Entry::Vacant(x) => _ = x.insert(toc_path.clone()),
				Entry::Occupied(x) => bail!(
					"{} and {} would both be written to {}\nhelp: drop --out-dir or process them separately",
					x.get().display(),
					toc_path.display(),
					out.display(),
				),
			}

			if !args.force && !args.dry && !args.stdout && !args.dump && out.exists() {
				bail!(
					"{} already exists\nhelp: pass --force to overwrite it",
					out.display()
				);
			}

			jobs.push(Self { toc_path, out });
		}

		Ok(jobs)
	}

	fn run(&self, args: &Args, opts: &CueOptions) -> Result<String> {
		let table = read_toc(&self.toc_path)?;
		info!(
			"{}: {} tracks",
			self.toc_path.display(),
			table.tracks.len()
		);

		if args.dump {
			return Ok(table.to_string());
		}

		let text = cue::render(&table, opts);
		if args.dry || args.stdout {
			return Ok(text);
		}

		if let Some(parent) = self.out.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)
				.map_err(|e| anyhow!("error creating directory {}: {}", parent.display(), e))?;
		}
		fs::write(&self.out, &text)
			.map_err(|e| anyhow!("error writing {}: {}", self.out.display(), e))?;
		info!("wrote {}", self.out.display());

		Ok(text)
	}
}

fn run() -> Result<()> {
	let args = Args::parse();

	env_logger::builder()
		.filter_level(args.log_level())
		.parse_default_env()
		.init();

	if !args.path.exists() {
		bail!("file or directory does not exist: {}", args.path.display());
	}

	if let Some(n) = args.jobs.or_else(|| {
		std::thread::available_parallelism()
			.ok()
			.map(|n| n.get() / 2 + 1)
	}) {
		let _ = rayon::ThreadPoolBuilder::new()
			.num_threads(n)
			.build_global();
	}

	let tocs = find_tocs(&args.path);
	ensure!(!tocs.is_empty(), "no .toc files found");

	let opts = CueOptions {
		default_file: args.file.clone(),
		file_type: args.file_type.clone(),
	};

	let jobs = Job::new_jobs(&args, tocs)?;
	let outputs = jobs
		.par_iter()
		.map(|j| j.run(&args, &opts))
		.collect::<Result<Vec<_>>>()?;

	if args.stdout || args.dump {
		let mut stdout = io::stdout().lock();
		for (job, text) in jobs.iter().zip(&outputs) {
			if jobs.len() > 1 {
				writeln!(stdout, "// {}", job.toc_path.display())?;
			}
			stdout.write_all(text.as_bytes())?;
		}
	}

	Ok(())
}

fn main() {
	if let Err(e) = run() {
		eprintln!("error: {e:?}");
		std::process::exit(1);
	}
}
