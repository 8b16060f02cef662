use toccata::{
	cue::{
		self,
		CueOptions,
	},
	toc::{
		self,
		Index,
	},
	Table,
};

const ACE_TOC: &str = include_str!("data/ace.toc");
const ACE_CUE: &str = include_str!("data/ace.cue");

fn render(toc: &str) -> String {
	let table = toc::parse(toc).unwrap_or_else(|e| panic!("{e}\n{toc}"));
	cue::render(&table, &CueOptions::default())
}

/// Disc positions of a single-file sheet laid out from sector 0, where every
/// `PREGAP` is silence missing from the file.
fn disc_indices(sheet: &cue::CueSheet) -> Vec<(u8, Vec<Index>)> {
	let mut silence = 0;
	sheet
		.tracks()
		.map(|c| {
			let mut indices = Vec::new();
			if let Some(gap) = c.pregap {
				indices.push(Index {
					number: 0,
					offset: c.indices[0].offset + silence,
				});
				silence += gap;
			}
			indices.extend(c.indices.iter().map(|i| Index {
				number: i.number,
				offset: i.offset + silence,
			}));
			(c.number, indices)
		})
		.collect()
}

fn assert_round_trip(table: &Table) {
	let text = cue::render(table, &CueOptions::default());
	let sheet = cue::parse(&text).unwrap_or_else(|e| panic!("{e}\n{text}"));

	let got = disc_indices(&sheet);
	assert_eq!(got.len(), table.tracks.len());
	for ((number, indices), t) in got.iter().zip(&table.tracks) {
		assert_eq!(*number, t.number);
		assert_eq!(indices, &t.indices, "track {}\n{text}", t.number);
	}
}

#[test]
fn renders_cdrdao_toc() {
	let table = toc::parse(ACE_TOC).unwrap();
	assert_eq!(cue::render(&table, &CueOptions::default()), ACE_CUE);
}

#[test]
fn rendering_is_deterministic() {
	let a = toc::parse(ACE_TOC).unwrap();
	let b = toc::parse(ACE_TOC).unwrap();
	let opts = CueOptions::default();
	assert_eq!(cue::render(&a, &opts), cue::render(&b, &opts));
}

#[test]
fn round_trips_structure() {
	assert_round_trip(&toc::parse(ACE_TOC).unwrap());
}

#[test]
fn round_trips_generated_layouts() {
	for n in 1..=12u32 {
		let mut toc = String::from("CD_DA\n");
		let mut offset = 0;
		for i in 1..=n {
			let pregap = (i * 37) % 200;
			let len = 1000 + i * 4567;
			toc.push_str("TRACK AUDIO\n");
			if pregap > 0 {
				toc.push_str(&format!("PREGAP {}\n", toccata::msf::Msf::from_sectors(pregap)));
			}
			toc.push_str(&format!(
				"FILE \"disc.wav\" {} {}\n",
				toccata::msf::Msf::from_sectors(offset),
				toccata::msf::Msf::from_sectors(len)
			));
			if i % 3 == 0 {
				toc.push_str("INDEX 00:05:00\nINDEX 00:07:30\n");
			}
			offset += len;
		}

		let table = toc::parse(&toc).unwrap_or_else(|e| panic!("{e}\n{toc}"));
		assert_round_trip(&table);
	}
}

#[test]
fn silent_pregap_is_not_in_the_file() {
	let toc = "\
TRACK AUDIO
FILE \"data.wav\" 0 03:00:00
TRACK AUDIO
PREGAP 00:02:00
FILE \"data.wav\" 03:00:00 01:00:00
";
	assert_eq!(
		render(toc),
		"\
FILE \"data.wav\" WAVE
  TRACK 01 AUDIO
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    PREGAP 00:02:00
    INDEX 01 03:00:00
"
	);
	assert_round_trip(&toc::parse(toc).unwrap());
}

#[test]
fn index_times_follow_the_file_start() {
	let toc = "\
TRACK AUDIO
FILE \"data.wav\" 00:10:00 03:00:00
TRACK AUDIO
FILE \"data.wav\" 03:10:00 01:00:00
INDEX 00:30:00
";
	assert_eq!(
		render(toc),
		"\
FILE \"data.wav\" WAVE
  TRACK 01 AUDIO
    INDEX 01 00:10:00
  TRACK 02 AUDIO
    INDEX 01 03:10:00
    INDEX 02 03:40:00
"
	);
}

#[test]
fn pregap_partly_in_the_file() {
	let toc = "\
TRACK AUDIO
FILE \"data.wav\" 0 01:00:00
TRACK AUDIO
SILENCE 00:01:00
FILE \"data.wav\" 01:00:00 01:00:00
START 00:03:00
TRACK AUDIO
SILENCE 00:00:30
";
	assert_eq!(
		render(toc),
		"\
FILE \"data.wav\" WAVE
  TRACK 01 AUDIO
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    PREGAP 00:01:00
    INDEX 00 01:00:00
    INDEX 01 01:02:00
  TRACK 03 AUDIO
    INDEX 01 02:00:00
"
	);
}

#[test]
fn reads_cue_metadata() {
	let sheet = cue::parse(ACE_CUE).unwrap();
	assert_eq!(sheet.catalog.as_deref(), Some("0724384260910"));
	assert_eq!(sheet.performer.as_deref(), Some("Motörhead"));
	assert_eq!(sheet.files.len(), 1);
	assert_eq!(sheet.files[0].name, "data.wav");
	assert_eq!(sheet.files[0].file_type, "WAVE");

	let t3 = &sheet.files[0].tracks[2];
	assert_eq!(t3.mode, "AUDIO");
	assert_eq!(t3.title.as_deref(), Some(r#"The "Hammer""#));
	assert_eq!(t3.flags, ["DCP", "PRE"]);
	assert_eq!(sheet.files[0].tracks[0].isrc.as_deref(), Some("GBAYE8000351"));
}

#[test]
fn one_file_line_per_source() {
	let toc = r#"
CD_ROM_XA
TRACK MODE2_RAW
DATAFILE "track01.bin" 00:30:00
TRACK AUDIO
FILE "track02.wav" 0 00:20:00
TRACK AUDIO
START 00:02:00
FILE "track03.wav" 0 00:20:00
TRACK AUDIO
SILENCE 00:01:00
"#;
	let table = toc::parse(toc).unwrap();
	let text = cue::render(&table, &CueOptions::default());
	assert_eq!(
		text,
		"\
FILE \"track01.bin\" BINARY
  TRACK 01 MODE2/2352
    INDEX 01 00:00:00
FILE \"track02.wav\" WAVE
  TRACK 02 AUDIO
    INDEX 01 00:00:00
FILE \"track03.wav\" WAVE
  TRACK 03 AUDIO
    INDEX 00 00:00:00
    INDEX 01 00:02:00
  TRACK 04 AUDIO
    INDEX 01 00:20:00
"
	);

	let sheet = cue::parse(&text).unwrap();
	assert_eq!(sheet.files.len(), 3);
	assert_eq!(sheet.files[2].tracks.len(), 2);
}

#[test]
fn default_file_name_for_sourceless_tracks() {
	let table = toc::parse("TRACK AUDIO\nSILENCE 00:01:00\n").unwrap();
	let opts = CueOptions {
		default_file: "image.flac".into(),
		file_type: "FLAC".into(),
	};
	assert_eq!(
		cue::render(&table, &opts),
		"FILE \"image.flac\" FLAC\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\n"
	);
}

#[test]
fn cue_reader_rejects_structural_problems() {
	assert!(cue::parse("").is_err());
	assert!(cue::parse("TRACK 01 AUDIO\n").is_err());
	assert!(cue::parse("FILE \"a.wav\" WAVE\n  TRACK 01 AUDIO\n").is_err());
	assert!(cue::parse("FILE \"a.wav\" WAVE\n  TRACK 02 AUDIO\n    INDEX 01 00:00:00\n").is_err());
	assert!(cue::parse(
		"FILE \"a.wav\" WAVE\n  TRACK 01 AUDIO\n    INDEX 01 00:02:00\n    INDEX 02 00:01:00\n"
	)
	.is_err());
}
