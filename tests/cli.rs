use std::{
	fs,
	path::Path,
	process::{
		Command,
		Output,
	},
};

const ACE_TOC: &str = include_str!("data/ace.toc");
const ACE_CUE: &str = include_str!("data/ace.cue");

fn toccata(args: &[&str], path: &Path) -> Output {
	Command::new(env!("CARGO_BIN_EXE_toccata"))
		.args(args)
		.arg(path)
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to run toccata")
}

#[test]
fn writes_cue_next_to_toc() {
	let dir = tempfile::tempdir().unwrap();
	let nested = dir.path().join("rips/ace");
	fs::create_dir_all(&nested).unwrap();
	fs::write(nested.join("ace.toc"), ACE_TOC).unwrap();

	let out = toccata(&["-q"], dir.path());
	assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
	assert_eq!(fs::read_to_string(nested.join("ace.cue")).unwrap(), ACE_CUE);
}

#[test]
fn refuses_to_overwrite_without_force() {
	let dir = tempfile::tempdir().unwrap();
	let toc = dir.path().join("ace.toc");
	fs::write(&toc, ACE_TOC).unwrap();
	fs::write(dir.path().join("ace.cue"), "keep me").unwrap();

	let out = toccata(&[], &toc);
	assert!(!out.status.success());
	assert_eq!(fs::read_to_string(dir.path().join("ace.cue")).unwrap(), "keep me");

	let out = toccata(&["--force"], &toc);
	assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
	assert_eq!(fs::read_to_string(dir.path().join("ace.cue")).unwrap(), ACE_CUE);
}

#[test]
fn stdout_and_out_dir() {
	let dir = tempfile::tempdir().unwrap();
	let toc = dir.path().join("ace.toc");
	fs::write(&toc, ACE_TOC).unwrap();

	let out = toccata(&["--stdout"], &toc);
	assert!(out.status.success());
	assert_eq!(String::from_utf8(out.stdout).unwrap(), ACE_CUE);
	assert!(!dir.path().join("ace.cue").exists());

	let target = dir.path().join("out");
	let out = toccata(&["-o", target.to_str().unwrap()], &toc);
	assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
	assert!(target.join("ace.cue").exists());
}

#[test]
fn reports_structural_errors() {
	let dir = tempfile::tempdir().unwrap();
	let toc = dir.path().join("broken.toc");
	fs::write(&toc, "CD_DA\nINDEX 00:00:01\n").unwrap();

	let out = toccata(&["--dry"], &toc);
	assert!(!out.status.success());
	let stderr = String::from_utf8_lossy(&out.stderr);
	assert!(stderr.contains("line 2"), "{stderr}");
	assert!(stderr.contains("INDEX"), "{stderr}");
}

#[test]
fn latin1_files_are_decoded() {
	let dir = tempfile::tempdir().unwrap();
	let toc = dir.path().join("latin1.toc");
	let mut data = b"CD_DA\nTRACK AUDIO\nCD_TEXT { LANGUAGE 0 { TITLE \"Mot".to_vec();
	data.push(0xf6);
	data.extend_from_slice(b"rhead forever and ever\" } }\nSILENCE 00:01:00\n");
	fs::write(&toc, data).unwrap();

	let out = toccata(&["--stdout"], &toc);
	assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
	assert!(String::from_utf8(out.stdout).unwrap().contains("TITLE \"Motörhead forever and ever\""));
}
