use std::fs;
use std::path::Path;

use symstate::{canonicalize_or_current, infer_session_name, parse_address, sha256_bytes, sha256_file};
use tempfile::tempdir;

#[test]
fn canonicalize_or_current_returns_cwd_for_dot() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current(".").expect("canonicalize").canonicalize().expect("canon");
    let expected = tmp.path().canonicalize().expect("canon tmp");
    assert_eq!(result, expected);

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn canonicalize_or_current_resolves_existing_relative_path() {
    let original = std::env::current_dir().expect("cwd");
    let tmp = tempdir().expect("tempdir");
    let subdir = tmp.path().join("nested");
    fs::create_dir_all(&subdir).expect("create nested");
    std::env::set_current_dir(tmp.path()).expect("chdir tmp");

    let result = canonicalize_or_current("nested").expect("canonicalize nested");
    assert_eq!(result, subdir.canonicalize().expect("canonicalize subdir"));

    std::env::set_current_dir(original).expect("restore cwd");
}

#[test]
fn infer_session_name_uses_last_path_component() {
    assert_eq!(infer_session_name(Path::new("C:/work/melee")), "melee");
    assert_eq!(infer_session_name(Path::new("/tmp/session-root")), "session-root");
}

#[test]
fn infer_session_name_falls_back_when_missing() {
    assert_eq!(infer_session_name(Path::new("/")), "unnamed-session");
}

#[test]
fn parse_address_accepts_prefixed_and_bare_hex() {
    assert_eq!(parse_address("0x80003100").expect("prefixed"), 0x8000_3100);
    assert_eq!(parse_address("0X8000abcd").expect("upper prefix"), 0x8000_ABCD);
    assert_eq!(parse_address(" 80003100 ").expect("bare"), 0x8000_3100);
}

#[test]
fn parse_address_rejects_garbage() {
    let err = parse_address("main").unwrap_err();
    assert!(err.to_string().contains("Invalid address 'main'"));
    assert!(parse_address("0x1_0000_0000").is_err());
}

#[test]
fn file_and_buffer_digests_agree() {
    let tmp = tempdir().expect("tempdir");
    let path = tmp.path().join("state.s01");
    fs::write(&path, b"abc").expect("write");

    let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
    assert_eq!(sha256_bytes(b"abc"), expected);
    assert_eq!(sha256_file(&path).expect("hash file"), expected);
}
