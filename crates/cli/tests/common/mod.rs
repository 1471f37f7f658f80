#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

/// Create an object file plus a sidecar holding `foo` and any `extra` functions.
pub fn write_object(root: &Path, rel: &str, extra: &[&str]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"\x7fELF").unwrap();

    let mut functions = serde_json::Map::new();
    functions.insert(
        "foo".into(),
        serde_json::json!({
            "asm": "push rbp\nmov rbp, rsp\nret",
            "filtered_instructions": ["X_push_rbp", "X_mov_rbp_rsp", "X_ret"],
        }),
    );
    for name in extra {
        functions.insert(
            (*name).to_string(),
            serde_json::json!({ "asm": "nop\nret", "filtered_instructions": ["X_nop", "X_ret"] }),
        );
    }
    let mut sidecar = path.as_os_str().to_os_string();
    sidecar.push(".funcs.json");
    fs::write(sidecar, serde_json::Value::Object(functions).to_string()).unwrap();
    path
}

pub fn write_vocab(dir: &Path) -> PathBuf {
    let path = dir.join("word2id.json");
    fs::write(&path, r#"{"X_UNK": 1, "X_push_rbp": 2, "X_mov_rbp_rsp": 3, "X_ret": 4}"#)
        .unwrap();
    path
}

/// `asmdb build` over `root` into `db` with the sidecar extractor.
pub fn build_cmd(root: &Path, db: &Path, vocab: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("asmdb");
    cmd.arg("build")
        .arg("--root")
        .arg(root)
        .arg("--db")
        .arg(db)
        .arg("--vocab")
        .arg(vocab)
        .arg("--extractor")
        .arg("sidecar")
        .arg("--jobs")
        .arg("2")
        .arg("--seed")
        .arg("11");
    cmd
}

pub fn run_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("json output")
}
