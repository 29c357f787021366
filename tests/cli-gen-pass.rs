use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn gen_pass_without_args_generates_password() {
    let mut cmd = Command::cargo_bin("pgroles").unwrap();
    cmd.arg("gen-pass")
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated password: "));
}

#[test]
fn gen_pass_with_length() {
    let mut cmd = Command::cargo_bin("pgroles").unwrap();
    let output = cmd.arg("gen-pass").arg("--length").arg("24").output().unwrap();

    let stdout = String::from_utf8(output.stdout).unwrap();
    let password = stdout
        .trim()
        .strip_prefix("Generated password: ")
        .expect("unexpected output");
    assert_eq!(password.len(), 24);
}

#[test]
fn gen_pass_with_username_only_is_rejected() {
    let mut cmd = Command::cargo_bin("pgroles").unwrap();
    cmd.arg("gen-pass")
        .arg("--username")
        .arg("duyet")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--username and --password must be given together",
        ));
}

#[test]
fn gen_pass_with_password_only_is_rejected() {
    let mut cmd = Command::cargo_bin("pgroles").unwrap();
    cmd.arg("gen-pass")
        .arg("--password")
        .arg("secret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--password"));
}

#[test]
fn gen_pass_with_username_and_password_prints_md5() {
    let mut cmd = Command::cargo_bin("pgroles").unwrap();
    cmd.arg("gen-pass")
        .arg("--username")
        .arg("duyet")
        .arg("--password")
        .arg("secret")
        .assert()
        .success()
        // md5('secretduyet')
        .stdout(predicate::str::contains("md5 hash: md5"));
}
