use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get a Command for the imgprobe binary.
#[allow(deprecated)]
fn imgprobe_cmd() -> Command {
    let mut cmd = Command::cargo_bin("imgprobe").unwrap();
    cmd.env_remove("IMGPROBE_RUNTIME")
        .env_remove("IMGPROBE_DOCKERFILE")
        .env_remove("IMGPROBE_TIMEOUT")
        .env("NO_COLOR", "1");
    cmd
}

/// docker stand-in: `inspect` reports $FAKE_RUNNING, `image inspect` a
/// 4MiB image, anything run inside a container is "not found".
#[cfg(unix)]
fn fake_runtime(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-docker");
    std::fs::write(&path, r#"#!/bin/sh
case "$1" in
  inspect) printf '[{"State":{"Running":%s}}]\n' "${FAKE_RUNNING:-false}" ;;
  image)   printf '[{"Size":4194304}]\n' ;;
  *)       echo 'exec: executable file not found in $PATH' >&2; exit 127 ;;
esac
"#).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_dockerfile(dir: &TempDir, text: &str) -> PathBuf {
    let path = dir.path().join("Dockerfile");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn help_works() {
    imgprobe_cmd().arg("--help").assert().success();
}

#[test]
fn security_check_requires_an_image() {
    imgprobe_cmd()
        .arg("security-check")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn out_of_range_timeout_is_a_usage_error() {
    for value in ["0", "3601", "18446744073709551615"] {
        imgprobe_cmd()
            .args(["--timeout", value, "certificate-check", "web"])
            .assert()
            .code(1)
            .stdout(predicate::str::is_empty())
            .stderr(predicate::str::contains("--timeout"));
    }

    imgprobe_cmd()
        .args(["certificate-check", "web"])
        .env("IMGPROBE_TIMEOUT", "99999")
        .assert()
        .code(1);
}

#[test]
fn missing_runtime_is_fatal_for_certificate_check() {
    imgprobe_cmd()
        .args(["--runtime", "imgprobe-no-such-runtime", "certificate-check", "web"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error:"));
}

#[cfg(unix)]
#[test]
fn scratch_image_with_ca_bundle_passes() {
    let dir = TempDir::new().unwrap();
    let runtime = fake_runtime(dir.path());
    let dockerfile = write_dockerfile(&dir,
        "FROM golang:1.22 AS build\n\
         FROM scratch\n\
         COPY --from=build /etc/ssl/certs/ca-certificates.crt /etc/ssl/certs/\n\
         COPY --from=build /out/app /app\n");

    imgprobe_cmd()
        .arg("--runtime").arg(&runtime)
        .arg("--dockerfile").arg(&dockerfile)
        .args(["security-check", "app:latest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Image class  : scratch"))
        .stdout(predicate::str::contains("[PASS] CA certificates"))
        .stdout(predicate::str::contains("4.0MiB"))
        .stdout(predicate::str::contains("Result       : PASSED"));
}

#[cfg(unix)]
#[test]
fn unreachable_app_binary_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let runtime = fake_runtime(dir.path());
    let dockerfile = write_dockerfile(&dir,
        "FROM scratch\nCOPY ca-certificates.crt /etc/ssl/certs/\nCOPY app /app\n");

    imgprobe_cmd()
        .arg("--runtime").arg(&runtime)
        .arg("--dockerfile").arg(&dockerfile)
        .args(["security-check", "app:latest", "/app"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("[FAIL] App binary"));
}

#[cfg(unix)]
#[test]
fn stopped_container_is_fatal() {
    let dir = TempDir::new().unwrap();
    let runtime = fake_runtime(dir.path());

    imgprobe_cmd()
        .arg("--runtime").arg(&runtime)
        .arg("certificate-check")
        .env("FAKE_RUNNING", "false")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("container app-container is not running"));
}

#[cfg(unix)]
#[test]
fn certificate_check_is_informational_unless_strict() {
    let dir = TempDir::new().unwrap();
    let runtime = fake_runtime(dir.path());
    let dockerfile = dir.path().join("Dockerfile");

    imgprobe_cmd()
        .arg("--runtime").arg(&runtime)
        .arg("--dockerfile").arg(&dockerfile)
        .args(["certificate-check", "web"])
        .env("FAKE_RUNNING", "true")
        .assert()
        .success()
        .stdout(predicate::str::contains("[FAIL] HTTPS"))
        .stdout(predicate::str::contains("[WARN] SMTP STARTTLS"));

    imgprobe_cmd()
        .arg("--runtime").arg(&runtime)
        .arg("--dockerfile").arg(&dockerfile)
        .args(["certificate-check", "web", "--strict"])
        .env("FAKE_RUNNING", "true")
        .assert()
        .code(1);
}
