use std::{fs, path::Path};

use netsim::{config::RunnerKind, dispatch, Config};
use walkdir::WalkDir;

fn copy_fixture(target: &Path) {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project");
    for entry in WalkDir::new(&fixture) {
        let entry = entry.unwrap();
        let path = target.join(entry.path().strip_prefix(&fixture).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&path).unwrap();
        } else {
            fs::copy(entry.path(), &path).unwrap();
        }
    }
}

#[test]
fn native_commands() {
    let dir = tempfile::tempdir().unwrap();
    copy_fixture(dir.path());
    let config = Config {
        project_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    assert_eq!(dispatch::run(["netsim", "test_alu"], &config), 0);
    assert_eq!(dispatch::run(["netsim", "test_regfile"], &config), 0);
    assert!(dir.path().join("tests/unit-regfile/out/regfile-x0.out").is_file());
    // No pipelined reference for the integration test
    assert_eq!(dispatch::run(["netsim", "test_addi", "-p"], &config), 1);
    // Bad runner flags are the runner's usage error
    assert_eq!(dispatch::run(["netsim", "test_alu", "--bogus"], &config), 2);
    assert_eq!(dispatch::run(["netsim", "test_alu", "--help"], &config), 0);
}

#[test]
fn unknown_commands_print_help() {
    let config = Config::default();
    assert_eq!(dispatch::run(["netsim", "part_b"], &config), 1);
    assert_eq!(dispatch::run(["netsim"], &config), 1);
    assert_eq!(dispatch::run(["netsim", "help"], &config), 1);
    assert_eq!(dispatch::run(["netsim", "--version"], &config), 1);
}

#[cfg(unix)]
mod external {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    /// A stand-in interpreter that records its arguments and exits with 3.
    fn fake_python(dir: &Path, version: &str) -> String {
        let path = dir.join("fake-python");
        fs::write(
            &path,
            format!(
                "#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo '{version}'; exit 0; fi\n\
                 echo \"$@\" > invoked.txt\nexit 3\n"
            ),
        )
        .unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path.display().to_string()
    }

    #[test]
    fn forwards_to_the_course_scripts() {
        let bin = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let config = Config {
            project_dir: project.path().to_path_buf(),
            runner: RunnerKind::External,
            python: Some(fake_python(bin.path(), "Python 3.11.4")),
            ..Config::default()
        };
        let invoked = project.path().join("invoked.txt");

        assert_eq!(dispatch::run(["netsim", "test_alu", "-p"], &config), 3);
        assert_eq!(
            fs::read_to_string(&invoked).unwrap(),
            "tools/run_test.py tests/unit-alu -p\n"
        );

        assert_eq!(dispatch::run(["netsim", "part_a"], &config), 3);
        assert_eq!(
            fs::read_to_string(&invoked).unwrap(),
            "tools/run_test.py tests/unit-alu tests/unit-regfile tests/integration-addi\n"
        );

        assert_eq!(
            dispatch::run(["netsim", "download_tools", "--force", "-v"], &config),
            3
        );
        assert_eq!(
            fs::read_to_string(&invoked).unwrap(),
            "tools/download_tools.py --force -v\n"
        );
    }

    #[test]
    fn download_tools_ignores_the_runner_choice() {
        let bin = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let config = Config {
            project_dir: project.path().to_path_buf(),
            python: Some(fake_python(bin.path(), "Python 3.12.0")),
            ..Config::default()
        };
        assert_eq!(dispatch::run(["netsim", "download_tools"], &config), 3);
        assert_eq!(
            fs::read_to_string(project.path().join("invoked.txt")).unwrap(),
            "tools/download_tools.py\n"
        );
    }

    #[test]
    fn python2_is_refused() {
        let bin = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let config = Config {
            project_dir: project.path().to_path_buf(),
            runner: RunnerKind::External,
            python: Some(fake_python(bin.path(), "Python 2.7.18")),
            ..Config::default()
        };
        assert_eq!(dispatch::run(["netsim", "test_regfile"], &config), 1);
        assert!(!project.path().join("invoked.txt").exists());
    }

    #[test]
    fn missing_interpreter() {
        let project = tempfile::tempdir().unwrap();
        let config = Config {
            project_dir: project.path().to_path_buf(),
            python: Some("/nonexistent/python3".to_string()),
            ..Config::default()
        };
        assert_eq!(dispatch::run(["netsim", "download_tools"], &config), 1);
    }
}
