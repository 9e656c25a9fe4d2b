// CLI integration tests driving the rollbook binary against temp data dirs.
use std::path::Path;
use std::process::Command;

use serde_json::Value;

fn cmd(data_dir: &Path) -> Command {
    let exe = env!("CARGO_BIN_EXE_rollbook");
    let mut command = Command::new(exe);
    command
        .env_remove("ROLLBOOK_ENDPOINT")
        .env_remove("ROLLBOOK_TOKEN")
        .args(["--endpoint", "local", "--data-dir", data_dir.to_str().unwrap()]);
    command
}

fn parse_json(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

#[test]
fn list_seeds_and_sorts_by_roll_number() {
    let temp = tempfile::tempdir().expect("tempdir");

    let list = cmd(temp.path()).args(["list", "--json"]).output().expect("list");
    assert!(list.status.success());
    let value = parse_json(&list.stdout);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 4);

    let students = value.get("students").unwrap().as_array().unwrap();
    let rolls: Vec<&str> = students
        .iter()
        .map(|student| student.get("rollNo").unwrap().as_str().unwrap())
        .collect();
    // "056" parses as 56 and sorts numerically, not lexicographically.
    assert_eq!(rolls, ["056", "101", "205", "301"]);
    assert_eq!(
        students[0].get("studentName").unwrap().as_str().unwrap(),
        "Aarav Patel"
    );
}

#[test]
fn class_filter_and_search_follow_the_seed_scenario() {
    let temp = tempfile::tempdir().expect("tempdir");

    let by_class = cmd(temp.path())
        .args(["list", "--class", "V", "--json"])
        .output()
        .expect("list");
    assert!(by_class.status.success());
    let value = parse_json(&by_class.stdout);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 1);
    let students = value.get("students").unwrap().as_array().unwrap();
    assert_eq!(
        students[0].get("studentName").unwrap().as_str().unwrap(),
        "Ravi Sharma"
    );
    assert_eq!(students[0].get("rollNo").unwrap().as_str().unwrap(), "101");

    let by_search = cmd(temp.path())
        .args(["list", "--search", "kumar", "--json"])
        .output()
        .expect("list");
    let value = parse_json(&by_search.stdout);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 1);
    let students = value.get("students").unwrap().as_array().unwrap();
    assert_eq!(
        students[0].get("studentName").unwrap().as_str().unwrap(),
        "Deepak Kumar"
    );

    let delete = cmd(temp.path())
        .args(["delete", "4", "--yes", "--json"])
        .output()
        .expect("delete");
    assert!(delete.status.success());
    let value = parse_json(&delete.stdout);
    assert_eq!(value.get("deleted").unwrap().as_bool().unwrap(), true);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 3);

    let again = cmd(temp.path())
        .args(["list", "--search", "kumar", "--json"])
        .output()
        .expect("list");
    let value = parse_json(&again.stdout);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 0);
}

#[test]
fn add_assigns_a_fresh_id_and_grows_the_roster() {
    let temp = tempfile::tempdir().expect("tempdir");

    let add = cmd(temp.path())
        .args([
            "add",
            "--student-id",
            "S010",
            "--student-name",
            "Asha Verma",
            "--class",
            "III",
            "--section",
            "RISHI",
            "--roll-no",
            "12",
            "--json",
        ])
        .output()
        .expect("add");
    assert!(add.status.success());
    let value = parse_json(&add.stdout);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 5);
    let saved = value.get("saved").unwrap();
    assert_eq!(saved.get("studentName").unwrap().as_str().unwrap(), "Asha Verma");
    let id = saved.get("id").unwrap().as_str().unwrap();
    assert!(id.starts_with("S005-"), "unexpected id {id}");

    // The new record sorts first by its numeric roll.
    let list = cmd(temp.path()).args(["list", "--json"]).output().expect("list");
    let value = parse_json(&list.stdout);
    let students = value.get("students").unwrap().as_array().unwrap();
    assert_eq!(students[0].get("rollNo").unwrap().as_str().unwrap(), "12");
}

#[test]
fn update_edits_in_place_and_keeps_the_student_id() {
    let temp = tempfile::tempdir().expect("tempdir");

    let update = cmd(temp.path())
        .args(["update", "2", "--student-name", "Priya S. Singh", "--json"])
        .output()
        .expect("update");
    assert!(update.status.success());
    let value = parse_json(&update.stdout);
    assert_eq!(value.get("total").unwrap().as_i64().unwrap(), 4);
    let saved = value.get("saved").unwrap();
    assert_eq!(saved.get("studentName").unwrap().as_str().unwrap(), "Priya S. Singh");
    assert_eq!(saved.get("studentId").unwrap().as_str().unwrap(), "S002");
}

#[test]
fn delete_is_idempotent_across_invocations() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = cmd(temp.path())
        .args(["delete", "3", "--yes", "--json"])
        .output()
        .expect("delete");
    assert_eq!(parse_json(&first.stdout).get("total").unwrap().as_i64().unwrap(), 3);

    let second = cmd(temp.path())
        .args(["delete", "3", "--yes", "--json"])
        .output()
        .expect("delete");
    assert!(second.status.success());
    assert_eq!(parse_json(&second.stdout).get("total").unwrap().as_i64().unwrap(), 3);
}

#[test]
fn missing_required_fields_block_the_save() {
    let temp = tempfile::tempdir().expect("tempdir");

    let add = cmd(temp.path())
        .args(["add", "--student-id", "", "--student-name", "", "--json"])
        .output()
        .expect("add");
    assert!(!add.status.success());
    assert_eq!(add.status.code(), Some(4));
    let err = parse_json(&add.stderr);
    assert_eq!(
        err.get("error").unwrap().get("kind").unwrap().as_str().unwrap(),
        "Validation"
    );
}

#[test]
fn impossible_birth_date_is_rejected_before_saving() {
    let temp = tempfile::tempdir().expect("tempdir");

    let add = cmd(temp.path())
        .args([
            "add",
            "--student-id",
            "S010",
            "--student-name",
            "Asha Verma",
            "--date-of-birth",
            "2015-13-40",
            "--json",
        ])
        .output()
        .expect("add");
    assert_eq!(add.status.code(), Some(2));
    let err = parse_json(&add.stderr);
    assert_eq!(
        err.get("error").unwrap().get("kind").unwrap().as_str().unwrap(),
        "Usage"
    );

    // Nothing reached the backend; the roster is still the seed.
    let list = cmd(temp.path()).args(["list", "--json"]).output().expect("list");
    assert_eq!(parse_json(&list.stdout).get("total").unwrap().as_i64().unwrap(), 4);
}

#[test]
fn update_of_unknown_id_is_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");

    let update = cmd(temp.path())
        .args(["update", "no-such-id", "--student-name", "X", "--json"])
        .output()
        .expect("update");
    assert_eq!(update.status.code(), Some(3));
    let err = parse_json(&update.stderr);
    assert_eq!(
        err.get("error").unwrap().get("kind").unwrap().as_str().unwrap(),
        "NotFound"
    );
}

#[test]
fn unrecognized_endpoint_value_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let exe = env!("CARGO_BIN_EXE_rollbook");

    let list = Command::new(exe)
        .env_remove("ROLLBOOK_ENDPOINT")
        .args([
            "--endpoint",
            "spreadsheet42",
            "--data-dir",
            temp.path().to_str().unwrap(),
            "list",
            "--json",
        ])
        .output()
        .expect("list");
    assert_eq!(list.status.code(), Some(2));
    let err = parse_json(&list.stderr);
    assert_eq!(
        err.get("error").unwrap().get("kind").unwrap().as_str().unwrap(),
        "Usage"
    );
}
