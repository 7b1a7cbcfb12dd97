use std::fs;
use std::path::PathBuf;
use toml::Value;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|path| path.parent())
        .expect("crates/binexplorer-app should have a workspace root parent")
        .to_path_buf()
}

fn workspace_members() -> Vec<String> {
    let manifest =
        fs::read_to_string(repo_root().join("Cargo.toml")).expect("read workspace Cargo.toml");
    let parsed: Value = manifest.parse().expect("parse workspace Cargo.toml");
    parsed
        .get("workspace")
        .and_then(|workspace| workspace.get("members"))
        .and_then(Value::as_array)
        .expect("workspace.members array")
        .iter()
        .filter_map(Value::as_str)
        .map(ToOwned::to_owned)
        .collect()
}

#[test]
fn workspace_manifest_lists_all_crates() {
    let members = workspace_members();
    let crates_dir = repo_root().join("crates");
    let entries = fs::read_dir(&crates_dir).expect("read crates directory");
    for entry in entries {
        let entry = entry.expect("read crate entry");
        let path = entry.path();
        if !path.is_dir() || !path.join("Cargo.toml").exists() {
            continue;
        }

        let crate_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("crate directory name must be valid UTF-8");
        let expected_member = format!("crates/{crate_name}");
        assert!(
            members.contains(&expected_member),
            "workspace manifest is missing member {expected_member}",
        );
    }
}

#[test]
fn workspace_members_all_exist() {
    let root = repo_root();
    for member in workspace_members() {
        assert!(
            root.join(&member).join("Cargo.toml").exists(),
            "workspace member {member} has no Cargo.toml",
        );
    }
}

#[test]
fn only_the_app_crate_pulls_in_the_http_client() {
    let crates_dir = repo_root().join("crates");
    for entry in fs::read_dir(&crates_dir).expect("read crates directory") {
        let path = entry.expect("read crate entry").path();
        let manifest_path = path.join("Cargo.toml");
        if !manifest_path.exists() {
            continue;
        }
        let crate_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("crate directory name must be valid UTF-8");
        if crate_name == "binexplorer-app" || crate_name == "binexplorer-client" {
            continue;
        }

        let manifest = fs::read_to_string(&manifest_path)
            .unwrap_or_else(|_| panic!("read {}", manifest_path.display()));
        assert!(
            !manifest.contains("binexplorer-client") && !manifest.contains("reqwest"),
            "{} must reach the backend through the query seam",
            manifest_path.display(),
        );
    }
}
