//! Generation from a relative project root.
//!
//! Changes the process working directory, so it lives in its own test binary.

#![cfg(unix)]

use cosmogen_sdk::{CancellationToken, Codegen, GenerateOptionsBuilder};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use tempfile::TempDir;

#[tokio::test]
async fn test_relative_project_root_reaches_compiler_as_absolute_paths() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("chain");
    fs::create_dir_all(project.join("proto/a/v1")).unwrap();
    fs::write(
        project.join("proto/a/v1/types.proto"),
        "syntax = \"proto3\";\npackage a.v1;\n\nmessage Params {}\n",
    )
    .unwrap();
    fs::create_dir_all(project.join("include/google/protobuf")).unwrap();
    fs::write(project.join("include/google/protobuf/descriptor.proto"), "syntax = \"proto2\";\n").unwrap();

    // Fails unless every include dir and source exists from inside the staging dir
    let script = temp.path().join("checking-protoc.sh");
    fs::write(
        &script,
        concat!(
            "#!/bin/sh\n",
            "for arg in \"$@\"; do\n",
            "  case \"$arg\" in\n",
            "    --proto_path=*) [ -d \"${arg#--proto_path=}\" ] || { echo \"$arg: missing (cwd=$PWD)\" >&2; exit 1; } ;;\n",
            "    *.proto) [ -f \"$arg\" ] || { echo \"$arg: missing (cwd=$PWD)\" >&2; exit 1; }\n",
            "             mkdir -p out/gen && cp \"$arg\" out/gen/ ;;\n",
            "  esac\n",
            "done\n",
        ),
    )
    .unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    std::env::set_current_dir(&project).unwrap();

    let options = GenerateOptionsBuilder::default()
        .project_root(".")
        .target_mapping("out")
        .directives(vec!["--fake_out=.".to_string()])
        .standard_include(Some(PathBuf::from("include")))
        .system_include_search(false)
        .protoc(script.display().to_string())
        .build()
        .unwrap();

    let report = Codegen::new(options).run(&CancellationToken::new()).await.unwrap();

    assert!(report.include_paths.iter().all(|dir| dir.is_absolute()));
    assert!(report.packages[0].files.iter().all(|file| file.is_absolute()));
    assert_eq!(report.files_generated(), &[PathBuf::from("gen/types.proto")]);
    assert!(project.join("gen/types.proto").is_file());
}
