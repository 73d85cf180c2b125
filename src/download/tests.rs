#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;

use super::*;
use crate::catalog::{Dataset, DownloadMethod};

fn dataset(method: DownloadMethod, auth_required: bool, source: &str) -> Dataset {
    Dataset {
        id: "testset".to_string(),
        name: "Test Set".to_string(),
        description: String::new(),
        category: "test".to_string(),
        auth_required,
        download_method: method,
        source: source.to_string(),
        size: "1 GB".to_string(),
    }
}

#[test]
fn open_s3_sync_is_unsigned() {
    let d = dataset(DownloadMethod::AwsS3, false, "s3://openneuro.org/ds000114");
    let (program, args) = command_for(&d, Path::new("/data/ds000114"));
    assert_eq!(program, "aws");
    assert_eq!(
        args,
        vec![
            "s3",
            "sync",
            "s3://openneuro.org/ds000114",
            "/data/ds000114",
            "--no-sign-request"
        ]
    );
}

#[test]
fn gated_s3_sync_uses_credentials() {
    let d = dataset(DownloadMethod::AwsS3, true, "s3://hcp-openaccess/HCP_1200");
    let (_, args) = command_for(&d, Path::new("/data/hcp"));
    assert!(!args.contains(&"--no-sign-request".to_string()));
}

#[test]
fn aria2c_resumes_into_dest_dir() {
    let d = dataset(DownloadMethod::Aria2c, false, "https://example.org/t1.tar");
    let (program, args) = command_for(&d, Path::new("/data/ixi"));
    assert_eq!(program, "aria2c");
    assert_eq!(args, vec!["-c", "-x", "8", "-d", "/data/ixi", "https://example.org/t1.tar"]);
}

#[test]
fn datalad_installs_recursively() {
    let d = dataset(DownloadMethod::Datalad, true, "https://github.com/x/y.git");
    let (program, args) = command_for(&d, Path::new("/data/oasis"));
    assert_eq!(program, "datalad");
    assert_eq!(args[0], "install");
    assert!(args.contains(&"-r".to_string()));
    assert_eq!(args.last().unwrap(), "/data/oasis");
}

#[test]
fn render_quotes_spaced_arguments() {
    let args = vec!["sync".to_string(), "/my data/out".to_string()];
    assert_eq!(render_command("aws", &args), "aws sync '/my data/out'");
}

#[test]
fn auth_check_passes_open_datasets_without_prompting() {
    let d = dataset(DownloadMethod::AwsS3, false, "s3://openneuro.org/ds000114");
    assert!(check_auth(&d));
}
