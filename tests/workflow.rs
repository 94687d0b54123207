//! Workflow iterations: capture, prefix, ledger.

use std::fs;
use tempfile::TempDir;
use tether_capture::camera::{CameraEvent, DeviceError, DriverOptions, ScriptedCamera};
use tether_capture::capture::{CaptureError, CaptureProfile, OutputConfig};
use tether_capture::{CancelToken, CaptureMetrics, Workflow, WorkflowError};

fn output_in(dir: &TempDir) -> OutputConfig {
    OutputConfig {
        directory: dir.path().join("output"),
        preview: false,
        ..OutputConfig::default()
    }
}

#[test]
fn iteration_prefixes_files_and_records_ledger() {
    let dir = TempDir::new().unwrap();
    let output = output_in(&dir);
    let workflow = Workflow::new(CaptureProfile::default(), &output);
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions::default());

    let report = workflow.run_once(&mut camera, " 4006381333931 ").unwrap();

    assert_eq!(report.prefix.as_str(), "4006381333931");
    assert_eq!(
        report.renamed,
        [
            output.directory.join("4006381333931_IMG_0001.JPG"),
            output.directory.join("4006381333931_IMG_0001.CR2"),
        ]
    );
    assert!(report.renamed.iter().all(|p| p.exists()));
    assert!(!output.directory.join("IMG_0001.JPG").exists());
    assert!(report.new_prefix);
    assert_eq!(report.previews_opened, 0);
    assert_eq!(
        fs::read_to_string(output.ledger_path()).unwrap(),
        "4006381333931\n"
    );
    assert_eq!(camera.close_count(), 1);
}

#[test]
fn repeated_prefix_is_recorded_once() {
    let dir = TempDir::new().unwrap();
    let output = output_in(&dir);
    let workflow = Workflow::new(CaptureProfile::default(), &output);
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions::default());

    workflow.run_once(&mut camera, "B2").unwrap();
    workflow.run_once(&mut camera, "A1").unwrap();
    let again = workflow.run_once(&mut camera, "B2").unwrap();

    assert!(!again.new_prefix);
    assert_eq!(
        fs::read_to_string(output.ledger_path()).unwrap(),
        "A1\nB2\n"
    );
    assert!(output.directory.join("B2_IMG_0003.CR2").exists());
}

#[test]
fn each_prefix_gets_its_own_exposure() {
    let dir = TempDir::new().unwrap();
    let output = output_in(&dir);
    let workflow = Workflow::new(CaptureProfile::default(), &output);
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions::default());

    for (shot, prefix) in ["A", "B", "C"].into_iter().enumerate() {
        let report = workflow.run_once(&mut camera, prefix).unwrap();
        let stem = format!("IMG_{:04}", shot + 1);

        assert_eq!(
            report.capture.names(),
            [format!("{stem}.JPG"), format!("{stem}.CR2")]
        );
        assert_eq!(
            report.renamed,
            [
                output.directory.join(format!("{prefix}_{stem}.JPG")),
                output.directory.join(format!("{prefix}_{stem}.CR2")),
            ]
        );
    }
    assert_eq!(camera.open_count(), 3);
    assert_eq!(camera.close_count(), 3);
}

#[test]
fn empty_capture_still_records_prefix() {
    let dir = TempDir::new().unwrap();
    let output = output_in(&dir);
    let workflow = Workflow::new(CaptureProfile::default(), &output);
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_event(CameraEvent::Timeout);

    let report = workflow.run_once(&mut camera, "C3").unwrap();

    assert!(report.capture.is_empty());
    assert!(report.renamed.is_empty());
    assert!(workflow.ledger().load().unwrap().contains("C3"));
}

#[test]
fn invalid_prefix_never_touches_camera() {
    let dir = TempDir::new().unwrap();
    let workflow = Workflow::new(CaptureProfile::default(), &output_in(&dir));
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions::default());

    let err = workflow.run_once(&mut camera, "../etc").unwrap_err();

    assert!(matches!(err, WorkflowError::InvalidPrefix(_)));
    assert_eq!(camera.open_count(), 0);
}

#[test]
fn device_error_is_flagged_for_shutdown() {
    let dir = TempDir::new().unwrap();
    let workflow = Workflow::new(CaptureProfile::default(), &output_in(&dir));
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::new().fail_open(DeviceError::Claimed("gvfs".into()));

    let err = workflow.run_once(&mut camera, "D4").unwrap_err();

    assert!(err.is_device());
    assert!(workflow.ledger().load().unwrap().is_empty());
}

#[test]
fn cancelled_iteration_releases_camera() {
    let dir = TempDir::new().unwrap();
    let token = CancelToken::new();
    let workflow =
        Workflow::new(CaptureProfile::default(), &output_in(&dir)).with_cancel(token.clone());
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions::default());
    token.cancel();

    let err = workflow.run_once(&mut camera, "E5").unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Capture(CaptureError::Interrupted { .. })
    ));
    assert!(!err.is_device());
    assert_eq!(camera.close_count(), 1);
}

#[test]
fn metrics_follow_iterations() {
    let dir = TempDir::new().unwrap();
    let workflow = Workflow::new(CaptureProfile::default(), &output_in(&dir))
        .with_metrics(CaptureMetrics::new().unwrap());
    workflow.prepare().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions::default());

    workflow.run_once(&mut camera, "F6").unwrap();
    workflow.run_once(&mut camera, "F7").unwrap();

    let text = workflow.metrics().unwrap().encode().unwrap();
    assert!(text.contains("tether_capture_sessions_total 2"));
    assert!(text.contains("tether_capture_files_total 4"));
    assert!(text.contains("tether_capture_sessions_failed_total 0"));
}

#[test]
fn prepare_creates_output_and_ledger() {
    let dir = TempDir::new().unwrap();
    let output = output_in(&dir);
    let workflow = Workflow::new(CaptureProfile::default(), &output);

    workflow.prepare().unwrap();

    assert!(output.directory.is_dir());
    assert!(output.ledger_path().is_file());
}
