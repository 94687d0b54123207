//! End-to-end capture sessions against the scripted camera.

use proptest::prelude::*;
use std::fs;
use tempfile::TempDir;
use tether_capture::camera::{
    CameraEvent, ConfigError, DeviceError, DriverOptions, ErrorSeverity, ScriptedCamera,
};
use tether_capture::capture::{
    capture_photo, collect, trigger, with_session, CaptureError, CaptureProfile, CaptureSession,
    CollectOptions, Destination, DoneReason, TriggerSequence,
};

fn run_capture(
    camera: &mut ScriptedCamera,
    dir: &TempDir,
) -> Result<tether_capture::CaptureResult, CaptureError> {
    let profile = CaptureProfile::default();
    let destination = Destination::new(dir.path());
    with_session(camera, |session| {
        capture_photo(session, &profile, &destination, &profile.collect_options())
    })
}

#[test]
fn full_session_collects_jpeg_and_raw() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_file("a.jpg", b"bytesA");
    camera.push_file("a.cr2", b"bytesB");
    camera.push_event(CameraEvent::CaptureComplete);

    let result = run_capture(&mut camera, &dir).unwrap();

    assert_eq!(result.names(), ["a.jpg", "a.cr2"]);
    assert!(result.has_jpeg_raw_pair());
    assert_eq!(fs::read(dir.path().join("a.jpg")).unwrap(), b"bytesA");
    assert_eq!(fs::read(dir.path().join("a.cr2")).unwrap(), b"bytesB");

    let applied: Vec<(&str, &str)> = camera
        .applied()
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect();
    assert_eq!(
        applied,
        [
            ("drivemode", "Single"),
            ("capturetarget", "Internal RAM"),
            ("imageformat", "RAW + Large Fine JPEG"),
            ("eosremoterelease", "Immediate"),
            ("eosremoterelease", "Release Full"),
        ]
    );
    assert_eq!(camera.open_count(), 1);
    assert_eq!(camera.close_count(), 1);
}

#[test]
fn trigger_then_timeout_yields_nothing() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_event(CameraEvent::Timeout);

    let result = with_session(&mut camera, |session| {
        trigger(session, &TriggerSequence::default())?;
        collect(session, &Destination::new(dir.path()), &CollectOptions::default())
    })
    .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.reason, DoneReason::Timeout);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    assert_eq!(camera.close_count(), 1);
}

#[test]
fn completion_without_files_uses_one_wait() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_event(CameraEvent::CaptureComplete);

    let result = run_capture(&mut camera, &dir).unwrap();

    assert!(result.is_empty());
    assert_eq!(result.reason, DoneReason::CaptureComplete);
    assert_eq!(camera.wait_calls(), 1);
}

#[test]
fn extra_files_are_left_on_the_camera() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_file("a.jpg", b"1");
    camera.push_file("a.cr2", b"2");
    camera.push_file("b.jpg", b"3");
    camera.push_event(CameraEvent::CaptureComplete);

    let result = run_capture(&mut camera, &dir).unwrap();

    assert_eq!(result.names(), ["a.jpg", "a.cr2"]);
    assert_eq!(result.reason, DoneReason::ExpectedFiles);
    assert!(!dir.path().join("b.jpg").exists());
    assert_eq!(camera.wait_calls(), 2);
}

#[test]
fn unknown_setting_aborts_before_trigger() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_file("a.jpg", b"1");
    let profile = CaptureProfile {
        trigger: TriggerSequence {
            control: "remoterelease".to_owned(),
            ..TriggerSequence::default()
        },
        ..CaptureProfile::default()
    };

    let result = with_session(&mut camera, |session| {
        capture_photo(
            session,
            &profile,
            &Destination::new(dir.path()),
            &profile.collect_options(),
        )
    });

    assert!(matches!(
        result,
        Err(CaptureError::Config(ConfigError::UnknownSetting(_)))
    ));
    assert_eq!(camera.wait_calls(), 0);
    assert_eq!(camera.close_count(), 1);
}

#[test]
fn illegal_format_stops_configuration() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    let profile = CaptureProfile {
        capture_target: "SD card 2".to_owned(),
        ..CaptureProfile::default()
    };

    let result = with_session(&mut camera, |session| {
        capture_photo(
            session,
            &profile,
            &Destination::new(dir.path()),
            &profile.collect_options(),
        )
    });

    assert!(matches!(
        result,
        Err(CaptureError::Config(ConfigError::InvalidValue { .. }))
    ));
    // Only drive mode made it to the camera.
    assert_eq!(camera.applied().len(), 1);
    assert_eq!(camera.setting("imageformat"), Some("Large Fine JPEG"));
}

#[test]
fn rejected_release_depends_on_severity() {
    let dir = TempDir::new().unwrap();
    let camera_with = |error_severity| {
        ScriptedCamera::simulated(DriverOptions { error_severity })
            .reject_setting("eosremoterelease", "generic error")
    };

    let mut strict = camera_with(ErrorSeverity::Error);
    let err = run_capture(&mut strict, &dir).unwrap_err();
    assert!(matches!(
        err,
        CaptureError::Config(ConfigError::Rejected { .. })
    ));
    assert_eq!(strict.wait_calls(), 0);

    // The swallowed writes never fire the shutter, so the session times out
    // empty instead of failing.
    let mut lenient = camera_with(ErrorSeverity::Warn);
    let result = run_capture(&mut lenient, &dir).unwrap();
    assert!(result.is_empty());
    assert_eq!(result.reason, DoneReason::Timeout);
    assert_eq!(lenient.close_count(), 1);
}

#[test]
fn flaky_transport_is_tolerated_when_suppressed() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::simulated(DriverOptions {
        error_severity: ErrorSeverity::Warn,
    })
    .fail_waits(1);

    let result = run_capture(&mut camera, &dir).unwrap();

    assert_eq!(result.names(), ["IMG_0001.JPG", "IMG_0001.CR2"]);
}

#[test]
fn missing_camera_is_a_device_error() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new().fail_open(DeviceError::NotFound);

    let err = run_capture(&mut camera, &dir).unwrap_err();

    assert!(err.is_device());
    assert_eq!(camera.close_count(), 0);
}

#[test]
fn failed_write_still_releases_camera() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::new();
    camera.push_file("a.jpg", b"1");
    let profile = CaptureProfile::default();
    let missing = Destination::new(dir.path().join("not-created"));

    let result = with_session(&mut camera, |session| {
        capture_photo(session, &profile, &missing, &profile.collect_options())
    });

    assert!(matches!(result, Err(CaptureError::Persist { .. })));
    assert_eq!(camera.close_count(), 1);
}

#[test]
fn simulated_camera_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut camera = ScriptedCamera::simulated(Default::default());

    let first = run_capture(&mut camera, &dir).unwrap();
    let second = run_capture(&mut camera, &dir).unwrap();

    assert_eq!(first.names(), ["IMG_0001.JPG", "IMG_0001.CR2"]);
    assert_eq!(second.names(), ["IMG_0002.JPG", "IMG_0002.CR2"]);
    assert!(second.has_jpeg_raw_pair());
    assert_eq!(camera.open_count(), 2);
    assert_eq!(camera.close_count(), 2);
}

#[test]
fn explicit_session_guard_closes_on_drop() {
    let mut camera = ScriptedCamera::new();
    {
        let session = CaptureSession::open(&mut camera).unwrap();
        assert!(session.is_open());
    }
    assert_eq!(camera.close_count(), 1);
}

proptest! {
    /// Whatever the delivery order, and whatever noise surrounds it, the
    /// pair is collected exactly.
    #[test]
    fn pair_collected_regardless_of_order(
        raw_first in any::<bool>(),
        noise_before in 0usize..4,
        noise_between in 0usize..4,
    ) {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::new();
        let (first, second) = if raw_first {
            ("x.cr2", "x.jpg")
        } else {
            ("x.jpg", "x.cr2")
        };

        for i in 0..noise_before {
            camera.push_event(CameraEvent::Other(format!("PropertyChanged{i}")));
        }
        camera.push_file(first, first.as_bytes());
        for i in 0..noise_between {
            camera.push_event(CameraEvent::Other(format!("FolderAdded{i}")));
        }
        camera.push_file(second, second.as_bytes());
        camera.push_event(CameraEvent::CaptureComplete);

        let result = run_capture(&mut camera, &dir).unwrap();

        prop_assert_eq!(result.names(), vec![first, second]);
        prop_assert!(result.has_jpeg_raw_pair());
        prop_assert_eq!(fs::read(dir.path().join(first)).unwrap(), first.as_bytes());
        prop_assert_eq!(camera.close_count(), 1);
    }
}
