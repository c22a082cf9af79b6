// 该文件是 Kanzuo （看座） 项目的一部分。
// tests/session.rs - 会话生命周期与调用封装测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

mod common;

use std::io::Write;

use common::{FakeNative, class, detection};
use kanzuo::ffi;
use kanzuo::native::SharedApi;
use kanzuo::{
  ColorModel, ComputationMode, DataType, NativeImage, RegionOfInterest, RotatedRect, SeatSlot,
  Session, SessionBuilder, SessionConfig, SessionError, Verdict, WINDOW_LABEL,
};

fn gray(api: &SharedApi) -> NativeImage {
  NativeImage::allocate(api, 32, 24, ColorModel::Gray, DataType::U8).unwrap()
}

fn window_rect() -> ffi::ERRotatedRect {
  ffi::ERRotatedRect {
    x: 100.0,
    y: 80.0,
    width: 60.0,
    height: 30.0,
    angle: 5.0,
  }
}

fn ready(fake: FakeNative) -> (std::sync::Arc<FakeNative>, SharedApi, Session) {
  let (fake, api) = fake.shared();
  let mut session = Session::new(api.clone());
  session.init("/opt/sdk/config.ini", None).unwrap();
  (fake, api, session)
}

#[test]
fn init_is_idempotent() {
  let (fake, api) = FakeNative::default().shared();
  let mut session = Session::new(api);
  assert!(!session.is_initialized());

  session.init("/opt/sdk/config.ini", None).unwrap();
  session.init("/opt/sdk/config.ini", None).unwrap();
  assert!(session.is_initialized());
  assert_eq!(FakeNative::count(&fake.inits), 1);

  let captured = fake.last_init.lock().unwrap().clone().unwrap();
  assert_eq!(captured.config_path, "/opt/sdk/config.ini");
  assert_eq!(captured.computation_mode, None);
}

#[test]
fn failed_init_stays_uninitialized() {
  let (fake, api) = FakeNative {
    fail_init: 7,
    ..FakeNative::default()
  }
  .shared();
  let mut session = Session::new(api.clone());
  let err = session.init("/missing.ini", None).unwrap_err();
  assert!(matches!(
    err,
    SessionError::Native {
      operation: "saInit",
      code: 7
    }
  ));
  assert!(!session.is_initialized());

  let image = gray(&api);
  assert!(matches!(
    session.detect(&image, None),
    Err(SessionError::NotInitialized)
  ));
  drop(session);
  assert_eq!(FakeNative::count(&fake.state_frees), 0);
}

#[test]
fn structured_config_reaches_native_init() {
  let (fake, api) = FakeNative::default().shared();
  let config = SessionConfig::default()
    .det_sdk_directory("/opt/sdk")
    .scl_model_filename("CNN_SCL.dat")
    .computation_mode(ComputationMode::Gpu)
    .gpu_device_id(2)
    .num_threads(8);

  let mut session = Session::new(api);
  session.init("/opt/sdk/config.ini", Some(&config)).unwrap();

  let captured = fake.last_init.lock().unwrap().clone().unwrap();
  assert_eq!(captured.det_sdk_directory.as_deref(), Some("/opt/sdk"));
  assert_eq!(captured.scl_model_filename.as_deref(), Some("CNN_SCL.dat"));
  assert_eq!(captured.computation_mode, Some(ffi::ER_COMPUTATION_MODE_GPU));
  assert_eq!(captured.gpu_device_id, Some(2));
  assert_eq!(captured.num_threads, Some(8));
  assert!(captured.callbacks_null);
}

#[test]
fn calls_before_init_never_reach_native() {
  let (fake, api) = FakeNative::default().shared();
  let session = Session::new(api.clone());
  let image = gray(&api);

  assert!(matches!(
    session.detect(&image, None),
    Err(SessionError::NotInitialized)
  ));
  assert!(matches!(
    session.classify(&image, &RotatedRect::default(), WINDOW_LABEL),
    Err(SessionError::NotInitialized)
  ));
  assert_eq!(FakeNative::count(&fake.det_calls), 0);
  assert_eq!(FakeNative::count(&fake.scl_calls), 0);
}

#[test]
fn detections_are_copied_and_native_result_freed() {
  let (fake, api, session) = ready(FakeNative {
    detections: vec![
      detection("window", 0.93, window_rect()),
      detection("car", 0.71, ffi::ERRotatedRect::default()),
    ],
    ..FakeNative::default()
  });
  let image = gray(&api);

  let roi = RegionOfInterest::new(10, 10, -1, -1);
  let result = session.detect(&image, Some(&roi)).unwrap();
  assert_eq!(result.len(), 2);
  assert_eq!(result.items[0].label, "window");
  assert!((result.items[0].confidence - 0.93).abs() < 1e-12);
  assert_eq!(result.items[0].position, RotatedRect::from(window_rect()));
  assert_eq!(result.items[1].label, "car");
  assert_eq!(result.windows().map(|(i, _)| i).collect::<Vec<_>>(), vec![0]);

  assert_eq!(*fake.last_roi.lock().unwrap(), Some(ffi::ERRoI::from(roi)));
  assert_eq!(FakeNative::count(&fake.det_frees), 1);
  assert_eq!(fake.live_det_buffers(), 0);
}

#[test]
fn empty_detection_result() {
  let (fake, api, session) = ready(FakeNative::default());
  let image = gray(&api);
  let result = session.detect(&image, None).unwrap();
  assert!(result.is_empty());
  assert_eq!(*fake.last_roi.lock().unwrap(), None);
  assert_eq!(FakeNative::count(&fake.det_frees), 1);
}

#[test]
fn failed_detection_reports_code_and_frees_leftovers() {
  let (fake, api, session) = ready(FakeNative {
    fail_det: 4,
    det_leaves_buffer_on_failure: true,
    detections: vec![detection("window", 0.5, window_rect())],
    ..FakeNative::default()
  });
  let image = gray(&api);

  let err = session.detect(&image, None).unwrap_err();
  assert!(matches!(
    err,
    SessionError::Native {
      operation: "saRunDet",
      code: 4
    }
  ));
  assert_eq!(fake.live_det_buffers(), 0);
  assert_eq!(FakeNative::count(&fake.det_frees), 1);
}

#[test]
fn failed_detection_without_buffer_is_not_freed() {
  let (fake, api, session) = ready(FakeNative {
    fail_det: 1,
    ..FakeNative::default()
  });
  let image = gray(&api);
  assert!(session.detect(&image, None).is_err());
  assert_eq!(FakeNative::count(&fake.det_frees), 0);
}

#[test]
fn classification_is_deep_copied() {
  let mut classification = ffi::SaSclResult::default();
  classification.left.quality = 0.8;
  classification.left.occupied = class("1", 0.9);
  classification.left.driver = class("1", 0.7);
  classification.left.belt = class("?", 0.4);
  classification.middle.occupied = class("0", 0.95);
  classification.right.phone = class("0", 0.6);

  let (fake, api, session) = ready(FakeNative {
    classification,
    ..FakeNative::default()
  });
  let image = gray(&api);
  let position = RotatedRect::from(window_rect());

  let result = session.classify(&image, &position, WINDOW_LABEL).unwrap();
  assert_eq!(fake.last_label.lock().unwrap().as_deref(), Some("window"));
  assert_eq!(*fake.last_position.lock().unwrap(), Some(window_rect()));

  let left = result.seat(SeatSlot::Left);
  assert!((left.quality - 0.8).abs() < 1e-12);
  assert_eq!(left.occupied.verdict(), Some(Verdict::Yes));
  assert_eq!(left.belt.verdict(), Some(Verdict::Undetermined));
  assert_eq!(left.phone.result, None);
  assert_eq!(result.middle.occupied.verdict(), Some(Verdict::No));
  assert!(!result.middle.driver.is_present());
  assert_eq!(result.right.phone.result.as_deref(), Some("0"));
  let confidences = result.right.phone.confidences;
  assert!((confidences[0] - 0.4).abs() < 1e-12);
  assert_eq!(confidences[1..], [0.6, 0.0]);
}

#[test]
fn classification_failure_and_label_validation() {
  let (fake, api, session) = ready(FakeNative {
    fail_scl: 9,
    ..FakeNative::default()
  });
  let image = gray(&api);
  let position = RotatedRect::default();

  assert!(matches!(
    session.classify(&image, &position, WINDOW_LABEL),
    Err(SessionError::Native {
      operation: "saRunScl",
      code: 9
    })
  ));

  let long = "w".repeat(ffi::SA_LABEL_STRING_LENGTH);
  assert!(matches!(
    session.classify(&image, &position, &long),
    Err(SessionError::Label(_))
  ));
  assert_eq!(FakeNative::count(&fake.scl_calls), 1);
}

#[test]
fn release_is_idempotent_and_guards_later_calls() {
  let (fake, api, mut session) = ready(FakeNative::default());
  let image = gray(&api);

  session.release();
  session.release();
  assert!(session.is_released());
  assert_eq!(FakeNative::count(&fake.state_frees), 1);

  assert!(matches!(
    session.detect(&image, None),
    Err(SessionError::Released)
  ));
  assert!(matches!(
    session.classify(&image, &RotatedRect::from(window_rect()), WINDOW_LABEL),
    Err(SessionError::Released)
  ));
  assert!(matches!(
    session.init("/opt/sdk/config.ini", None),
    Err(SessionError::Released)
  ));
  drop(session);
  assert_eq!(FakeNative::count(&fake.state_frees), 1);
  assert_eq!(FakeNative::count(&fake.det_calls), 0);
  assert_eq!(FakeNative::count(&fake.scl_calls), 0);
}

#[test]
fn drop_releases_state() {
  let (fake, _api, session) = ready(FakeNative::default());
  drop(session);
  assert_eq!(FakeNative::count(&fake.state_frees), 1);
}

#[test]
fn images_outlive_sessions_safely() {
  let (fake, api, session) = ready(FakeNative::default());
  let image = gray(&api);
  drop(session);
  drop(image);
  drop(api);
  assert_eq!(FakeNative::count(&fake.state_frees), 1);
  assert_eq!(
    FakeNative::count(&fake.allocations),
    FakeNative::count(&fake.image_frees)
  );
  assert_eq!(FakeNative::count(&fake.double_frees), 0);
}

#[test]
fn builder_initializes_with_default_config_path() {
  let (fake, api) = FakeNative {
    with_version: true,
    ..FakeNative::default()
  }
  .shared();
  let session = SessionBuilder::new("/opt/sdk/lib/libseatsanalyzer.so")
    .config(SessionConfig::default().num_threads(1))
    .build_with_api(api)
    .unwrap();

  assert!(session.is_initialized());
  assert_eq!(session.sdk_version().as_deref(), Some("fake-sa 2.1.0"));
  let captured = fake.last_init.lock().unwrap().clone().unwrap();
  assert_eq!(captured.config_path, "/opt/sdk/config.ini");
  assert_eq!(captured.num_threads, Some(1));
}

#[test]
fn builder_reads_json_overrides() {
  use kanzuo::FromUrl;

  let mut file = tempfile::NamedTempFile::new().unwrap();
  write!(
    file,
    r#"{{ "scl_model_filename": "CNN_SCL.dat", "computation_mode": "cpu", "num_threads": 2 }}"#
  )
  .unwrap();

  let url = format!(
    "sa:///opt/sdk/lib/libsa.so?overrides={}&threads=6",
    file.path().display()
  );
  let builder = SessionBuilder::from_url(&url::Url::parse(&url).unwrap()).unwrap();
  let config = builder.session_config().unwrap();
  assert_eq!(
    config.scl_model_filename.as_deref(),
    Some(std::path::Path::new("CNN_SCL.dat"))
  );
  assert_eq!(config.num_threads, 6);

  let (fake, api) = FakeNative::default().shared();
  let _session = builder.build_with_api(api).unwrap();
  let captured = fake.last_init.lock().unwrap().clone().unwrap();
  assert_eq!(captured.scl_model_filename.as_deref(), Some("CNN_SCL.dat"));
  assert_eq!(captured.num_threads, Some(6));
}

#[test]
fn session_config_loads_from_json_file() {
  let mut file = tempfile::NamedTempFile::new().unwrap();
  write!(
    file,
    r#"{{ "det_sdk_directory": "/opt/sdk", "computation_mode": "tpu", "gpu_device_id": 1 }}"#
  )
  .unwrap();
  let config = SessionConfig::from_json_file(file.path()).unwrap();
  assert_eq!(config.computation_mode, ComputationMode::Tpu);
  assert_eq!(config.gpu_device_id, 1);
  assert_eq!(
    config.det_sdk_directory.as_deref(),
    Some(std::path::Path::new("/opt/sdk"))
  );

  std::fs::write(file.path(), "not json").unwrap();
  assert!(SessionConfig::from_json_file(file.path()).is_err());
}
