// 该文件是 Kanzuo （看座） 项目的一部分。
// src/session/builder.rs - 会话构建器
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

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;

use super::{ComputationMode, Session, SessionConfig, SessionError};
use crate::native::SharedApi;
use crate::{FromUrl, FromUrlWithScheme};

const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// 加载动态库并初始化会话。
///
/// URL 形式：
/// `sa:///sdk/lib/libseatsanalyzer.so?config=/sdk/config.ini&support=/sdk/lib/libdep.so&mode=gpu&gpu=0&threads=4&overrides=/etc/sa.json`
#[derive(Debug, Clone)]
pub struct SessionBuilder {
  library: PathBuf,
  support: Vec<PathBuf>,
  config_path: Option<PathBuf>,
  config: Option<SessionConfig>,
}

impl FromUrlWithScheme for SessionBuilder {
  const SCHEME: &'static str = "sa";
}

impl FromUrl for SessionBuilder {
  type Error = SessionError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SessionError::InvalidUrl(format!(
        "会话地址必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| SessionError::InvalidUrl(e.to_string()))?;
    if path.is_empty() {
      return Err(SessionError::InvalidUrl("缺少动态库路径".to_string()));
    }

    let mut builder = SessionBuilder::new(path.into_owned());
    let mut mode = None;
    let mut gpu = None;
    let mut threads = None;

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "config" => builder.config_path = Some(PathBuf::from(&*value)),
        "support" => builder.support.push(PathBuf::from(&*value)),
        "overrides" => builder.config = Some(SessionConfig::from_json_file(&*value)?),
        "mode" => mode = Some(value.parse::<ComputationMode>()?),
        "gpu" => gpu = Some(parse_int(&key, &value)?),
        "threads" => threads = Some(parse_int(&key, &value)?),
        other => debug!("忽略未知参数: {}={}", other, value),
      }
    }

    if mode.is_some() || gpu.is_some() || threads.is_some() {
      let mut config = builder.config.take().unwrap_or_default();
      if let Some(mode) = mode {
        config.computation_mode = mode;
      }
      if let Some(gpu) = gpu {
        config.gpu_device_id = gpu;
      }
      if let Some(threads) = threads {
        config.num_threads = threads;
      }
      builder.config = Some(config);
    }

    Ok(builder)
  }
}

fn parse_int(key: &str, value: &str) -> Result<i32, SessionError> {
  value
    .parse()
    .map_err(|_| SessionError::InvalidUrl(format!("参数 {} 不是整数: {}", key, value)))
}

impl SessionBuilder {
  pub fn new(library: impl Into<PathBuf>) -> Self {
    Self {
      library: library.into(),
      support: Vec::new(),
      config_path: None,
      config: None,
    }
  }

  pub fn library(&self) -> &Path {
    &self.library
  }

  /// 依赖库，会在主库之前以全局可见方式打开
  pub fn support_library(mut self, path: impl Into<PathBuf>) -> Self {
    self.support.push(path.into());
    self
  }

  pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
    self.config_path = Some(path.into());
    self
  }

  pub fn config(mut self, config: SessionConfig) -> Self {
    self.config = Some(config);
    self
  }

  pub fn session_config(&self) -> Option<&SessionConfig> {
    self.config.as_ref()
  }

  /// 未指定时为动态库所在目录的上一级中的 config.ini
  pub fn resolved_config_path(&self) -> Result<PathBuf, SessionError> {
    if let Some(path) = &self.config_path {
      return Ok(path.clone());
    }
    self
      .library
      .parent()
      .and_then(Path::parent)
      .map(|sdk_dir| sdk_dir.join(DEFAULT_CONFIG_FILE))
      .ok_or_else(|| {
        SessionError::InvalidUrl(format!(
          "无法从 {} 推断配置文件路径",
          self.library.display()
        ))
      })
  }

  #[cfg(unix)]
  pub fn build(self) -> Result<Session, SessionError> {
    let api = crate::native::DynamicApi::load(&self.library, &self.support)?;
    self.build_with_api(std::sync::Arc::new(api))
  }

  #[cfg(not(unix))]
  pub fn build(self) -> Result<Session, SessionError> {
    Err(crate::native::LoadError::Unsupported.into())
  }

  /// 使用已加载的原生接口创建并初始化会话
  pub fn build_with_api(self, api: SharedApi) -> Result<Session, SessionError> {
    let config_path = self.resolved_config_path()?;
    let mut session = Session::new(api);
    session.init(&config_path, self.config.as_ref())?;

    match session.sdk_version() {
      Some(version) => info!("SDK 版本: {}", version),
      None => debug!("SDK 未提供版本信息"),
    }
    Ok(session)
  }
}
