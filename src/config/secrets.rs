// src/config/secrets.rs

use super::loader::{EnvOverrides, load_yaml_or_default};
use crate::{
    constants,
    error::{AppError, AppResult},
};
use log::info;
use serde::Deserialize;
use std::{fmt, path::Path};

#[derive(Deserialize, Default)]
struct SecretsFile {
    #[serde(default)]
    moodle_username: Option<String>,
    #[serde(default)]
    moodle_password: Option<String>,
}

/// 平台登录凭据，交给外部爬虫用于登录。
#[derive(Clone)]
pub struct Secrets {
    pub moodle_username: String,
    pub moodle_password: String,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("moodle_username", &self.moodle_username)
            .field("moodle_password", &"***")
            .finish()
    }
}

impl Secrets {
    pub fn load(dir: &Path, env: &EnvOverrides) -> AppResult<Self> {
        let file: SecretsFile = load_yaml_or_default(
            dir,
            constants::files::SECRETS_LOCAL,
            constants::files::SECRETS_SHARED,
        )?;
        Self::from_sources(file.moodle_username, file.moodle_password, env)
    }

    fn from_sources(
        username: Option<String>,
        password: Option<String>,
        env: &EnvOverrides,
    ) -> AppResult<Self> {
        let username = match &env.moodle_username {
            Some(value) => {
                info!("使用环境变量 {}。", constants::env::MOODLE_USERNAME);
                Some(value.clone())
            }
            None => username,
        };
        let password = match &env.moodle_password {
            Some(value) => {
                info!("使用环境变量 {}。", constants::env::MOODLE_PASSWORD);
                Some(value.clone())
            }
            None => password,
        };

        let secrets = Self {
            moodle_username: username.unwrap_or_default(),
            moodle_password: password.unwrap_or_default(),
        };
        secrets.validate()?;
        Ok(secrets)
    }

    fn validate(&self) -> AppResult<()> {
        if self.moodle_username.trim().is_empty() {
            return Err(AppError::Config("未配置用户名 (moodle_username)".into()));
        }
        if self.moodle_password.is_empty() {
            return Err(AppError::Config("未配置密码 (moodle_password)".into()));
        }
        Ok(())
    }
}
