use crate::camera_config::{CameraConfig, MAX_CAMERA_DELAY_SECS};
use log::warn;
use std::env;
use std::time::Duration;

/// A configured camera plus the credentials resolved for it at startup.
#[derive(Debug, Clone)]
pub struct CameraEntity {
    pub config: CameraConfig,
    password: Option<String>,
}

impl CameraEntity {
    pub fn new(config: CameraConfig) -> Self {
        let mut entity = CameraEntity {
            config,
            password: None,
        };
        entity.load_password();
        entity
    }

    pub fn password_env_var(&self) -> String {
        format!("{}_PASSWORD", self.config.name.to_uppercase().replace('-', "_"))
    }

    fn load_password(&mut self) {
        let env_var_name = self.password_env_var();
        match env::var(&env_var_name) {
            Ok(pass) => self.password = Some(pass),
            Err(_) => {
                self.password = self.config.password.clone();
                if self.password.is_none() {
                    warn!(
                        "Password not found in environment variable '{}' or config for camera '{}'",
                        env_var_name, self.config.name
                    );
                }
            }
        }
    }

    pub fn get_password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// `host:port` of the VISCA command socket.
    pub fn visca_address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.visca_port)
    }

    pub fn snapshot_url(&self) -> String {
        match self.config.http_port {
            Some(port) => format!("http://{}:{}/snapshot.jpg", self.config.ip, port),
            None => format!("http://{}/snapshot.jpg", self.config.ip),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        secs_to_duration(self.config.command_timeout_secs)
    }

    pub fn command_retry_delay(&self) -> Duration {
        secs_to_duration(self.config.command_retry_delay_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        secs_to_duration(self.config.settle_delay_secs)
    }
}

/// Clamped into `0..=MAX_CAMERA_DELAY_SECS`; NaN becomes zero.
fn secs_to_duration(secs: f32) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f32(secs.clamp(0.0, MAX_CAMERA_DELAY_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, http_port: Option<u16>) -> CameraConfig {
        CameraConfig {
            name: name.to_string(),
            ip: "10.0.0.5".to_string(),
            username: "admin".to_string(),
            password: Some("from-config".to_string()),
            visca_port: 5678,
            http_port,
            command_timeout_secs: 15.0,
            command_retry_delay_secs: 1.0,
            settle_delay_secs: 1.0,
        }
    }

    #[test]
    fn builds_addresses_from_config() {
        let cam = CameraEntity::new(config("entity-test-urls", None));
        assert_eq!(cam.visca_address(), "10.0.0.5:5678");
        assert_eq!(cam.snapshot_url(), "http://10.0.0.5/snapshot.jpg");

        let cam = CameraEntity::new(config("entity-test-urls", Some(8080)));
        assert_eq!(cam.snapshot_url(), "http://10.0.0.5:8080/snapshot.jpg");
    }

    #[test]
    fn out_of_range_delays_never_panic() {
        let mut cfg = config("entity-test-delays", None);
        cfg.command_timeout_secs = f32::NAN;
        cfg.command_retry_delay_secs = f32::INFINITY;
        cfg.settle_delay_secs = -3.0;
        let cam = CameraEntity::new(cfg);
        assert_eq!(cam.command_timeout(), Duration::ZERO);
        assert_eq!(cam.command_retry_delay(), Duration::from_secs(3600));
        assert_eq!(cam.settle_delay(), Duration::ZERO);
    }

    #[test]
    fn falls_back_to_config_password() {
        let cam = CameraEntity::new(config("entity-test-no-env", None));
        assert_eq!(cam.password_env_var(), "ENTITY_TEST_NO_ENV_PASSWORD");
        assert_eq!(cam.get_password(), Some("from-config"));
    }
}
