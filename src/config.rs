//! Process configuration from flags and environment variables.

use crate::application::DispatchSettings;
use crate::error::ConfigError;
use clap::Parser;

/// Highest long-poll wait SQS accepts.
pub const MAX_WAIT_SECONDS: u32 = 20;

/// Frame splitter for Kinesis Video streams
///
/// Polls a queue for stream processing requests and writes every decoded
/// frame to object storage as a PNG.
#[derive(Parser, Clone, Debug)]
#[command(name = "frame-splitter")]
#[command(version)]
pub struct SplitterArgs {
    /// Queue to poll for requests
    #[arg(long, env = "QUEUE_NAME")]
    pub queue: Option<String>,

    /// AWS region
    #[arg(long, env = "REGION")]
    pub region: Option<String>,

    /// Named credentials profile
    #[arg(long, env = "AWS_PROFILE_NAME")]
    pub profile: Option<String>,

    /// Long-poll wait per receive, in seconds
    #[arg(long = "wait", env = "WAIT_SECONDS", default_value_t = MAX_WAIT_SECONDS)]
    pub wait_seconds: u32,

    /// Streams processed concurrently
    #[arg(long = "frame-threads", env = "FRAME_SPLITTER_THREADS", default_value_t = 1)]
    pub frame_splitter_threads: usize,

    /// Concurrent image writes per stream
    #[arg(long = "publisher-threads", env = "IMAGE_PUBLISHER_THREADS", default_value_t = 1)]
    pub image_publisher_threads: usize,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitterConfig {
    pub queue_name: String,
    pub region: String,
    pub profile: Option<String>,
    pub wait_seconds: u32,
    pub frame_splitter_threads: usize,
    pub image_publisher_threads: usize,
    pub log_level: String,
}

impl SplitterArgs {
    pub fn validate(self) -> Result<SplitterConfig, ConfigError> {
        let queue_name = non_blank(self.queue).ok_or(ConfigError::MissingRequired)?;
        let region = non_blank(self.region).ok_or(ConfigError::MissingRequired)?;
        if self.wait_seconds > MAX_WAIT_SECONDS {
            return Err(ConfigError::WaitSecondsOutOfRange(self.wait_seconds));
        }
        if self.frame_splitter_threads == 0 {
            return Err(ConfigError::ZeroThreads {
                name: "frameSplitterThreads",
            });
        }
        if self.image_publisher_threads == 0 {
            return Err(ConfigError::ZeroThreads {
                name: "imagePublisherThreads",
            });
        }

        Ok(SplitterConfig {
            queue_name,
            region,
            profile: non_blank(self.profile),
            wait_seconds: self.wait_seconds,
            frame_splitter_threads: self.frame_splitter_threads,
            image_publisher_threads: self.image_publisher_threads,
            log_level: self.log_level,
        })
    }
}

impl SplitterConfig {
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            wait_seconds: self.wait_seconds,
            frame_splitter_threads: self.frame_splitter_threads,
            image_publisher_threads: self.image_publisher_threads,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SplitterArgs {
        let mut argv = vec!["frame-splitter"];
        argv.extend_from_slice(args);
        SplitterArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_apply() {
        let config = parse(&["--queue", "frames", "--region", "us-west-2"])
            .validate()
            .unwrap();

        assert_eq!(config.queue_name, "frames");
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.wait_seconds, 20);
        assert_eq!(config.frame_splitter_threads, 1);
        assert_eq!(config.image_publisher_threads, 1);
        assert_eq!(config.profile, None);
    }

    #[test]
    fn region_and_queue_are_required() {
        let err = parse(&["--queue", "frames", "--region", "  "])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired));
    }

    #[test]
    fn wait_above_twenty_is_rejected() {
        let err = parse(&["--queue", "q", "--region", "r", "--wait", "21"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::WaitSecondsOutOfRange(21)));

        let config = parse(&["--queue", "q", "--region", "r", "--wait", "0"])
            .validate()
            .unwrap();
        assert_eq!(config.wait_seconds, 0);
    }

    #[test]
    fn zero_threads_are_rejected() {
        let err = parse(&["--queue", "q", "--region", "r", "--frame-threads", "0"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroThreads { name: "frameSplitterThreads" }));

        let err = parse(&["--queue", "q", "--region", "r", "--publisher-threads", "0"])
            .validate()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ZeroThreads { name: "imagePublisherThreads" }));
    }

    #[test]
    fn negative_wait_does_not_parse() {
        let result = SplitterArgs::try_parse_from(["frame-splitter", "--wait", "-1"]);
        assert!(result.is_err());
    }

    #[test]
    fn settings_carry_pool_sizes() {
        let settings = parse(&[
            "--queue", "q", "--region", "r", "--wait", "5", "--frame-threads", "3",
            "--publisher-threads", "4",
        ])
        .validate()
        .unwrap()
        .dispatch_settings();

        assert_eq!(settings.wait_seconds, 5);
        assert_eq!(settings.frame_splitter_threads, 3);
        assert_eq!(settings.image_publisher_threads, 4);
    }
}
