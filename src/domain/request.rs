use serde::{Deserialize, Serialize};

/// One unit of work read from the queue: which stream to split and where the
/// extracted frames go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingRequest {
    #[serde(rename = "streamARN")]
    pub stream_arn: String,
    pub bucket: String,
    #[serde(rename = "s3Directory")]
    pub s3_directory: String,
}

impl ProcessingRequest {
    /// Parse a queue message body. Missing, renamed or empty fields are rejected.
    pub fn from_message_body(body: &str) -> Result<Self, RequestError> {
        let request: ProcessingRequest = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        let fields = [
            ("streamARN", &self.stream_arn),
            ("bucket", &self.bucket),
            ("s3Directory", &self.s3_directory),
        ];
        match fields.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((name, _)) => Err(RequestError::EmptyField(name)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("malformed request body: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request field `{0}` is empty")]
    EmptyField(&'static str),
}
