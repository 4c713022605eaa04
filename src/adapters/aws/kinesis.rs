//! Kinesis Video Streams adapters.

use crate::domain::StreamPosition;
use crate::ports::stream::{MediaResponse, StreamDirectoryPort, StreamMediaPort};
use async_trait::async_trait;
use aws_sdk_kinesisvideo::types::ApiName;
use aws_sdk_kinesisvideomedia::error::SdkError;
use aws_sdk_kinesisvideomedia::types::{StartSelector, StartSelectorType};
use aws_config::SdkConfig;
use std::error::Error;
use std::sync::Arc;

/// Resolves GET_MEDIA endpoints and builds media clients bound to them.
#[derive(Clone)]
pub struct KinesisVideoAdapter {
    client: aws_sdk_kinesisvideo::Client,
    sdk_config: SdkConfig,
}

impl KinesisVideoAdapter {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_kinesisvideo::Client::new(sdk_config),
            sdk_config: sdk_config.clone(),
        }
    }
}

#[async_trait]
impl StreamDirectoryPort for KinesisVideoAdapter {
    async fn data_endpoint(&self, stream_id: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .get_data_endpoint()
            .stream_arn(stream_id)
            .api_name(ApiName::GetMedia)
            .send()
            .await?;
        let endpoint = resp
            .data_endpoint()
            .ok_or_else(|| format!("No GET_MEDIA endpoint for stream {}", stream_id))?;
        Ok(endpoint.to_string())
    }

    fn media_client(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn StreamMediaPort>, Box<dyn Error + Send + Sync>> {
        let config = aws_sdk_kinesisvideomedia::config::Builder::from(&self.sdk_config)
            .endpoint_url(endpoint)
            .build();
        Ok(Arc::new(KinesisVideoMediaAdapter::new(
            aws_sdk_kinesisvideomedia::Client::from_conf(config),
        )))
    }
}

/// KinesisVideoMediaAdapter implements StreamMediaPort with GetMedia.
#[derive(Clone)]
pub struct KinesisVideoMediaAdapter {
    client: aws_sdk_kinesisvideomedia::Client,
}

impl KinesisVideoMediaAdapter {
    pub fn new(client: aws_sdk_kinesisvideomedia::Client) -> Self {
        Self { client }
    }
}

fn start_selector(position: &StreamPosition) -> Result<StartSelector, Box<dyn Error + Send + Sync>> {
    let selector = match position {
        StreamPosition::Earliest => StartSelector::builder()
            .start_selector_type(StartSelectorType::Earliest)
            .build()?,
        StreamPosition::AfterFragment(boundary) => StartSelector::builder()
            .start_selector_type(StartSelectorType::FragmentNumber)
            .after_fragment_number(boundary.token())
            .build()?,
    };
    Ok(selector)
}

#[async_trait]
impl StreamMediaPort for KinesisVideoMediaAdapter {
    async fn get_media(
        &self,
        stream_id: &str,
        position: &StreamPosition,
    ) -> Result<MediaResponse, Box<dyn Error + Send + Sync>> {
        let result = self
            .client
            .get_media()
            .stream_arn(stream_id)
            .start_selector(start_selector(position)?)
            .send()
            .await;

        match result {
            // The payload stays open for as long as the stream has media.
            Ok(output) => Ok(MediaResponse::streaming(Box::new(Box::pin(
                output.payload.into_async_read(),
            )))),
            Err(SdkError::ServiceError(err)) => {
                Ok(MediaResponse::unavailable(err.raw().status().as_u16()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
