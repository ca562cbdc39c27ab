//! Host ↔ worker events.
//!
//! Every event is a JSON object whose `topic` field carries the tag. Pixel
//! payloads travel as standard base64.

use recall_core::FaceData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Tags the dispatcher knows how to route.
pub const INBOUND_TOPICS: [&str; 7] = [
    "resolution",
    "sendFrame",
    "trackStatus",
    "loadGallery",
    "saveGallery",
    "clearGallery",
    "changeName",
];

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("unrecognized event: {0:?}")]
    UnrecognizedEvent(String),
    #[error("event has no topic")]
    MissingTopic,
    #[error("malformed {topic} event: {source}")]
    Malformed {
        topic: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Requests from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "camelCase")]
pub enum InboundEvent {
    Resolution {
        width: u32,
        height: u32,
    },
    SendFrame {
        #[serde(with = "base64_pixels")]
        pixels: Vec<u8>,
        #[serde(rename = "faceData", default)]
        face_data: Option<FaceData>,
        #[serde(default)]
        freeze: bool,
    },
    TrackStatus,
    LoadGallery,
    SaveGallery,
    ClearGallery,
    ChangeName {
        mapping: HashMap<String, String>,
    },
}

impl InboundEvent {
    /// Parse one event. Unknown topics are reported as
    /// [`ProtocolError::UnrecognizedEvent`] and must not be ignored.
    pub fn from_json(line: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value = serde_json::from_str(line)?;
        let topic = value
            .get("topic")
            .and_then(|t| t.as_str())
            .ok_or(ProtocolError::MissingTopic)?
            .to_string();

        if !INBOUND_TOPICS.contains(&topic.as_str()) {
            return Err(ProtocolError::UnrecognizedEvent(topic));
        }

        serde_json::from_value(value).map_err(|source| ProtocolError::Malformed { topic, source })
    }

    pub fn topic(&self) -> &'static str {
        match self {
            Self::Resolution { .. } => "resolution",
            Self::SendFrame { .. } => "sendFrame",
            Self::TrackStatus => "trackStatus",
            Self::LoadGallery => "loadGallery",
            Self::SaveGallery => "saveGallery",
            Self::ClearGallery => "clearGallery",
            Self::ChangeName { .. } => "changeName",
        }
    }
}

/// Events posted back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "topic", rename_all = "kebab-case")]
pub enum OutboundEvent {
    InitializationDone,
    RecognitionReset,
    GalleryLoaded {
        names: Vec<String>,
    },
    GallerySaved,
    GalleryCleared,
    NameChanged,
    #[serde(rename = "result")]
    Recognized {
        #[serde(rename = "recognizedName")]
        recognized_name: String,
    },
    /// Engine initialization failed; the worker stops after sending this.
    Error {
        message: String,
    },
}

impl OutboundEvent {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

mod base64_pixels {
    use base64::{engine::general_purpose, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(pixels: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&general_purpose::STANDARD.encode(pixels))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(d)?;
        general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
