//! Messages exchanged between the playback controller and the background
//! control bridge. The two sides share no memory; these types are the whole
//! contract.

use serde::{Deserialize, Serialize};

use crate::model::Subject;

pub const DEFAULT_TITLE: &str = "Study Session";
pub const DEFAULT_ALBUM: &str = "Learning Material";

const ARTWORK_SIZES: [u32; 6] = [96, 128, 192, 256, 384, 512];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime: String,
}

/// "Now playing" descriptor published to the platform media session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowPlaying {
    pub title: String,
    pub subject: String,
    pub album: String,
    pub artwork: Vec<Artwork>,
}

impl NowPlaying {
    #[must_use]
    pub fn for_subject(subject: &Subject) -> Self {
        let artwork = ARTWORK_SIZES
            .iter()
            .map(|size| Artwork {
                src: format!("/static/images/icon-{size}.png"),
                sizes: format!("{size}x{size}"),
                mime: "image/png".to_string(),
            })
            .collect();

        Self {
            title: DEFAULT_TITLE.to_string(),
            subject: subject.as_str().to_string(),
            album: DEFAULT_ALBUM.to_string(),
            artwork,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Controller → bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeMessage {
    PlayAudio(NowPlaying),
    PauseAudio,
    StopAudio,
    VisibilityChanged { visible: bool },
}

/// Bridge → controller, one per OS transport action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportCommand {
    #[serde(rename = "MEDIA_SESSION_PLAY")]
    Play,
    #[serde(rename = "MEDIA_SESSION_PAUSE")]
    Pause,
    #[serde(rename = "MEDIA_SESSION_NEXT")]
    Next,
    #[serde(rename = "MEDIA_SESSION_PREV")]
    Previous,
}
