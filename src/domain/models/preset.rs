use serde::{Deserialize, Serialize};

use super::transform::FitMode;

/// Named transformation shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Thumbnail,
    Social,
    Avatar,
    Banner,
}

/// Concrete values a preset stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetValues {
    pub width: u32,
    pub height: u32,
    pub fit: FitMode,
    pub quality: u8,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Thumbnail,
        Preset::Social,
        Preset::Avatar,
        Preset::Banner,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|preset| preset.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Thumbnail => "thumbnail",
            Preset::Social => "social",
            Preset::Avatar => "avatar",
            Preset::Banner => "banner",
        }
    }

    pub fn values(&self) -> PresetValues {
        match self {
            Preset::Thumbnail => PresetValues {
                width: 150,
                height: 150,
                fit: FitMode::Cover,
                quality: 80,
            },
            Preset::Social => PresetValues {
                width: 1200,
                height: 630,
                fit: FitMode::Contain,
                quality: 85,
            },
            Preset::Avatar => PresetValues {
                width: 300,
                height: 300,
                fit: FitMode::Cover,
                quality: 85,
            },
            Preset::Banner => PresetValues {
                width: 1920,
                height: 400,
                fit: FitMode::Cover,
                quality: 90,
            },
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
