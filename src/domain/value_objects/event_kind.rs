use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// イベント種別。保存値はフォームの選択肢と同じ文字列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "anniversaire")]
    Anniversaire,
    #[serde(rename = "randonnée")]
    Randonnee,
    #[serde(rename = "inauguration")]
    Inauguration,
    #[serde(rename = "ventes_enchères", alias = "ventes enchères")]
    VentesEncheres,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Anniversaire,
        EventType::Randonnee,
        EventType::Inauguration,
        EventType::VentesEncheres,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Anniversaire => "anniversaire",
            EventType::Randonnee => "randonnée",
            EventType::Inauguration => "inauguration",
            EventType::VentesEncheres => "ventes_enchères",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anniversaire" => Ok(EventType::Anniversaire),
            "randonnée" => Ok(EventType::Randonnee),
            "inauguration" => Ok(EventType::Inauguration),
            // 旧スキーマでは空白区切りで保存されていた
            "ventes_enchères" | "ventes enchères" => Ok(EventType::VentesEncheres),
            other => Err(format!("Unsupported event type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("Unsupported visibility: {other}")),
        }
    }
}
