use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A platform searched for downstream uses of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Github,
    Huggingface,
    Kaggle,
}

impl SourceKind {
    pub const ALL: [Self; 3] = [Self::Github, Self::Huggingface, Self::Kaggle];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Huggingface => "huggingface",
            Self::Kaggle => "kaggle",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "huggingface" | "hf" => Ok(Self::Huggingface),
            "kaggle" => Ok(Self::Kaggle),
            other => Err(format!("unknown source: {other}")),
        }
    }
}
