use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Case convention applied to every suggested tag before insertion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseConvention {
    /// `healthy-and-tasty`
    #[default]
    KebabCase,
    /// `healthy_and_tasty`
    SnakeCase,
    /// `HealthyAndTasty`
    PascalCase,
    /// `healthyAndTasty`
    CamelCase,
    /// `HEALTHY_AND_TASTY`
    ConstantCase,
    /// `Healthy_And_Tasty`
    PascalSnakeCase,
    /// `Healthy-And-Tasty`
    TrainCase,
}

impl CaseConvention {
    /// Every supported convention, in display order.
    pub const ALL: [CaseConvention; 7] = [
        Self::KebabCase,
        Self::SnakeCase,
        Self::PascalCase,
        Self::CamelCase,
        Self::ConstantCase,
        Self::PascalSnakeCase,
        Self::TrainCase,
    ];

    /// Returns the canonical name used in configuration.
    pub fn name(self) -> &'static str {
        match self {
            Self::KebabCase => "kebab-case",
            Self::SnakeCase => "snake_case",
            Self::PascalCase => "PascalCase",
            Self::CamelCase => "camelCase",
            Self::ConstantCase => "CONSTANT_CASE",
            Self::PascalSnakeCase => "Pascal_Snake_Case",
            Self::TrainCase => "Train-Case",
        }
    }

    /// Looks up a convention by name.
    ///
    /// Matching ignores case and treats `-`, `_` and spaces alike, so
    /// `"snake_case"`, `"snake-case"` and `"SNAKE CASE"` are all accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match key.as_str() {
            "kebab" | "kebabcase" => Some(Self::KebabCase),
            "snake" | "snakecase" => Some(Self::SnakeCase),
            "pascal" | "pascalcase" => Some(Self::PascalCase),
            "camel" | "camelcase" => Some(Self::CamelCase),
            "constant" | "constantcase" => Some(Self::ConstantCase),
            "pascalsnake" | "pascalsnakecase" => Some(Self::PascalSnakeCase),
            "train" | "traincase" => Some(Self::TrainCase),
            _ => None,
        }
    }

    /// Looks up a convention by name, falling back to kebab-case.
    pub fn from_name_or_default(name: &str) -> Self {
        Self::from_name(name).unwrap_or_default()
    }
}

impl fmt::Display for CaseConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CaseConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|c| c.name()).collect();
            format!("unknown tag format '{s}' (expected one of: {})", known.join(", "))
        })
    }
}
