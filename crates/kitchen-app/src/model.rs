// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

pub const DEFAULT_UNIT: &str = "st";
pub const UNIT_CHOICES: [&str; 6] = ["st", "g", "kg", "l", "ml", "Kiste"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Shopping,
    Inventory,
    Templates,
    Recipes,
}

impl Tab {
    pub const ALL: [Self; 4] = [Self::Shopping, Self::Inventory, Self::Templates, Self::Recipes];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shopping => "shopping",
            Self::Inventory => "inventory",
            Self::Templates => "templates",
            Self::Recipes => "recipes",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "shopping" => Some(Self::Shopping),
            "inventory" => Some(Self::Inventory),
            "templates" => Some(Self::Templates),
            "recipes" => Some(Self::Recipes),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Shopping => "Einkauf",
            Self::Inventory => "Vorrat",
            Self::Templates => "Vorlagen",
            Self::Recipes => "Rezepte",
        }
    }

    /// Path of the collection endpoint, relative to the API base.
    pub fn endpoint(self) -> String {
        format!("/{}", self.as_str())
    }

    pub const fn holds_items(self) -> bool {
        !matches!(self, Self::Recipes)
    }

    pub const fn supports_create(self) -> bool {
        self.holds_items()
    }

    pub const fn supports_edit(self) -> bool {
        self.holds_items()
    }

    pub const fn context_action(self) -> ContextAction {
        match self {
            Self::Shopping => ContextAction::MoveToInventory,
            Self::Inventory => ContextAction::MoveToShopping,
            Self::Templates => ContextAction::UseTemplate,
            Self::Recipes => ContextAction::Cook,
        }
    }
}

/// The one tab-specific action offered on every row or card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    MoveToInventory,
    MoveToShopping,
    UseTemplate,
    Cook,
}

impl ContextAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MoveToInventory => "→ Vorrat",
            Self::MoveToShopping => "→ Einkauf",
            Self::UseTemplate => "+ Einkauf",
            Self::Cook => "kochen",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

impl Item {
    pub fn amount_label(&self) -> String {
        format!("{} {}", format_amount(self.amount), self.unit)
            .trim_end()
            .to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPayload {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub servings: u32,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn servings_label(&self) -> String {
        format!("{} Portionen", self.servings)
    }

    pub fn ingredient_names(&self) -> String {
        self.ingredients
            .iter()
            .map(|ingredient| ingredient.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawSettings")]
pub struct Settings {
    pub default_tab: Tab,
}

/// Wire form of [`Settings`]. Only a JSON object is accepted; unknown keys
/// are skipped and an unreadable `default_tab` falls back later.
#[derive(Debug, Default)]
struct RawSettings {
    default_tab: Option<String>,
}

impl<'de> Deserialize<'de> for RawSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct RawSettingsVisitor;

        impl<'de> serde::de::Visitor<'de> for RawSettingsVisitor {
            type Value = RawSettings;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a settings object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut raw = RawSettings::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "default_tab" {
                        raw.default_tab = map.next_value::<Option<String>>()?;
                    } else {
                        map.next_value::<serde::de::IgnoredAny>()?;
                    }
                }
                Ok(raw)
            }
        }

        deserializer.deserialize_map(RawSettingsVisitor)
    }
}

impl From<RawSettings> for Settings {
    fn from(raw: RawSettings) -> Self {
        Self {
            default_tab: raw
                .default_tab
                .as_deref()
                .and_then(Tab::parse)
                .unwrap_or_default(),
        }
    }
}

/// Last fetched collection of one tab.
#[derive(Debug, Clone, PartialEq)]
pub enum TabData {
    Items(Vec<Item>),
    Recipes(Vec<Recipe>),
}

impl TabData {
    pub fn len(&self) -> usize {
        match self {
            Self::Items(items) => items.len(),
            Self::Recipes(recipes) => recipes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub const fn matches_tab(&self, tab: Tab) -> bool {
        match self {
            Self::Items(_) => tab.holds_items(),
            Self::Recipes(_) => !tab.holds_items(),
        }
    }
}

pub fn format_amount(amount: f64) -> String {
    format!("{amount}")
}
