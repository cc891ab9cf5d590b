// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};

use crate::{DEFAULT_UNIT, Item, ItemId, ItemPayload, Settings, Tab};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Item,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Name,
    Amount,
    Unit,
}

impl ItemField {
    pub const ALL: [Self; 3] = [Self::Name, Self::Amount, Self::Unit];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Amount => "Menge",
            Self::Unit => "Einheit",
        }
    }
}

/// Raw editor contents; `id` is set when editing an existing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFormInput {
    pub id: Option<ItemId>,
    pub name: String,
    pub amount: String,
    pub unit: String,
}

impl Default for ItemFormInput {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            amount: String::new(),
            unit: DEFAULT_UNIT.to_owned(),
        }
    }
}

impl ItemFormInput {
    pub fn from_item(item: &Item) -> Self {
        Self {
            id: Some(item.id),
            name: item.name.clone(),
            amount: crate::format_amount(item.amount),
            unit: item.unit.clone(),
        }
    }

    pub fn field(&self, field: ItemField) -> &str {
        match field {
            ItemField::Name => &self.name,
            ItemField::Amount => &self.amount,
            ItemField::Unit => &self.unit,
        }
    }

    pub fn field_mut(&mut self, field: ItemField) -> &mut String {
        match field {
            ItemField::Name => &mut self.name,
            ItemField::Amount => &mut self.amount,
            ItemField::Unit => &mut self.unit,
        }
    }

    pub fn validate(&self) -> Result<ItemPayload> {
        let name = self.name.trim();
        if name.is_empty() {
            bail!("Name fehlt, bitte einen Namen eingeben");
        }
        let amount = parse_amount(&self.amount)?;
        let unit = match self.unit.trim() {
            "" => DEFAULT_UNIT,
            unit => unit,
        };
        Ok(ItemPayload {
            name: name.to_owned(),
            amount,
            unit: unit.to_owned(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsFormInput {
    pub default_tab: Tab,
}

impl SettingsFormInput {
    pub const fn from_settings(settings: Settings) -> Self {
        Self {
            default_tab: settings.default_tab,
        }
    }

    pub const fn to_settings(self) -> Settings {
        Settings {
            default_tab: self.default_tab,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormState {
    Item(ItemFormInput),
    Settings(SettingsFormInput),
}

impl FormState {
    pub const fn kind(&self) -> FormKind {
        match self {
            Self::Item(_) => FormKind::Item,
            Self::Settings(_) => FormKind::Settings,
        }
    }
}

/// Accepts `2`, `0.5` and the comma form `0,5`.
pub fn parse_amount(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("Menge fehlt, bitte eine Zahl eingeben");
    }
    let value: f64 = trimmed
        .replace(',', ".")
        .parse()
        .with_context(|| format!("Menge {trimmed:?} ist keine Zahl"))?;
    if !value.is_finite() {
        bail!("Menge {trimmed:?} ist keine endliche Zahl");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{FormKind, FormState, ItemField, ItemFormInput, SettingsFormInput, parse_amount};
    use crate::{Item, ItemId, Settings, Tab};
    use anyhow::Result;

    fn form(name: &str, amount: &str, unit: &str) -> ItemFormInput {
        ItemFormInput {
            id: None,
            name: name.to_owned(),
            amount: amount.to_owned(),
            unit: unit.to_owned(),
        }
    }

    #[test]
    fn blank_form_starts_with_default_unit() {
        let blank = ItemFormInput::default();
        assert_eq!(blank.unit, "st");
        assert!(blank.id.is_none());
    }

    #[test]
    fn validate_builds_payload() -> Result<()> {
        let payload = form("Milk", "2", "l").validate()?;
        assert_eq!(payload.name, "Milk");
        assert_eq!(payload.amount, 2.0);
        assert_eq!(payload.unit, "l");
        Ok(())
    }

    #[test]
    fn validate_rejects_empty_name_regardless_of_amount() {
        let error = form("", "2", "l").validate().expect_err("blank name should fail");
        assert_eq!(error.to_string(), "Name fehlt, bitte einen Namen eingeben");
        assert!(form("   ", "3.5", "kg").validate().is_err());
    }

    #[test]
    fn validate_rejects_missing_or_garbage_amount() {
        assert!(form("Milk", "", "l").validate().is_err());
        assert!(form("Milk", "viel", "l").validate().is_err());
        assert!(form("Milk", "inf", "l").validate().is_err());
    }

    #[test]
    fn empty_unit_falls_back_to_default() -> Result<()> {
        let payload = form("Eier", "6", "  ").validate()?;
        assert_eq!(payload.unit, "st");
        Ok(())
    }

    #[test]
    fn comma_decimal_amount_is_accepted() -> Result<()> {
        assert_eq!(parse_amount("0,5")?, 0.5);
        assert_eq!(parse_amount(" 1.25 ")?, 1.25);
        Ok(())
    }

    #[test]
    fn from_item_prefills_every_field() {
        let item = Item {
            id: ItemId::new(4),
            name: "Butter".to_owned(),
            amount: 250.0,
            unit: "g".to_owned(),
        };
        let input = ItemFormInput::from_item(&item);
        assert_eq!(input.id, Some(ItemId::new(4)));
        assert_eq!(input.field(ItemField::Name), "Butter");
        assert_eq!(input.field(ItemField::Amount), "250");
        assert_eq!(input.field(ItemField::Unit), "g");
    }

    #[test]
    fn settings_form_round_trips_settings() {
        let input = SettingsFormInput::from_settings(Settings {
            default_tab: Tab::Recipes,
        });
        assert_eq!(input.to_settings().default_tab, Tab::Recipes);
        assert_eq!(FormState::Settings(input).kind(), FormKind::Settings);
    }
}
