// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use kitchen_app::{
    Action, ActionOutcome, Item, ItemId, ItemPayload, Recipe, RecipeId, Settings, Tab, TabData,
};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Option<Duration>,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let parsed =
            Url::parse(&base_url).with_context(|| format!("parse api base url {base_url:?}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api base url {base_url:?} must use http or https, got scheme {:?}",
                parsed.scheme()
            );
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send("GET", path, self.http.get(self.url(path)))
    }

    pub fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send("POST", path, self.http.post(self.url(path)).json(body))
    }

    pub fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send("PUT", path, self.http.put(self.url(path)).json(body))
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send("DELETE", path, self.http.delete(self.url(path)))
    }

    pub fn ping(&self) -> Result<()> {
        self.settings().with_context(|| {
            format!(
                "backend at {} did not answer GET /settings -- check [api].base_url",
                self.base_url
            )
        })?;
        Ok(())
    }

    pub fn settings(&self) -> Result<Settings> {
        self.get("/settings")
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<Settings> {
        let _: Value = self.post("/settings", settings)?;
        Ok(*settings)
    }

    pub fn list_items(&self, tab: Tab) -> Result<Vec<Item>> {
        ensure_item_tab(tab)?;
        self.get(&tab.endpoint())
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        self.get(&Tab::Recipes.endpoint())
    }

    pub fn load_tab(&self, tab: Tab) -> Result<TabData> {
        if tab.holds_items() {
            Ok(TabData::Items(self.list_items(tab)?))
        } else {
            Ok(TabData::Recipes(self.list_recipes()?))
        }
    }

    pub fn create_item(&self, tab: Tab, payload: &ItemPayload) -> Result<Item> {
        ensure_item_tab(tab)?;
        self.post(&tab.endpoint(), payload)
    }

    pub fn update_item(&self, tab: Tab, id: ItemId, payload: &ItemPayload) -> Result<Item> {
        ensure_item_tab(tab)?;
        self.put(&item_path(tab, id), payload)
    }

    pub fn delete_item(&self, tab: Tab, id: ItemId) -> Result<()> {
        ensure_item_tab(tab)?;
        let _: Value = self.delete(&item_path(tab, id))?;
        Ok(())
    }

    pub fn move_item(&self, tab: Tab, id: ItemId) -> Result<()> {
        if !matches!(tab, Tab::Shopping | Tab::Inventory) {
            bail!(
                "{} entries cannot be moved -- only shopping and inventory entries move",
                tab.as_str()
            );
        }
        let _: Value = self.post(&format!("{}/move", item_path(tab, id)), &empty_body())?;
        Ok(())
    }

    pub fn use_template(&self, id: ItemId) -> Result<()> {
        let path = format!("{}/use", item_path(Tab::Templates, id));
        let _: Value = self.post(&path, &empty_body())?;
        Ok(())
    }

    pub fn cook_recipe(&self, id: RecipeId) -> Result<()> {
        let path = format!("{}/{id}/cook", Tab::Recipes.endpoint());
        let _: Value = self.post(&path, &empty_body())?;
        Ok(())
    }

    /// Issues the request an [`Action`] stands for.
    pub fn perform(&self, action: &Action) -> Result<ActionOutcome> {
        match action {
            Action::Save {
                tab,
                id: None,
                payload,
            } => Ok(ActionOutcome::Saved(self.create_item(*tab, payload)?)),
            Action::Save {
                tab,
                id: Some(id),
                payload,
            } => Ok(ActionOutcome::Saved(self.update_item(*tab, *id, payload)?)),
            Action::Delete { tab, id } => {
                self.delete_item(*tab, *id)?;
                Ok(ActionOutcome::Removed(*id))
            }
            Action::Move { tab, id } => {
                self.move_item(*tab, *id)?;
                Ok(ActionOutcome::Moved(*id))
            }
            Action::UseTemplate { id } => {
                self.use_template(*id)?;
                Ok(ActionOutcome::TemplateUsed)
            }
            Action::Cook { id } => {
                self.cook_recipe(*id)?;
                Ok(ActionOutcome::Cooked)
            }
            Action::SaveSettings(settings) => {
                Ok(ActionOutcome::SettingsSaved(self.save_settings(settings)?))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        tracing::debug!(method, path, "api request");
        let response = request
            .send()
            .map_err(|error| connection_error(&self.base_url, error))?;

        let status = response.status();
        tracing::debug!(method, path, status = status.as_u16(), "api response");
        let body = response
            .text()
            .with_context(|| format!("read response of {method} {path}"))?;
        if !status.is_success() {
            return Err(clean_error_response(status, &body))
                .with_context(|| format!("{method} {path}"));
        }

        decode_body(&body).with_context(|| format!("decode response of {method} {path}"))
    }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(body)?)
}

fn ensure_item_tab(tab: Tab) -> Result<()> {
    if !tab.holds_items() {
        bail!("{} does not hold shopping-style items", tab.as_str());
    }
    Ok(())
}

fn item_path(tab: Tab, id: ItemId) -> String {
    format!("{}/{id}", tab.endpoint())
}

fn empty_body() -> Value {
    Value::Object(serde_json::Map::new())
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- is the kitchen backend running? ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> anyhow::Error {
    if let Ok(parsed) = serde_json::from_str::<Value>(body)
        && let Some(detail) = parsed.get("detail")
    {
        let message = match detail {
            Value::String(message) => Some(message.clone()),
            Value::Array(entries) => entries
                .first()
                .and_then(|entry| entry.get("msg"))
                .and_then(Value::as_str)
                .map(str::to_owned),
            _ => None,
        };
        if let Some(message) = message
            && !message.is_empty()
        {
            return anyhow!("server error ({}): {}", status.as_u16(), message);
        }
    }

    if body.len() < 100 && !body.contains('{') && !body.trim().is_empty() {
        return anyhow!("server error ({}): {}", status.as_u16(), body.trim());
    }

    anyhow!("server returned {}", status.as_u16())
}
