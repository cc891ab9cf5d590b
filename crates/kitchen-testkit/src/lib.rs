// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use kitchen_app::{Ingredient, Item, ItemId, ItemPayload, Recipe, RecipeId, Settings, Tab};
use serde_json::{Value, json};
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Method, Request, Response, Server};

const API_PREFIX: &str = "/api";

const SHOPPING: [(&str, f64, &str); 3] = [("Milch", 2.0, "l"), ("Brot", 1.0, "st"), ("Eier", 10.0, "st")];
const INVENTORY: [(&str, f64, &str); 4] = [
    ("Mehl", 1.0, "kg"),
    ("Milch", 1.0, "l"),
    ("Butter", 250.0, "g"),
    ("Wasser", 1.0, "Kiste"),
];
const TEMPLATES: [(&str, f64, &str); 2] = [("Kaffee", 500.0, "g"), ("Nudeln", 2.0, "st")];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KitchenData {
    pub shopping: Vec<Item>,
    pub inventory: Vec<Item>,
    pub templates: Vec<Item>,
    pub recipes: Vec<Recipe>,
    pub settings: Settings,
}

impl KitchenData {
    pub fn items(&self, tab: Tab) -> &[Item] {
        match tab {
            Tab::Shopping => &self.shopping,
            Tab::Inventory => &self.inventory,
            Tab::Templates => &self.templates,
            Tab::Recipes => &[],
        }
    }

    fn items_mut(&mut self, tab: Tab) -> Option<&mut Vec<Item>> {
        match tab {
            Tab::Shopping => Some(&mut self.shopping),
            Tab::Inventory => Some(&mut self.inventory),
            Tab::Templates => Some(&mut self.templates),
            Tab::Recipes => None,
        }
    }
}

pub fn sample_item(id: i64, name: &str, amount: f64, unit: &str) -> Item {
    Item {
        id: ItemId::new(id),
        name: name.to_owned(),
        amount,
        unit: unit.to_owned(),
    }
}

pub fn sample_items(tab: Tab) -> Vec<Item> {
    let rows: &[(&str, f64, &str)] = match tab {
        Tab::Shopping => &SHOPPING,
        Tab::Inventory => &INVENTORY,
        Tab::Templates => &TEMPLATES,
        Tab::Recipes => &[],
    };
    rows.iter()
        .zip(1_i64..)
        .map(|((name, amount, unit), id)| sample_item(id, name, *amount, unit))
        .collect()
}

pub fn sample_recipes() -> Vec<Recipe> {
    vec![
        Recipe {
            id: RecipeId::new(1),
            title: "Pfannkuchen".to_owned(),
            description: "Klassisch, süß oder herzhaft".to_owned(),
            servings: 4,
            ingredients: vec![
                ingredient("Mehl", 0.25, "kg"),
                ingredient("Milch", 0.5, "l"),
                ingredient("Eier", 3.0, "st"),
            ],
        },
        Recipe {
            id: RecipeId::new(3),
            title: "Butterbrot".to_owned(),
            description: String::new(),
            servings: 1,
            ingredients: vec![ingredient("Brot", 1.0, "st"), ingredient("butter", 20.0, "g")],
        },
    ]
}

pub fn demo_data() -> KitchenData {
    KitchenData {
        shopping: sample_items(Tab::Shopping),
        inventory: sample_items(Tab::Inventory),
        templates: sample_items(Tab::Templates),
        recipes: sample_recipes(),
        settings: Settings::default(),
    }
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let path = dir.path().join("config.toml");
    Ok((dir, path))
}

fn ingredient(name: &str, amount: f64, unit: &str) -> Ingredient {
    Ingredient {
        name: name.to_owned(),
        amount,
        unit: unit.to_owned(),
    }
}

/// One request as the mock backend saw it; `path` excludes the `/api` prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct BackendState {
    data: KitchenData,
    requests: Vec<RecordedRequest>,
    fail_next: Option<u16>,
}

/// In-memory kitchen backend served over HTTP on an ephemeral port.
pub struct MockBackend {
    addr: String,
    state: Arc<Mutex<BackendState>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl MockBackend {
    pub fn start() -> Result<Self> {
        Self::with_data(KitchenData::default())
    }

    pub fn with_data(data: KitchenData) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock backend: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let state = Arc::new(Mutex::new(BackendState {
            data,
            ..BackendState::default()
        }));

        let handle = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                while let Ok(request) = server.recv() {
                    serve(&state, request);
                }
            })
        };

        Ok(Self {
            addr,
            state,
            server,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("{}{API_PREFIX}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn data(&self) -> KitchenData {
        lock(&self.state).data.clone()
    }

    /// The next request is answered with `status` and a FastAPI-style detail body.
    pub fn fail_next(&self, status: u16) {
        lock(&self.state).fail_next = Some(status);
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn lock(state: &Mutex<BackendState>) -> MutexGuard<'_, BackendState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn serve(state: &Mutex<BackendState>, mut request: Request) {
    let mut raw = String::new();
    let _ = request.as_reader().read_to_string(&mut raw);
    let body = if raw.trim().is_empty() {
        None
    } else {
        Some(serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    };
    let method = request.method().as_str().to_owned();
    let path = request
        .url()
        .strip_prefix(API_PREFIX)
        .unwrap_or(request.url())
        .to_owned();

    let (status, reply) = {
        let mut guard = lock(state);
        guard.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            body: body.clone(),
        });
        match guard.fail_next.take() {
            Some(status) => (status, json!({ "detail": "injected failure" })),
            None => route(&mut guard.data, request.method(), &path, body.as_ref()),
        }
    };

    let response = Response::from_string(reply.to_string())
        .with_status_code(status)
        .with_header(json_header());
    let _ = request.respond(response);
}

fn json_header() -> Header {
    match Header::from_bytes("Content-Type", "application/json") {
        Ok(header) => header,
        Err(()) => unreachable!("static content type header is valid"),
    }
}

fn ok() -> (u16, Value) {
    (200, json!({ "status": "ok" }))
}

fn not_found(what: &str) -> (u16, Value) {
    (404, json!({ "detail": format!("{what} not found") }))
}

fn unprocessable(reason: &str) -> (u16, Value) {
    (422, json!({ "detail": reason }))
}

fn next_id(items: &[Item]) -> ItemId {
    ItemId::new(items.iter().map(|item| item.id.get()).max().unwrap_or(0) + 1)
}

fn append(items: &mut Vec<Item>, name: &str, amount: f64, unit: &str) -> Item {
    let item = Item {
        id: next_id(items),
        name: name.to_owned(),
        amount,
        unit: unit.to_owned(),
    };
    items.push(item.clone());
    item
}

fn to_value<T: serde::Serialize>(value: &T) -> (u16, Value) {
    match serde_json::to_value(value) {
        Ok(value) => (200, value),
        Err(error) => (500, json!({ "detail": error.to_string() })),
    }
}

fn route(data: &mut KitchenData, method: &Method, path: &str, body: Option<&Value>) -> (u16, Value) {
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    match (method, segments.as_slice()) {
        (Method::Get, ["settings"]) => to_value(&data.settings),
        (Method::Post, ["settings"]) => {
            let Some(settings) = body.and_then(|body| serde_json::from_value::<Settings>(body.clone()).ok())
            else {
                return unprocessable("default_tab required");
            };
            data.settings = settings;
            ok()
        }
        (Method::Get, ["recipes"]) => to_value(&data.recipes),
        (Method::Post, ["recipes", id, "cook"]) => cook(data, id),
        (Method::Post, ["templates", id, "use"]) => {
            let Some(template) = find(&data.templates, id).cloned() else {
                return not_found("Item");
            };
            append(&mut data.shopping, &template.name, template.amount, &template.unit);
            ok()
        }
        (Method::Post, [list, id, "move"]) => {
            let (from, to) = match *list {
                "shopping" => (Tab::Shopping, Tab::Inventory),
                "inventory" => (Tab::Inventory, Tab::Shopping),
                _ => return (400, json!({ "detail": "Invalid list name" })),
            };
            move_item(data, from, to, id)
        }
        (method, [list]) => {
            let Some(items) = Tab::parse(list).and_then(|tab| data.items_mut(tab)) else {
                return not_found("Route");
            };
            match method {
                Method::Get => to_value(items),
                Method::Post => match parse_payload(body) {
                    Some(payload) => {
                        let item = append(items, &payload.name, payload.amount, &payload.unit);
                        to_value(&item)
                    }
                    None => unprocessable("name, amount and unit required"),
                },
                _ => (405, json!({ "detail": "Method Not Allowed" })),
            }
        }
        (method, [list, id]) => {
            let Some(items) = Tab::parse(list).and_then(|tab| data.items_mut(tab)) else {
                return not_found("Route");
            };
            match method {
                Method::Put => {
                    let Some(payload) = parse_payload(body) else {
                        return unprocessable("name, amount and unit required");
                    };
                    let Some(item) = items
                        .iter_mut()
                        .find(|item| Some(item.id.get()) == id.parse().ok())
                    else {
                        return not_found("Item");
                    };
                    item.name = payload.name;
                    item.amount = payload.amount;
                    item.unit = payload.unit;
                    let updated = item.clone();
                    to_value(&updated)
                }
                Method::Delete => {
                    items.retain(|item| Some(item.id.get()) != id.parse().ok());
                    ok()
                }
                _ => (405, json!({ "detail": "Method Not Allowed" })),
            }
        }
        _ => not_found("Route"),
    }
}

fn parse_payload(body: Option<&Value>) -> Option<ItemPayload> {
    body.and_then(|body| serde_json::from_value(body.clone()).ok())
}

fn find<'a>(items: &'a [Item], id: &str) -> Option<&'a Item> {
    let id: i64 = id.parse().ok()?;
    items.iter().find(|item| item.id.get() == id)
}

fn move_item(data: &mut KitchenData, from: Tab, to: Tab, id: &str) -> (u16, Value) {
    let Some(item) = find(data.items(from), id).cloned() else {
        return not_found("Item");
    };
    if let Some(source) = data.items_mut(from) {
        source.retain(|entry| entry.id != item.id);
    }
    let Some(target) = data.items_mut(to) else {
        return not_found("Route");
    };
    let moved = append(target, &item.name, item.amount, &item.unit);
    to_value(&moved)
}

fn cook(data: &mut KitchenData, id: &str) -> (u16, Value) {
    let Ok(id) = id.parse::<i64>() else {
        return not_found("Recipe");
    };
    let Some(recipe) = data.recipes.iter().find(|recipe| recipe.id.get() == id).cloned() else {
        return not_found("Recipe");
    };
    for ingredient in &recipe.ingredients {
        if let Some(stock) = data
            .inventory
            .iter_mut()
            .find(|item| item.name.eq_ignore_ascii_case(&ingredient.name))
        {
            stock.amount -= ingredient.amount;
        }
    }
    ok()
}
