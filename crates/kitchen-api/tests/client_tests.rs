// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use kitchen_api::Client;
use kitchen_app::{Action, ActionOutcome, ItemId, ItemPayload, RecipeId, Settings, Tab, TabData};
use kitchen_testkit::{MockBackend, RecordedRequest, demo_data};
use serde_json::{Value, json};
use std::thread;
use std::time::Duration;
use tiny_http::{Response, Server};

fn client_for(backend: &MockBackend) -> Result<Client> {
    Client::new(&backend.base_url(), Some(Duration::from_secs(2)))
}

fn milk() -> ItemPayload {
    ItemPayload {
        name: "Milk".to_owned(),
        amount: 2.0,
        unit: "l".to_owned(),
    }
}

fn last_request(backend: &MockBackend) -> Result<RecordedRequest> {
    backend
        .requests()
        .pop()
        .ok_or_else(|| anyhow!("backend saw no request"))
}

#[test]
fn unreachable_backend_error_names_the_base_url() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/api", Some(Duration::from_millis(50)))?;
    let error = client
        .ping()
        .expect_err("ping should fail for unreachable endpoint");
    let message = format!("{error:#}");
    assert!(message.contains("http://127.0.0.1:1/api"));
    assert!(message.contains("kitchen backend running"));
    Ok(())
}

#[test]
fn create_posts_payload_to_collection() -> Result<()> {
    let backend = MockBackend::start()?;
    let client = client_for(&backend)?;

    let created = client.create_item(Tab::Shopping, &milk())?;
    assert_eq!(created.name, "Milk");

    let request = last_request(&backend)?;
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/shopping");
    assert_eq!(
        request.body,
        Some(json!({"name": "Milk", "amount": 2.0, "unit": "l"}))
    );
    Ok(())
}

#[test]
fn update_puts_to_item_path() -> Result<()> {
    let backend = MockBackend::with_data(demo_data())?;
    let client = client_for(&backend)?;

    let updated = client.update_item(Tab::Inventory, ItemId::new(2), &milk())?;
    assert_eq!(updated.id, ItemId::new(2));
    assert_eq!(updated.amount_label(), "2 l");

    let request = last_request(&backend)?;
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/inventory/2");
    Ok(())
}

#[test]
fn deleted_item_is_gone_from_next_listing() -> Result<()> {
    let backend = MockBackend::with_data(demo_data())?;
    let client = client_for(&backend)?;

    client.delete_item(Tab::Templates, ItemId::new(1))?;
    let request = last_request(&backend)?;
    assert_eq!(request.method, "DELETE");
    assert_eq!(request.path, "/templates/1");

    let remaining = client.list_items(Tab::Templates)?;
    assert!(remaining.iter().all(|item| item.id != ItemId::new(1)));
    assert_eq!(remaining.len(), 1);
    Ok(())
}

#[test]
fn move_posts_empty_object_for_both_directions() -> Result<()> {
    let mut data = demo_data();
    data.shopping.push(kitchen_testkit::sample_item(7, "Quark", 1.0, "st"));
    data.inventory.push(kitchen_testkit::sample_item(7, "Salz", 1.0, "kg"));
    let backend = MockBackend::with_data(data)?;
    let client = client_for(&backend)?;

    client.move_item(Tab::Shopping, ItemId::new(7))?;
    client.move_item(Tab::Inventory, ItemId::new(7))?;

    let paths: Vec<(String, String, Option<Value>)> = backend
        .requests()
        .into_iter()
        .map(|request| (request.method, request.path, request.body))
        .collect();
    assert_eq!(
        paths,
        vec![
            ("POST".to_owned(), "/shopping/7/move".to_owned(), Some(json!({}))),
            ("POST".to_owned(), "/inventory/7/move".to_owned(), Some(json!({}))),
        ]
    );
    Ok(())
}

#[test]
fn cook_and_use_template_hit_their_endpoints() -> Result<()> {
    let backend = MockBackend::with_data(demo_data())?;
    let client = client_for(&backend)?;

    assert_eq!(
        client.perform(&Action::Cook { id: RecipeId::new(3) })?,
        ActionOutcome::Cooked
    );
    assert_eq!(last_request(&backend)?.path, "/recipes/3/cook");

    assert_eq!(
        client.perform(&Action::UseTemplate { id: ItemId::new(2) })?,
        ActionOutcome::TemplateUsed
    );
    assert_eq!(last_request(&backend)?.path, "/templates/2/use");

    let shopping = backend.data().shopping;
    assert_eq!(shopping.last().map(|item| item.name.as_str()), Some("Nudeln"));
    Ok(())
}

#[test]
fn settings_round_trip_through_backend() -> Result<()> {
    let backend = MockBackend::start()?;
    let client = client_for(&backend)?;

    assert_eq!(client.settings()?.default_tab, Tab::Shopping);
    let saved = client.save_settings(&Settings {
        default_tab: Tab::Recipes,
    })?;
    assert_eq!(saved.default_tab, Tab::Recipes);

    let request = last_request(&backend)?;
    assert_eq!(request.path, "/settings");
    assert_eq!(request.body, Some(json!({"default_tab": "recipes"})));
    assert_eq!(client.settings()?.default_tab, Tab::Recipes);
    Ok(())
}

#[test]
fn load_tab_returns_matching_data_kind() -> Result<()> {
    let backend = MockBackend::with_data(demo_data())?;
    let client = client_for(&backend)?;

    match client.load_tab(Tab::Recipes)? {
        TabData::Recipes(recipes) => assert_eq!(recipes.len(), 2),
        other => panic!("expected recipes, got {other:?}"),
    }
    match client.load_tab(Tab::Inventory)? {
        TabData::Items(items) => assert_eq!(items.len(), 4),
        other => panic!("expected items, got {other:?}"),
    }
    Ok(())
}

#[test]
fn server_detail_is_surfaced_in_error() -> Result<()> {
    let backend = MockBackend::with_data(demo_data())?;
    let client = client_for(&backend)?;

    let error = client
        .update_item(Tab::Shopping, ItemId::new(99), &milk())
        .expect_err("unknown id should fail");
    let message = format!("{error:#}");
    assert!(message.contains("PUT /shopping/99"));
    assert!(message.contains("Item not found"));

    backend.fail_next(500);
    let error = client
        .list_items(Tab::Shopping)
        .expect_err("injected failure should surface");
    assert!(format!("{error:#}").contains("injected failure"));
    Ok(())
}

#[test]
fn empty_success_body_is_accepted() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/api", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/api/recipes/5/cook");
        request
            .respond(Response::empty(204))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, None)?;
    client.cook_recipe(RecipeId::new(5))?;

    handle.join().expect("server thread should join");
    Ok(())
}
