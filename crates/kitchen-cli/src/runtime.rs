// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use kitchen_api::Client;
use kitchen_app::{Action, ActionOutcome, Tab, TabData};
use kitchen_tui::InternalEvent;
use std::sync::mpsc::Sender;
use std::thread;

/// Runs every backend call on its own worker thread so the UI never blocks.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl kitchen_tui::AppRuntime for ApiRuntime {
    fn load_tab(&mut self, tab: Tab) -> Result<TabData> {
        self.client.load_tab(tab)
    }

    fn run_action(&mut self, action: &Action) -> Result<ActionOutcome> {
        self.client.perform(action)
    }

    fn spawn_load(&mut self, request_id: u64, tab: Tab, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("load-{}", tab.as_str()))
            .spawn(move || {
                let result = client.load_tab(tab).map_err(|error| {
                    let reason = format!("{error:#}");
                    tracing::warn!(tab = tab.as_str(), request_id, %reason, "load failed");
                    reason
                });
                let _ = tx.send(InternalEvent::Loaded { request_id, result });
            })
            .context("spawn load worker")?;
        Ok(())
    }

    fn spawn_action(&mut self, action: Action, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name("action".to_owned())
            .spawn(move || {
                let result = client.perform(&action).map_err(|error| format!("{error:#}"));
                match &result {
                    Ok(_) => tracing::info!(action = action.label(), target = ?action.target(), "action done"),
                    Err(reason) => {
                        tracing::warn!(action = action.label(), target = ?action.target(), %reason, "action failed");
                    }
                }
                let _ = tx.send(InternalEvent::ActionFinished { action, result });
            })
            .context("spawn action worker")?;
        Ok(())
    }
}
