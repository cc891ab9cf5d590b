// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use crate::{
    FormKind, FormState, Item, ItemFormInput, ItemId, ItemPayload, Recipe, RecipeId, Settings,
    SettingsFormInput, Tab, TabData,
};

const CONFIRM_DELETE: &str = "Wirklich löschen?";
const CONFIRM_COOK: &str = "Rezept kochen? Zutaten werden vom Bestand abgezogen.";
const RECIPE_CREATE_UNSUPPORTED: &str = "Rezepte hinzufügen noch nicht implementiert";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Form(FormKind),
    Confirm,
}

/// What the body of the active tab currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum TabView {
    Loading { request_id: u64 },
    Ready(TabData),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionTarget {
    NewItem(Tab),
    Item(Tab, ItemId),
    Recipe(RecipeId),
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionStatus {
    #[default]
    Idle,
    Pending,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Save {
        tab: Tab,
        id: Option<ItemId>,
        payload: ItemPayload,
    },
    Delete {
        tab: Tab,
        id: ItemId,
    },
    Move {
        tab: Tab,
        id: ItemId,
    },
    UseTemplate {
        id: ItemId,
    },
    Cook {
        id: RecipeId,
    },
    SaveSettings(Settings),
}

impl Action {
    pub const fn target(&self) -> ActionTarget {
        match self {
            Self::Save { tab, id: None, .. } => ActionTarget::NewItem(*tab),
            Self::Save {
                tab, id: Some(id), ..
            }
            | Self::Delete { tab, id }
            | Self::Move { tab, id } => ActionTarget::Item(*tab, *id),
            Self::UseTemplate { id } => ActionTarget::Item(Tab::Templates, *id),
            Self::Cook { id } => ActionTarget::Recipe(*id),
            Self::SaveSettings(_) => ActionTarget::Settings,
        }
    }

    /// The tab whose list the action changes, if any.
    pub const fn mutated_tab(&self) -> Option<Tab> {
        match self {
            Self::Save { tab, .. } | Self::Delete { tab, .. } | Self::Move { tab, .. } => {
                Some(*tab)
            }
            Self::UseTemplate { .. } | Self::Cook { .. } | Self::SaveSettings(_) => None,
        }
    }

    pub const fn confirmation_prompt(&self) -> Option<&'static str> {
        match self {
            Self::Delete { .. } => Some(CONFIRM_DELETE),
            Self::Cook { .. } => Some(CONFIRM_COOK),
            _ => None,
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            Self::Save { .. } => "speichern",
            Self::Delete { .. } => "löschen",
            Self::Move { .. } => "verschieben",
            Self::UseTemplate { .. } => "Vorlage verwenden",
            Self::Cook { .. } => "kochen",
            Self::SaveSettings(_) => "Einstellungen speichern",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    Saved(Item),
    Removed(ItemId),
    Moved(ItemId),
    TemplateUsed,
    Cooked,
    SettingsSaved(Settings),
}

impl ActionOutcome {
    fn status_message(&self, action: &Action) -> String {
        match self {
            Self::Saved(item) => format!("gespeichert: {}", item.name),
            Self::Removed(_) => "gelöscht".to_owned(),
            Self::Moved(_) => match action {
                Action::Move {
                    tab: Tab::Inventory,
                    ..
                } => "auf die Einkaufsliste verschoben".to_owned(),
                _ => "in den Vorrat verschoben".to_owned(),
            },
            Self::TemplateUsed => "Zur Einkaufsliste hinzugefügt".to_owned(),
            Self::Cooked => "Guten Appetit! Bestand aktualisiert.".to_owned(),
            Self::SettingsSaved(settings) => format!(
                "Einstellungen gespeichert (Start: {})",
                settings.default_tab.label()
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub mode: AppMode,
    pub active_tab: Tab,
    pub view: TabView,
    pub selected: usize,
    pub settings: Settings,
    pub form: Option<FormState>,
    pub confirm: Option<Action>,
    pub statuses: BTreeMap<ActionTarget, ActionStatus>,
    pub status_line: Option<String>,
    next_request_id: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_settings(Settings::default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    SwitchTab(Tab),
    NextTab,
    PrevTab,
    Reload,
    FinishLoad {
        request_id: u64,
        result: Result<TabData, String>,
    },
    MoveSelection(isize),
    OpenCreateForm,
    OpenEditForm,
    OpenSettingsForm,
    CancelForm,
    SubmitForm,
    DeleteSelected,
    RunContextAction,
    RequestAction(Action),
    Confirm,
    Decline,
    FinishAction {
        action: Action,
        result: Result<ActionOutcome, String>,
    },
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    TabChanged(Tab),
    LoadRequested { tab: Tab, request_id: u64 },
    Loaded(Tab),
    LoadFailed(String),
    LoadDiscarded { request_id: u64 },
    SelectionChanged(usize),
    FormRejected(String),
    ActionStarted(Action),
    ActionRefused(ActionTarget),
    ActionDeclined(ActionTarget),
    ActionSucceeded(ActionTarget),
    ActionFailed { target: ActionTarget, reason: String },
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            mode: AppMode::Nav,
            active_tab: settings.default_tab,
            view: TabView::Loading { request_id: 0 },
            selected: 0,
            settings,
            form: None,
            confirm: None,
            statuses: BTreeMap::new(),
            status_line: None,
            next_request_id: 0,
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::SwitchTab(tab) => self.switch_tab(tab),
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::Reload => vec![self.begin_load()],
            AppCommand::FinishLoad { request_id, result } => self.finish_load(request_id, result),
            AppCommand::MoveSelection(delta) => self.move_selection(delta),
            AppCommand::OpenCreateForm => self.open_create_form(),
            AppCommand::OpenEditForm => self.open_edit_form(),
            AppCommand::OpenSettingsForm => {
                let input = SettingsFormInput::from_settings(self.settings);
                self.open_form(FormState::Settings(input))
            }
            AppCommand::CancelForm => {
                self.form = None;
                self.set_mode(AppMode::Nav)
            }
            AppCommand::SubmitForm => self.submit_form(),
            AppCommand::DeleteSelected => match self.selected_item() {
                Some(item) => {
                    let action = Action::Delete {
                        tab: self.active_tab,
                        id: item.id,
                    };
                    self.request_action(action)
                }
                None => vec![self.set_status("kein Eintrag ausgewählt")],
            },
            AppCommand::RunContextAction => match self.context_action_for_selection() {
                Some(action) => self.request_action(action),
                None => vec![self.set_status("kein Eintrag ausgewählt")],
            },
            AppCommand::RequestAction(action) => self.request_action(action),
            AppCommand::Confirm => {
                let Some(action) = self.confirm.take() else {
                    return self.set_mode(AppMode::Nav);
                };
                let mut events = self.set_mode(AppMode::Nav);
                events.extend(self.start_action(action));
                events
            }
            AppCommand::Decline => {
                let target = self.confirm.take().map(|action| action.target());
                let mut events = self.set_mode(AppMode::Nav);
                if let Some(target) = target {
                    events.push(AppEvent::ActionDeclined(target));
                    events.push(self.set_status("abgebrochen"));
                }
                events
            }
            AppCommand::FinishAction { action, result } => self.finish_action(action, result),
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    pub fn items(&self) -> Option<&[Item]> {
        match &self.view {
            TabView::Ready(TabData::Items(items)) => Some(items),
            _ => None,
        }
    }

    pub fn recipes(&self) -> Option<&[Recipe]> {
        match &self.view {
            TabView::Ready(TabData::Recipes(recipes)) => Some(recipes),
            _ => None,
        }
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.items().and_then(|items| items.get(self.selected))
    }

    pub fn selected_recipe(&self) -> Option<&Recipe> {
        self.recipes().and_then(|recipes| recipes.get(self.selected))
    }

    pub fn status_of(&self, target: ActionTarget) -> ActionStatus {
        self.statuses.get(&target).cloned().unwrap_or_default()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.view, TabView::Loading { .. })
    }

    fn context_action_for_selection(&self) -> Option<Action> {
        match self.active_tab {
            Tab::Shopping | Tab::Inventory => self.selected_item().map(|item| Action::Move {
                tab: self.active_tab,
                id: item.id,
            }),
            Tab::Templates => self
                .selected_item()
                .map(|item| Action::UseTemplate { id: item.id }),
            Tab::Recipes => self
                .selected_recipe()
                .map(|recipe| Action::Cook { id: recipe.id }),
        }
    }

    fn switch_tab(&mut self, tab: Tab) -> Vec<AppEvent> {
        self.active_tab = tab;
        self.selected = 0;
        self.statuses
            .retain(|_, status| matches!(status, ActionStatus::Pending));
        vec![AppEvent::TabChanged(tab), self.begin_load()]
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        let tabs = Tab::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.switch_tab(tabs[next])
    }

    fn begin_load(&mut self) -> AppEvent {
        self.next_request_id = self.next_request_id.saturating_add(1);
        let request_id = self.next_request_id;
        self.view = TabView::Loading { request_id };
        AppEvent::LoadRequested {
            tab: self.active_tab,
            request_id,
        }
    }

    fn finish_load(&mut self, request_id: u64, result: Result<TabData, String>) -> Vec<AppEvent> {
        if self.view != (TabView::Loading { request_id }) {
            return vec![AppEvent::LoadDiscarded { request_id }];
        }

        match result {
            Ok(data) if data.matches_tab(self.active_tab) => {
                self.view = TabView::Ready(data);
                self.clamp_selection();
                vec![AppEvent::Loaded(self.active_tab)]
            }
            Ok(_) => {
                let reason = format!("unerwartete Daten für {}", self.active_tab.label());
                self.view = TabView::Failed(reason.clone());
                vec![AppEvent::LoadFailed(reason)]
            }
            Err(reason) => {
                self.view = TabView::Failed(reason.clone());
                vec![AppEvent::LoadFailed(reason)]
            }
        }
    }

    fn move_selection(&mut self, delta: isize) -> Vec<AppEvent> {
        let len = match &self.view {
            TabView::Ready(data) => data.len(),
            _ => 0,
        };
        if len == 0 {
            return Vec::new();
        }
        let max = len as isize - 1;
        let next = (self.selected as isize + delta).clamp(0, max) as usize;
        if next == self.selected {
            return Vec::new();
        }
        self.selected = next;
        vec![AppEvent::SelectionChanged(next)]
    }

    fn clamp_selection(&mut self) {
        let len = match &self.view {
            TabView::Ready(data) => data.len(),
            _ => 0,
        };
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn open_create_form(&mut self) -> Vec<AppEvent> {
        if !self.active_tab.supports_create() {
            return vec![self.set_status(RECIPE_CREATE_UNSUPPORTED)];
        }
        self.open_form(FormState::Item(ItemFormInput::default()))
    }

    fn open_edit_form(&mut self) -> Vec<AppEvent> {
        if !self.active_tab.supports_edit() {
            return vec![self.set_status("Rezepte bearbeiten nicht unterstützt")];
        }
        let Some(item) = self.selected_item() else {
            return vec![self.set_status("kein Eintrag ausgewählt")];
        };
        let input = ItemFormInput::from_item(item);
        self.open_form(FormState::Item(input))
    }

    fn open_form(&mut self, form: FormState) -> Vec<AppEvent> {
        let kind = form.kind();
        self.form = Some(form);
        self.set_mode(AppMode::Form(kind))
    }

    fn submit_form(&mut self) -> Vec<AppEvent> {
        let action = match &self.form {
            None => return self.set_mode(AppMode::Nav),
            Some(FormState::Settings(input)) => Action::SaveSettings(input.to_settings()),
            Some(FormState::Item(input)) => {
                if !self.active_tab.supports_create() {
                    return vec![self.set_status(RECIPE_CREATE_UNSUPPORTED)];
                }
                match input.validate() {
                    Ok(payload) => Action::Save {
                        tab: self.active_tab,
                        id: input.id,
                        payload,
                    },
                    Err(error) => {
                        let reason = format!("Formular ungültig: {error}");
                        return vec![
                            AppEvent::FormRejected(reason.clone()),
                            self.set_status(&reason),
                        ];
                    }
                }
            }
        };

        let events = self.start_action(action);
        if events
            .iter()
            .any(|event| matches!(event, AppEvent::ActionRefused(_)))
        {
            return events;
        }
        self.form = None;
        let mut out = self.set_mode(AppMode::Nav);
        out.extend(events);
        out
    }

    fn request_action(&mut self, action: Action) -> Vec<AppEvent> {
        if action.confirmation_prompt().is_some() {
            self.confirm = Some(action);
            return self.set_mode(AppMode::Confirm);
        }
        self.start_action(action)
    }

    fn start_action(&mut self, action: Action) -> Vec<AppEvent> {
        let target = action.target();
        if self.status_of(target) == ActionStatus::Pending {
            let message = format!("{} läuft noch", action.label());
            return vec![AppEvent::ActionRefused(target), self.set_status(&message)];
        }
        self.statuses.insert(target, ActionStatus::Pending);
        vec![AppEvent::ActionStarted(action)]
    }

    fn finish_action(
        &mut self,
        action: Action,
        result: Result<ActionOutcome, String>,
    ) -> Vec<AppEvent> {
        let target = action.target();
        match result {
            Ok(outcome) => {
                self.statuses.remove(&target);
                let reload = self.reconcile(&action, &outcome);
                let message = outcome.status_message(&action);
                let mut events = vec![AppEvent::ActionSucceeded(target), self.set_status(&message)];
                events.extend(reload);
                events
            }
            Err(reason) => {
                self.statuses
                    .insert(target, ActionStatus::Failed(reason.clone()));
                let message = format!("{} fehlgeschlagen: {reason}", action.label());
                let mut events = vec![
                    AppEvent::ActionFailed { target, reason },
                    self.set_status(&message),
                ];
                if action.mutated_tab() == Some(self.active_tab) {
                    events.push(self.begin_load());
                }
                events
            }
        }
    }

    /// Applies a successful mutation to the visible list. A load still in
    /// flight was issued before the mutation landed, so it is replaced.
    fn reconcile(&mut self, action: &Action, outcome: &ActionOutcome) -> Option<AppEvent> {
        if let ActionOutcome::SettingsSaved(settings) = outcome {
            self.settings = *settings;
            return None;
        }
        if action.mutated_tab() != Some(self.active_tab) {
            return None;
        }
        if matches!(self.view, TabView::Loading { .. }) {
            return Some(self.begin_load());
        }
        let TabView::Ready(TabData::Items(items)) = &mut self.view else {
            return None;
        };

        match outcome {
            ActionOutcome::Saved(item) => {
                if let Some(existing) = items.iter_mut().find(|entry| entry.id == item.id) {
                    *existing = item.clone();
                } else {
                    items.push(item.clone());
                    self.selected = items.len() - 1;
                }
            }
            ActionOutcome::Removed(id) | ActionOutcome::Moved(id) => {
                items.retain(|entry| entry.id != *id);
            }
            ActionOutcome::TemplateUsed
            | ActionOutcome::Cooked
            | ActionOutcome::SettingsSaved(_) => {}
        }
        self.clamp_selection();
        None
    }

    fn set_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
