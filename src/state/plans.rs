//! Practice plan library ("classes")
//!
//! Saved classes and the active selection live in the preference store as
//! JSON, so the library survives restarts. Every mutation is written through
//! immediately; write failures are logged and the in-memory copy stays
//! authoritative.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::preferences::PreferenceStore;

pub const CLASSES_KEY: &str = "melodyfocus_classes";
pub const ACTIVE_CLASS_KEY: &str = "melodyfocus_active_class_id";

/// Category of a practice step as produced by the plan generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityType {
    /// Technique, slow reading, analysis
    Study,
    /// Fluent playing of pieces
    Practice,
    /// Short pauses, and anything the generator labels unexpectedly
    Break,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Study => "ESTUDIO",
            ActivityType::Practice => "PRÁCTICA",
            ActivityType::Break => "DESCANSO",
        }
    }
}

impl From<String> for ActivityType {
    fn from(raw: String) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "ESTUDIO" => ActivityType::Study,
            "PRÁCTICA" | "PRACTICA" => ActivityType::Practice,
            _ => ActivityType::Break,
        }
    }
}

impl From<ActivityType> for String {
    fn from(kind: ActivityType) -> Self {
        kind.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeStep {
    /// Minutes, as free text
    pub duration: String,
    pub action: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ActivityType,
}

/// A generated plan before it is saved as a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticePlan {
    #[serde(default)]
    pub title: String,
    pub steps: Vec<PracticeStep>,
    #[serde(default)]
    pub technique_tip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PianoClass {
    pub id: String,
    pub name: String,
    /// Planned length in minutes
    pub total_duration: u32,
    pub steps: Vec<PracticeStep>,
    pub technique_tip: String,
}

/// Partial update for a single step
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StepPatch {
    pub duration: Option<String>,
    pub action: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<ActivityType>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Class not found: {0}")]
    NotFound(String),

    #[error("Class {id} has no step {index}")]
    StepOutOfRange { id: String, index: usize },

    #[error("Plan library lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default)]
struct Library {
    classes: Vec<PianoClass>,
    active_id: Option<String>,
    last_id_millis: i64,
}

impl Library {
    fn find_mut(&mut self, id: &str) -> Result<&mut PianoClass, PlanError> {
        self.classes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PlanError::NotFound(id.to_string()))
    }

    /// Millisecond timestamp ids, bumped when two land in the same millisecond
    fn fresh_id(&mut self) -> String {
        let millis = Utc::now().timestamp_millis().max(self.last_id_millis + 1);
        self.last_id_millis = millis;
        millis.to_string()
    }
}

/// The user's saved practice classes
pub struct PlanLibrary {
    store: Arc<dyn PreferenceStore>,
    inner: Mutex<Library>,
}

impl PlanLibrary {
    /// Load saved classes; corrupt data starts an empty library
    pub fn load(store: Arc<dyn PreferenceStore>) -> Self {
        let classes = match store.get(CLASSES_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable saved classes: {}", e);
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read saved classes: {}", e);
                Vec::new()
            }
        };
        let active_id = store
            .get(ACTIVE_CLASS_KEY)
            .unwrap_or_else(|e| {
                warn!("Failed to read active class: {}", e);
                None
            })
            .filter(|id| classes.iter().any(|c: &PianoClass| &c.id == id));

        info!("Loaded {} saved classes", classes.len());
        Self {
            store,
            inner: Mutex::new(Library {
                classes,
                active_id,
                last_id_millis: 0,
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Library>, PlanError> {
        self.inner.lock().map_err(|_| PlanError::Poisoned)
    }

    fn persist(&self, library: &Library) {
        match serde_json::to_string(&library.classes) {
            Ok(json) => {
                if let Err(e) = self.store.set(CLASSES_KEY, &json) {
                    warn!("Failed to save classes: {}", e);
                }
            }
            Err(e) => warn!("Failed to encode classes: {}", e),
        }

        let result = match &library.active_id {
            Some(id) => self.store.set(ACTIVE_CLASS_KEY, id),
            None => self.store.remove(ACTIVE_CLASS_KEY),
        };
        if let Err(e) = result {
            warn!("Failed to save active class: {}", e);
        }
    }

    /// Apply `f` to the class `id` and save the library
    fn modify<T>(&self, id: &str, f: impl FnOnce(&mut PianoClass) -> Result<T, PlanError>) -> Result<T, PlanError> {
        let mut library = self.lock()?;
        let result = f(library.find_mut(id)?)?;
        self.persist(&library);
        Ok(result)
    }

    pub fn list(&self) -> Result<Vec<PianoClass>, PlanError> {
        Ok(self.lock()?.classes.clone())
    }

    pub fn get(&self, id: &str) -> Result<PianoClass, PlanError> {
        self.lock()?
            .classes
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| PlanError::NotFound(id.to_string()))
    }

    pub fn active(&self) -> Result<Option<PianoClass>, PlanError> {
        let library = self.lock()?;
        Ok(library
            .active_id
            .as_ref()
            .and_then(|id| library.classes.iter().find(|c| &c.id == id))
            .cloned())
    }

    pub fn select(&self, id: &str) -> Result<PianoClass, PlanError> {
        let mut library = self.lock()?;
        let class = library.find_mut(id)?.clone();
        library.active_id = Some(class.id.clone());
        self.persist(&library);
        Ok(class)
    }

    /// Start an empty class for manual editing; it becomes the active one
    pub fn create_manual(&self) -> Result<PianoClass, PlanError> {
        let mut library = self.lock()?;
        let class = PianoClass {
            id: library.fresh_id(),
            name: "New class".to_string(),
            total_duration: 30,
            steps: vec![PracticeStep {
                duration: "10".to_string(),
                action: "First block".to_string(),
                description: String::new(),
                kind: ActivityType::Study,
            }],
            technique_tip: "Keep a good posture.".to_string(),
        };
        library.classes.insert(0, class.clone());
        library.active_id = Some(class.id.clone());
        self.persist(&library);
        Ok(class)
    }

    /// Save a generated plan as a class named after the goal
    pub fn add_generated(&self, goal: &str, total_minutes: u32, plan: PracticePlan) -> Result<PianoClass, PlanError> {
        let mut library = self.lock()?;
        let class = PianoClass {
            id: library.fresh_id(),
            name: goal.to_string(),
            total_duration: total_minutes,
            steps: plan.steps,
            technique_tip: plan.technique_tip,
        };
        info!("Saving generated class {} with {} steps", class.id, class.steps.len());
        library.classes.insert(0, class.clone());
        library.active_id = Some(class.id.clone());
        self.persist(&library);
        Ok(class)
    }

    /// Remove a class; the first remaining class takes over if it was active
    pub fn delete(&self, id: &str) -> Result<(), PlanError> {
        let mut library = self.lock()?;
        let before = library.classes.len();
        library.classes.retain(|c| c.id != id);
        if library.classes.len() == before {
            return Err(PlanError::NotFound(id.to_string()));
        }
        if library.active_id.as_deref() == Some(id) {
            library.active_id = library.classes.first().map(|c| c.id.clone());
        }
        self.persist(&library);
        Ok(())
    }

    pub fn rename(&self, id: &str, name: &str) -> Result<PianoClass, PlanError> {
        self.modify(id, |class| {
            class.name = name.to_string();
            Ok(class.clone())
        })
    }

    pub fn add_step(&self, id: &str) -> Result<PianoClass, PlanError> {
        self.modify(id, |class| {
            class.steps.push(PracticeStep {
                duration: "5".to_string(),
                action: "New block".to_string(),
                description: String::new(),
                kind: ActivityType::Practice,
            });
            Ok(class.clone())
        })
    }

    pub fn update_step(&self, id: &str, index: usize, patch: StepPatch) -> Result<PianoClass, PlanError> {
        self.modify(id, |class| {
            let step = class.steps.get_mut(index).ok_or_else(|| PlanError::StepOutOfRange {
                id: id.to_string(),
                index,
            })?;
            if let Some(duration) = patch.duration {
                step.duration = duration;
            }
            if let Some(action) = patch.action {
                step.action = action;
            }
            if let Some(description) = patch.description {
                step.description = description;
            }
            if let Some(kind) = patch.kind {
                step.kind = kind;
            }
            Ok(class.clone())
        })
    }

    pub fn remove_step(&self, id: &str, index: usize) -> Result<PianoClass, PlanError> {
        self.modify(id, |class| {
            if index >= class.steps.len() {
                return Err(PlanError::StepOutOfRange {
                    id: id.to_string(),
                    index,
                });
            }
            class.steps.remove(index);
            Ok(class.clone())
        })
    }

    pub fn step(&self, id: &str, index: usize) -> Result<PracticeStep, PlanError> {
        self.get(id)?
            .steps
            .get(index)
            .cloned()
            .ok_or_else(|| PlanError::StepOutOfRange {
                id: id.to_string(),
                index,
            })
    }
}
