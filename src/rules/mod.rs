//! Automation rules - persisted trigger/action blobs
//!
//! The rule builder on the dashboard stores if-this-then-that rules as JSON
//! blobs. This service only does CRUD against the `automation_rules` table
//! (or an in-memory list when no store is configured); nothing in this
//! repository evaluates triggers against events. The execution engine lives
//! server-side with the hosted store.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::bus::{BusEvent, NotificationLevel, SharedBus};
use crate::store::{AutomationRuleRow, SharedStore};

/// Draft submitted by the rule builder form.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "empty_array")]
    pub triggers: Value,
    #[serde(default = "empty_array")]
    pub conditions: Value,
    #[serde(default = "empty_array")]
    pub actions: Value,
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

/// A starter rule offered by the builder UI.
#[derive(Debug, Clone, Serialize)]
pub struct RuleTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub triggers: &'static [&'static str],
    pub actions: &'static [&'static str],
}

/// Templates shown in the rule builder's quick-start list.
pub const RULE_TEMPLATES: &[RuleTemplate] = &[
    RuleTemplate {
        name: "Car Connect",
        description: "Auto-connect when car detected",
        triggers: &["bluetooth"],
        actions: &["connect", "audio"],
    },
    RuleTemplate {
        name: "Home Arrival",
        description: "Enable home mode at location",
        triggers: &["location"],
        actions: &["home_mode"],
    },
    RuleTemplate {
        name: "Sleep Mode",
        description: "Night time automation",
        triggers: &["time"],
        actions: &["volume_down"],
    },
];

pub struct RulesService {
    store: SharedStore,
    bus: SharedBus,
    /// Store-less fallback so the demo hub still has a working rule builder
    local: RwLock<Vec<AutomationRuleRow>>,
    local_seq: AtomicU64,
}

impl RulesService {
    pub fn new(store: SharedStore, bus: SharedBus) -> Self {
        Self {
            store,
            bus,
            local: RwLock::new(Vec::new()),
            local_seq: AtomicU64::new(1),
        }
    }

    /// All rules, newest first when backed by the store.
    pub async fn list(&self) -> Result<Vec<AutomationRuleRow>> {
        match &self.store {
            Some(store) => {
                let rows = store
                    .table("automation_rules")
                    .order("created_at", true)
                    .select::<AutomationRuleRow>()
                    .await
                    .map_err(|e| self.store_failure("load automation rules", e))?;
                Ok(rows)
            }
            None => Ok(self.local.read().await.clone()),
        }
    }

    /// Persist a new rule; enabled by default, execution count starts at 0.
    pub async fn create(&self, draft: RuleDraft) -> Result<AutomationRuleRow> {
        if draft.name.trim().is_empty() {
            return Err(anyhow!("rule name is required"));
        }

        let row = AutomationRuleRow {
            id: None,
            name: draft.name.trim().to_string(),
            description: draft.description,
            enabled: true,
            triggers: draft.triggers,
            conditions: draft.conditions,
            actions: draft.actions,
            execution_count: 0,
            last_executed_at: None,
        };

        let saved = match &self.store {
            Some(store) => store
                .table("automation_rules")
                .insert::<_, AutomationRuleRow>(&row)
                .await
                .map_err(|e| self.store_failure("save the automation rule", e))?,
            None => {
                let mut saved = row;
                saved.id = Some(format!(
                    "local-{}",
                    self.local_seq.fetch_add(1, Ordering::SeqCst)
                ));
                self.local.write().await.push(saved.clone());
                saved
            }
        };

        let rule_id = saved.id.clone().unwrap_or_default();
        self.bus.publish(BusEvent::RuleSaved {
            rule_id,
            name: saved.name.clone(),
        });
        self.bus.notify(
            NotificationLevel::Success,
            "Rule Created",
            format!("Automation rule \"{}\" saved", saved.name),
        );
        Ok(saved)
    }

    /// Enable or disable a rule.
    pub async fn set_enabled(&self, rule_id: &str, enabled: bool) -> Result<AutomationRuleRow> {
        let updated = match &self.store {
            Some(store) => {
                let rows: Vec<AutomationRuleRow> = store
                    .table("automation_rules")
                    .eq("id", rule_id)
                    .update(&serde_json::json!({ "enabled": enabled }))
                    .await
                    .map_err(|e| self.store_failure("update the automation rule", e))?;
                rows.into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("rule not found: {}", rule_id))?
            }
            None => {
                let mut rules = self.local.write().await;
                let rule = rules
                    .iter_mut()
                    .find(|r| r.id.as_deref() == Some(rule_id))
                    .ok_or_else(|| anyhow!("rule not found: {}", rule_id))?;
                rule.enabled = enabled;
                rule.clone()
            }
        };

        self.bus.publish(BusEvent::RuleToggled {
            rule_id: rule_id.to_string(),
            enabled,
        });
        self.bus.notify(
            NotificationLevel::Info,
            if enabled { "Rule Enabled" } else { "Rule Disabled" },
            format!("\"{}\" is now {}", updated.name, if enabled { "active" } else { "inactive" }),
        );
        Ok(updated)
    }

    /// Quick-start templates for the builder UI.
    pub fn templates(&self) -> &'static [RuleTemplate] {
        RULE_TEMPLATES
    }

    fn store_failure(&self, action: &str, error: crate::store::StoreError) -> anyhow::Error {
        warn!("Rule store error while trying to {}: {}", action, error);
        self.bus.notify(
            NotificationLevel::Error,
            "Automation Rules",
            format!("Could not {}", action),
        );
        anyhow!(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::create_bus;

    fn draft(name: &str) -> RuleDraft {
        RuleDraft {
            name: name.to_string(),
            description: Some("test rule".to_string()),
            triggers: serde_json::json!(["bluetooth"]),
            conditions: empty_array(),
            actions: serde_json::json!(["connect"]),
        }
    }

    #[tokio::test]
    async fn create_and_list_without_store() {
        let service = RulesService::new(None, create_bus());

        let saved = service.create(draft("Car Connect")).await.unwrap();
        assert!(saved.enabled);
        assert_eq!(saved.execution_count, 0);
        assert!(saved.id.as_deref().unwrap().starts_with("local-"));

        let rules = service.list().await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "Car Connect");
    }

    #[tokio::test]
    async fn toggle_flips_enabled() {
        let bus = create_bus();
        let service = RulesService::new(None, bus.clone());
        let saved = service.create(draft("Sleep Mode")).await.unwrap();
        let id = saved.id.unwrap();

        let mut rx = bus.subscribe();
        let updated = service.set_enabled(&id, false).await.unwrap();
        assert!(!updated.enabled);

        let mut saw_toggle = false;
        while let Ok(event) = rx.try_recv() {
            if let BusEvent::RuleToggled { enabled, .. } = event {
                assert!(!enabled);
                saw_toggle = true;
            }
        }
        assert!(saw_toggle);
    }

    #[tokio::test]
    async fn unknown_rule_toggle_errors() {
        let service = RulesService::new(None, create_bus());
        assert!(service.set_enabled("missing", true).await.is_err());
    }

    #[tokio::test]
    async fn blank_name_rejected() {
        let service = RulesService::new(None, create_bus());
        assert!(service.create(draft("   ")).await.is_err());
    }

    #[test]
    fn templates_cover_the_builder_quick_starts() {
        assert_eq!(RULE_TEMPLATES.len(), 3);
        assert!(RULE_TEMPLATES.iter().any(|t| t.name == "Car Connect"));
    }
}
