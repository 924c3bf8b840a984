// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Definition builder and an engine harness over in-memory stores

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;

use stagehand::actions::ActionDispatcher;
use stagehand::audit::MemorySink;
use stagehand::config::EngineConfig;
use stagehand::definition::WorkflowDefinition;
use stagehand::engine::{ResilientExecutor, WorkflowStateMachine};
use stagehand::state::TaskRecord;
use stagehand::store::{InMemoryDefinitionStore, InMemoryTaskStore, InMemoryTriggerStore, TaskStore};

pub struct DefinitionBuilder {
    id: String,
    name: String,
    variables: Value,
    nodes: Vec<Value>,
    edges: Vec<Value>,
}

impl DefinitionBuilder {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            variables: json!({}),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn with_variables(mut self, variables: Value) -> Self {
        self.variables = variables;
        self
    }

    pub fn add_task(mut self, id: &str, label: &str) -> Self {
        self.nodes.push(json!({"id": id, "type": "task", "label": label}));
        self
    }

    pub fn add_approval(mut self, id: &str, label: &str) -> Self {
        self.nodes
            .push(json!({"id": id, "type": "approval", "label": label}));
        self
    }

    pub fn add_notification(mut self, id: &str, label: &str) -> Self {
        self.nodes
            .push(json!({"id": id, "type": "notification", "label": label}));
        self
    }

    pub fn add_condition(mut self, id: &str, label: &str, condition: &str) -> Self {
        self.nodes.push(json!({
            "id": id,
            "type": "condition",
            "label": label,
            "data": {"condition": condition},
        }));
        self
    }

    pub fn add_webhook(
        mut self,
        id: &str,
        label: &str,
        url: &str,
        max_attempts: u32,
        on_error_next_node: Option<&str>,
    ) -> Self {
        let mut node = json!({
            "id": id,
            "type": "webhook_action",
            "label": label,
            "data": {
                "url": url,
                "body_template": "{\"task\": \"{{task_title}}\"}",
                "timeout_seconds": 5,
            },
            "retry_policy": {"max_attempts": max_attempts, "delay_seconds": 0, "backoff": false},
        });
        if let Some(target) = on_error_next_node {
            node["on_error_next_node"] = json!(target);
        }
        self.nodes.push(node);
        self
    }

    pub fn add_ai_worker(mut self, id: &str, label: &str, output_variable: &str) -> Self {
        self.nodes.push(json!({
            "id": id,
            "type": "ai_worker",
            "label": label,
            "data": {
                "system_prompt": "You are a workflow assistant.",
                "user_prompt": "Summarize order for {{customer}}",
                "output_variable": output_variable,
            },
            "retry_policy": {"max_attempts": 1, "delay_seconds": 0, "backoff": false},
        }));
        self
    }

    pub fn add_edge(mut self, source: &str, target: &str) -> Self {
        self.edges.push(json!({"source": source, "target": target}));
        self
    }

    pub fn add_labeled_edge(mut self, source: &str, target: &str, label: &str) -> Self {
        self.edges
            .push(json!({"source": source, "target": target, "label": label}));
        self
    }

    pub fn build(self) -> WorkflowDefinition {
        WorkflowDefinition::from_json(json!({
            "id": self.id,
            "name": self.name,
            "variables": self.variables,
            "nodes": self.nodes,
            "edges": self.edges,
        }))
        .expect("test definition should be valid")
    }
}

pub struct Harness {
    pub definitions: Arc<InMemoryDefinitionStore>,
    pub tasks: Arc<InMemoryTaskStore>,
    pub triggers: Arc<InMemoryTriggerStore>,
    pub audit: Arc<MemorySink>,
    pub machine: Arc<WorkflowStateMachine>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let definitions = Arc::new(InMemoryDefinitionStore::new());
        let tasks = Arc::new(InMemoryTaskStore::new());
        let triggers = Arc::new(InMemoryTriggerStore::new());
        let audit = Arc::new(MemorySink::new());

        let dispatcher =
            ActionDispatcher::new(&config).expect("dispatcher should build from config");
        let executor = ResilientExecutor::new(tasks.clone(), audit.clone(), dispatcher);
        let machine = Arc::new(WorkflowStateMachine::new(
            definitions.clone(),
            tasks.clone(),
            executor,
            audit.clone(),
        ));

        Self {
            definitions,
            tasks,
            triggers,
            audit,
            machine,
        }
    }

    pub async fn seed_definition(&self, definition: WorkflowDefinition) -> String {
        let id = definition.id.clone();
        self.definitions.insert(definition).await;
        id
    }

    pub async fn seed_task(&self, title: &str) -> String {
        let record = TaskRecord::new(title);
        let task_id = record.id.clone();
        self.tasks.put(record).await.expect("task seed");
        task_id
    }

    pub async fn task(&self, task_id: &str) -> TaskRecord {
        self.tasks
            .get(task_id)
            .await
            .expect("task store read")
            .expect("task should exist")
    }
}
