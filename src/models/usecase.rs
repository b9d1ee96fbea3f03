//! Use-case categories and the name/description classifier

use crate::models::LlmModel;
use serde::Serialize;
use std::fmt;

/// Workload category a model is primarily built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UseCase {
    General,
    Coding,
    Reasoning,
    Chat,
    Multimodal,
    Embedding,
}

/// Where a classifier pattern is looked for
#[derive(Clone, Copy)]
enum Field {
    Name,
    Text,
    Either,
}

/// Ordered classifier rules; the first match wins
const RULES: &[(UseCase, Field, &str)] = &[
    (UseCase::Embedding, Field::Text, "embedding"),
    (UseCase::Embedding, Field::Name, "embed"),
    (UseCase::Embedding, Field::Name, "bge"),
    (UseCase::Coding, Field::Either, "code"),
    (UseCase::Multimodal, Field::Text, "vision"),
    (UseCase::Multimodal, Field::Text, "multimodal"),
    (UseCase::Reasoning, Field::Text, "reason"),
    (UseCase::Reasoning, Field::Text, "chain-of-thought"),
    (UseCase::Reasoning, Field::Name, "deepseek-r1"),
    (UseCase::Chat, Field::Text, "chat"),
    (UseCase::Chat, Field::Text, "instruction"),
];

impl UseCase {
    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            UseCase::General => "General",
            UseCase::Coding => "Coding",
            UseCase::Reasoning => "Reasoning",
            UseCase::Chat => "Chat",
            UseCase::Multimodal => "Multimodal",
            UseCase::Embedding => "Embedding",
        }
    }

    /// Classify a model by its name and free-text use case
    pub fn from_model(model: &LlmModel) -> Self {
        Self::classify(&model.name, &model.use_case)
    }

    /// Classify from raw strings (case-insensitive substring rules)
    pub fn classify(name: &str, use_case: &str) -> Self {
        let name = name.to_lowercase();
        let text = use_case.to_lowercase();
        RULES
            .iter()
            .find(|(_, field, pat)| match field {
                Field::Name => name.contains(pat),
                Field::Text => text.contains(pat),
                Field::Either => name.contains(pat) || text.contains(pat),
            })
            .map(|(uc, _, _)| *uc)
            .unwrap_or(UseCase::General)
    }

    /// Parse a user-supplied filter label. Unrecognized labels yield `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "general" => Some(UseCase::General),
            "coding" | "code" => Some(UseCase::Coding),
            "reasoning" | "reason" => Some(UseCase::Reasoning),
            "chat" => Some(UseCase::Chat),
            "multimodal" | "vision" => Some(UseCase::Multimodal),
            "embedding" | "embed" => Some(UseCase::Embedding),
            _ => None,
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
