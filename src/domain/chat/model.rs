//! Chat model selection.
//!
//! The gateway exposes a fixed set of short aliases; each maps to the full
//! model identifier the upstream service expects. A conversation is pinned to
//! its model at creation and never changes it.

use serde::{Deserialize, Serialize};

/// A backend model selectable through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChatModel {
    Gpt4oMini,
    Claude3Haiku,
    Llama,
    Mixtral,
}

impl ChatModel {
    /// All models the gateway recognizes.
    pub const ALL: [ChatModel; 4] = [
        ChatModel::Gpt4oMini,
        ChatModel::Claude3Haiku,
        ChatModel::Llama,
        ChatModel::Mixtral,
    ];

    /// Resolves a caller-facing alias to a model.
    ///
    /// Returns `None` for unrecognized aliases; callers translate that into
    /// an invalid-model error.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "gpt-4o-mini" => Some(Self::Gpt4oMini),
            "claude-3-haiku" => Some(Self::Claude3Haiku),
            "llama" => Some(Self::Llama),
            "mixtral" => Some(Self::Mixtral),
            _ => None,
        }
    }

    /// The caller-facing alias for this model.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Claude3Haiku => "claude-3-haiku",
            Self::Llama => "llama",
            Self::Mixtral => "mixtral",
        }
    }

    /// The full identifier sent to the upstream service.
    pub fn upstream_id(&self) -> &'static str {
        match self {
            Self::Gpt4oMini => "gpt-4o-mini",
            Self::Claude3Haiku => "claude-3-haiku-20240307",
            Self::Llama => "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo",
            Self::Mixtral => "mistralai/Mixtral-8x7B-Instruct-v0.1",
        }
    }
}

impl std::fmt::Display for ChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alias())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_every_known_alias() {
        assert_eq!(ChatModel::from_alias("gpt-4o-mini"), Some(ChatModel::Gpt4oMini));
        assert_eq!(
            ChatModel::from_alias("claude-3-haiku"),
            Some(ChatModel::Claude3Haiku)
        );
        assert_eq!(ChatModel::from_alias("llama"), Some(ChatModel::Llama));
        assert_eq!(ChatModel::from_alias("mixtral"), Some(ChatModel::Mixtral));
    }

    #[test]
    fn rejects_unknown_aliases() {
        assert_eq!(ChatModel::from_alias("gpt-5"), None);
        assert_eq!(ChatModel::from_alias(""), None);
        assert_eq!(ChatModel::from_alias("LLAMA"), None);
    }

    #[test]
    fn alias_round_trips() {
        for model in ChatModel::ALL {
            assert_eq!(ChatModel::from_alias(model.alias()), Some(model));
        }
    }

    #[test]
    fn upstream_ids_match_fixed_mapping() {
        assert_eq!(ChatModel::Gpt4oMini.upstream_id(), "gpt-4o-mini");
        assert_eq!(
            ChatModel::Claude3Haiku.upstream_id(),
            "claude-3-haiku-20240307"
        );
        assert_eq!(
            ChatModel::Llama.upstream_id(),
            "meta-llama/Meta-Llama-3.1-70B-Instruct-Turbo"
        );
        assert_eq!(
            ChatModel::Mixtral.upstream_id(),
            "mistralai/Mixtral-8x7B-Instruct-v0.1"
        );
    }
}
