mod classification;
mod error;
mod matching_rules;
mod message;
mod prompt;
mod rule;

pub use classification::Classified;
pub use error::{CompileError, RuleError};
pub use matching_rules::{Layer, MatchingRules, RuleLayers, RulePermissions};
pub use message::{Attachment, ClassifiedRecipient, OutgoingMessage};
pub use prompt::{Alert, Confirm, ItemsReader, NoFiles, Prompt, PromptTargets};
pub use rule::{
    Action, Condition, Highlight, ItemsSource, MatchTarget, MessageFacts, Rule, RuleKey, RulePatch,
};
