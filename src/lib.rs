mod attachment_classifier;
mod compile;
mod config;
mod error;
mod evaluate;
mod merge;
pub mod parse;
mod policy;
mod recipient_classifier;
mod types;
mod workflow;

pub use attachment_classifier::{AttachmentClassifier, AttachmentClassifierBuilder};
pub use config::Configs;
pub use error::SendcheckError;
pub use policy::{PolicyDecision, SendPolicy, SkipReason};
pub use recipient_classifier::{ClassifiedRecipients, RecipientClassifier};
pub use types::{
    Action, Alert, Attachment, Classified, ClassifiedRecipient, CompileError, Condition, Confirm,
    Highlight, ItemsReader, ItemsSource, Layer, MatchTarget, MatchingRules, MessageFacts, NoFiles,
    OutgoingMessage, Prompt, PromptTargets, Rule, RuleError, RuleKey, RuleLayers, RulePatch,
    RulePermissions,
};
