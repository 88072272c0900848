//! The message filtering pipeline.
//!
//! Filters run once per message at the moment it would be appended to its
//! conversation buffer — never at the fragment or file level, because a
//! fragment-level filter would retain an entire conversation's history
//! whenever any single message in it passes.
//!
//! Predicates are ordered and independent; the first failure rejects and
//! short-circuits. Rejected messages are dropped entirely.

use crate::alias::AliasLookup;
use crate::config::EngineConfig;
use crate::phone::ParticipantSet;
use crate::record::MessageRecord;

/// Evaluates the ordered predicate chain against one message.
///
/// Pure with respect to the immutable configuration and alias store; safe
/// to call from any worker.
pub struct MessageFilter<'a> {
    config: &'a EngineConfig,
    aliases: &'a dyn AliasLookup,
}

impl<'a> MessageFilter<'a> {
    pub fn new(config: &'a EngineConfig, aliases: &'a dyn AliasLookup) -> Self {
        Self { config, aliases }
    }

    /// Returns `true` when the message survives every predicate.
    ///
    /// Order: date range, then alias-required, then service-code
    /// exclusion.
    pub fn accept(
        &self,
        message: &MessageRecord,
        participants: &ParticipantSet,
        is_group: bool,
    ) -> bool {
        // 1. Date range, both bounds inclusive and optional.
        if self
            .config
            .newer_than
            .is_some_and(|newer| message.timestamp < newer)
        {
            return false;
        }
        if self
            .config
            .older_than
            .is_some_and(|older| message.timestamp > older)
        {
            return false;
        }

        // 2. Alias-required. For a group, one known member keeps the
        //    conversation's messages.
        if self.config.alias_required {
            let known = if is_group {
                participants.iter().any(|p| self.aliases.has_alias(p))
            } else {
                self.aliases.has_alias(&message.counterpart)
            };
            if !known {
                return false;
            }
        }

        // 3. Toll-free and short-code counterparts, unless explicitly
        //    included. Group identity is never a service code.
        if !self.config.include_service_codes
            && !is_group
            && message.counterpart.is_service_code()
        {
            return false;
        }

        true
    }
}
