// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pending command queue.
//!
//! Commands whose dispatch failed at the transport level while the device
//! was online are parked here and retried after the next successful
//! reconcile. Only the latest write per field is kept.

use super::PayloadCommand;

/// Number of failed retries a parked command tolerates before it is dropped.
pub const COMMAND_MAXIMUM_SKIPS: u32 = 3;

/// A parked command with its retry count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    command: PayloadCommand,
    skips: u32,
}

impl PendingCommand {
    /// Returns the parked command.
    #[must_use]
    pub fn command(&self) -> &PayloadCommand {
        &self.command
    }

    /// Returns how many retries have failed so far.
    #[must_use]
    pub fn skips(&self) -> u32 {
        self.skips
    }
}

/// Queue of commands awaiting retry, coalesced per field.
///
/// # Examples
///
/// ```
/// use coway_bridge::command::{CommandQueue, Field, PayloadCommand};
///
/// let mut queue = CommandQueue::new();
/// queue.park(&[PayloadCommand::new(Field::FanSpeed, "1")]);
/// queue.park(&[PayloadCommand::new(Field::FanSpeed, "3")]);
///
/// // Only the latest write for a field survives
/// let batch = queue.take();
/// assert_eq!(batch.len(), 1);
/// assert_eq!(batch[0].command().value(), "3");
/// ```
#[derive(Debug, Clone)]
pub struct CommandQueue {
    pending: Vec<PendingCommand>,
    max_skips: u32,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// Creates an empty queue using [`COMMAND_MAXIMUM_SKIPS`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_skips(COMMAND_MAXIMUM_SKIPS)
    }

    /// Creates an empty queue with a custom skip budget.
    #[must_use]
    pub fn with_max_skips(max_skips: u32) -> Self {
        Self {
            pending: Vec::new(),
            max_skips,
        }
    }

    /// Returns the number of parked commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is parked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Parks freshly failed commands, replacing older writes to the same field.
    pub fn park(&mut self, commands: &[PayloadCommand]) {
        for command in commands {
            let fresh = PendingCommand {
                command: command.clone(),
                skips: 0,
            };
            match self.position(command.key()) {
                Some(index) => self.pending[index] = fresh,
                None => self.pending.push(fresh),
            }
        }
    }

    /// Forgets parked commands superseded by a successful write.
    pub fn discard(&mut self, commands: &[PayloadCommand]) {
        self.pending
            .retain(|p| !commands.iter().any(|c| c.key() == p.command.key()));
    }

    /// Forgets the parked command for a field code, if any.
    ///
    /// Returns `true` if a command was removed.
    pub fn forget(&mut self, key: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.command.key() != key);
        self.pending.len() != before
    }

    /// Removes and returns every parked command for a retry.
    pub fn take(&mut self) -> Vec<PendingCommand> {
        std::mem::take(&mut self.pending)
    }

    /// Puts back a batch whose retry failed.
    ///
    /// Each command gains one skip. Commands over the skip budget, and
    /// commands superseded by a newer write parked meanwhile, are returned
    /// as dropped.
    pub fn defer(&mut self, batch: Vec<PendingCommand>) -> Vec<PayloadCommand> {
        let mut dropped = Vec::new();
        for mut pending in batch {
            pending.skips += 1;
            if pending.skips > self.max_skips || self.position(pending.command.key()).is_some()
            {
                dropped.push(pending.command);
            } else {
                self.pending.push(pending);
            }
        }
        dropped
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.pending.iter().position(|p| p.command.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Field;

    fn speed(value: &str) -> PayloadCommand {
        PayloadCommand::new(Field::FanSpeed, value)
    }

    #[test]
    fn park_keeps_distinct_fields() {
        let mut queue = CommandQueue::new();
        queue.park(&[
            PayloadCommand::new(Field::Power, "1"),
            speed("2"),
        ]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn park_resets_skips_of_replaced_command() {
        let mut queue = CommandQueue::new();
        queue.park(&[speed("1")]);
        let batch = queue.take();
        assert!(queue.defer(batch).is_empty());
        queue.park(&[speed("2")]);

        let batch = queue.take();
        assert_eq!(batch[0].skips(), 0);
        assert_eq!(batch[0].command().value(), "2");
    }

    #[test]
    fn defer_drops_after_budget() {
        let mut queue = CommandQueue::new();
        queue.park(&[speed("3")]);

        for _ in 0..COMMAND_MAXIMUM_SKIPS {
            let batch = queue.take();
            assert!(queue.defer(batch).is_empty());
        }
        assert_eq!(queue.len(), 1);

        let batch = queue.take();
        let dropped = queue.defer(batch);
        assert_eq!(dropped, vec![speed("3")]);
        assert!(queue.is_empty());
    }

    #[test]
    fn defer_yields_to_newer_write() {
        let mut queue = CommandQueue::new();
        queue.park(&[speed("1")]);
        let batch = queue.take();
        queue.park(&[speed("3")]);

        let dropped = queue.defer(batch);
        assert_eq!(dropped, vec![speed("1")]);
        let remaining = queue.take();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].command().value(), "3");
    }

    #[test]
    fn forget_removes_only_that_field() {
        let mut queue = CommandQueue::new();
        queue.park(&[speed("1"), PayloadCommand::new(Field::Power, "1")]);

        assert!(queue.forget(Field::Power.code()));
        assert!(!queue.forget(Field::Power.code()));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take()[0].command(), &speed("1"));
    }

    #[test]
    fn discard_removes_matching_field() {
        let mut queue = CommandQueue::new();
        queue.park(&[speed("1"), PayloadCommand::new(Field::Light, "2")]);
        queue.discard(&[speed("2")]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take()[0].command().key(), "0007");
    }
}
