// src/types.rs

//! Small enums shared by the network file model and the task graph.

use serde::Deserialize;

/// Connection semantics an input port asks for when it does not need a
/// reliable connection.
///
/// - `Data`: latest-value overwrite; only the newest sample is kept.
/// - `Buffer`: a one-slot non-blocking buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Data,
    Buffer,
}

impl Default for ConnectionKind {
    fn default() -> Self {
        ConnectionKind::Data
    }
}

/// How a task gets triggered, as written in the network file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// Runs every `period` seconds.
    Periodic,
    /// Runs when data arrives on one of its trigger ports.
    Triggered,
    /// Runs in the triggering context of its `master`.
    Slave,
}

impl Default for ActivityKind {
    fn default() -> Self {
        ActivityKind::Triggered
    }
}

/// What a task stands for, as written in the network file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKindTag {
    /// Plain software component.
    Component,
    /// Driver for one or more attached sensing devices.
    Driver,
    /// Adapter between a communication bus and the devices behind it.
    Combus,
}

impl Default for TaskKindTag {
    fn default() -> Self {
        TaskKindTag::Component
    }
}
