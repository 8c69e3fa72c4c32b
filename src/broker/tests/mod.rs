use super::test_helpers::{ScriptedFetcher, create_test_broker, wait_for_idle, wait_for_status};
use super::*;
use crate::types::{ArtifactKind, TaskStatus};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

mod lifecycle;
