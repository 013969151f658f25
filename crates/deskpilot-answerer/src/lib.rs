// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval-augmented answering for information intents.
//!
//! Queries the external vector index, diversifies with MMR, re-ranks with
//! keyword fusion, and asks the LLM for a grounded, cited answer with a
//! structured confidence score.

pub mod answerer;
pub mod confidence;
pub mod remote;
pub mod retrieval;

pub use answerer::{AnswerCategory, AnswerResult, RetrievalAnswerer};
pub use remote::{HttpEmbedder, HttpVectorIndex};
