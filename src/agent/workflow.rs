//! Per-section review cycle.
//!
//! Each section branch runs this state machine:
//!
//! ```text
//! Researching ──► Reviewing ──accepted / no review──► Accepted
//!      │              │  ▲
//!      │   needs revision │ (revisions < max)
//!      │              ▼  │
//!      │           Revising
//!      └──no content──────────────────────────────► Accepted
//! ```
//!
//! Reaching `max_revisions` accepts the latest draft as-is.

use std::sync::Arc;

use tracing::{debug, warn};

use super::catalog::{Catalog, Message};
use super::progress::{ProgressEvent, ProgressSink};
use super::researcher::ResearchAgent;
use super::reviewer::ReviewerAgent;
use super::reviser::ReviserAgent;
use super::state::{DraftState, Verdict};
use crate::error::AgentError;

/// Phase of one section's cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    /// Waiting for depth research.
    Researching,
    /// Waiting for a review verdict.
    Reviewing,
    /// Waiting for a revised draft.
    Revising,
    /// Terminal.
    Accepted,
}

/// Research → review ⇄ revise loop for one section.
#[derive(Clone)]
pub struct ReviewCycle {
    researcher: ResearchAgent,
    reviewer: ReviewerAgent,
    reviser: ReviserAgent,
    sink: Arc<dyn ProgressSink>,
    catalog: Catalog,
    max_revisions: u32,
}

impl ReviewCycle {
    /// Creates a cycle from its three agents.
    #[must_use]
    pub fn new(
        researcher: ResearchAgent,
        reviewer: ReviewerAgent,
        reviser: ReviserAgent,
        sink: Arc<dyn ProgressSink>,
        catalog: Catalog,
        max_revisions: u32,
    ) -> Self {
        Self {
            researcher,
            reviewer,
            reviser,
            sink,
            catalog,
            max_revisions,
        }
    }

    /// Drives `draft` to [`CyclePhase::Accepted`].
    ///
    /// # Errors
    ///
    /// Propagates reviewer and reviser failures. Research failures do not
    /// error: the section is accepted without content.
    pub async fn run(&self, mut draft: DraftState) -> Result<DraftState, AgentError> {
        let mut phase = CyclePhase::Researching;
        loop {
            let next = match phase {
                CyclePhase::Researching => {
                    draft.draft = self.researcher.run_depth_research(&draft).await.content;
                    if draft.draft.is_some() {
                        CyclePhase::Reviewing
                    } else {
                        CyclePhase::Accepted
                    }
                }
                CyclePhase::Reviewing => self.on_review(&mut draft).await?,
                CyclePhase::Revising => {
                    let revision = self.reviser.revise(&draft).await?;
                    draft.draft = Some(revision.draft);
                    draft.revision_notes = Some(revision.revision_notes);
                    draft.revisions += 1;
                    CyclePhase::Reviewing
                }
                CyclePhase::Accepted => return Ok(draft),
            };
            debug!(topic = %draft.topic, from = ?phase, to = ?next, "cycle transition");
            phase = next;
        }
    }

    async fn on_review(&self, draft: &mut DraftState) -> Result<CyclePhase, AgentError> {
        let verdict = self.reviewer.run(draft).await?;
        let next = match &verdict {
            None | Some(Verdict::Accepted) => CyclePhase::Accepted,
            Some(Verdict::NeedsRevision(_)) if draft.revisions >= self.max_revisions => {
                warn!(
                    topic = %draft.topic,
                    revisions = draft.revisions,
                    "revision limit reached, accepting latest draft"
                );
                self.sink.emit(ProgressEvent::log(
                    "EDITOR",
                    "revision_limit",
                    self.catalog.render(&Message::RevisionLimit {
                        topic: &draft.topic,
                        max: self.max_revisions,
                    }),
                ));
                CyclePhase::Accepted
            }
            Some(Verdict::NeedsRevision(_)) => CyclePhase::Revising,
        };
        draft.review = verdict;
        Ok(next)
    }
}

impl std::fmt::Debug for ReviewCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewCycle")
            .field("researcher", &self.researcher)
            .field("reviewer", &self.reviewer)
            .field("reviser", &self.reviser)
            .field("max_revisions", &self.max_revisions)
            .finish_non_exhaustive()
    }
}
