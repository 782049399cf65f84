//! Hand-off to the casting sub-view.
//!
//! The gate exposes validated ballot content; submitting a vote is the
//! caster's business and the gate never looks at the outcome.

use serde::{Deserialize, Serialize};

use crate::error::GateError;
use crate::types::{BallotBoxId, BallotContent, PoolId};

/// What the casting sub-view is given once content is readable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CastingView<'a> {
    pub pool_id: &'a PoolId,
    pub ballot_box_id: &'a BallotBoxId,
    pub content: &'a BallotContent,
}

impl CastingView<'_> {
    /// Build a cast for the option at `choice`.
    pub fn request(&self, choice: usize) -> Result<CastRequest, GateError> {
        CastRequest::new(
            self.pool_id.clone(),
            self.ballot_box_id.clone(),
            self.content,
            choice,
        )
    }
}

/// A validated vote ready for submission.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastRequest {
    pub pool_id: PoolId,
    pub ballot_box_id: BallotBoxId,
    pub choice: usize,
    /// Label of the chosen option, for receipts and logs.
    pub option: String,
}

impl CastRequest {
    pub fn new(
        pool_id: PoolId,
        ballot_box_id: BallotBoxId,
        content: &BallotContent,
        choice: usize,
    ) -> Result<Self, GateError> {
        let option = content
            .options
            .get(choice)
            .cloned()
            .ok_or(GateError::InvalidChoice {
                choice,
                options: content.options.len(),
            })?;
        Ok(Self {
            pool_id,
            ballot_box_id,
            choice,
            option,
        })
    }
}

/// Acknowledgement from the caster.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastReceipt {
    /// Transaction digest (or any caster-specific handle).
    pub digest: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> BallotContent {
        BallotContent {
            options: vec!["A".into(), "B".into()],
            description: None,
        }
    }

    #[test]
    fn valid_choice_builds_request() {
        let pool = PoolId::from("v1");
        let ballot_box = BallotBoxId::from("box-1");
        let content = content();
        let view = CastingView {
            pool_id: &pool,
            ballot_box_id: &ballot_box,
            content: &content,
        };
        let req = view.request(1).unwrap();
        assert_eq!(req.option, "B");
        assert_eq!(req.ballot_box_id.as_str(), "box-1");
    }

    #[test]
    fn out_of_range_choice_is_rejected() {
        let err = CastRequest::new(
            PoolId::from("v1"),
            BallotBoxId::from("box-1"),
            &content(),
            2,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GateError::InvalidChoice {
                choice: 2,
                options: 2
            }
        );
    }
}
