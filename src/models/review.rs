use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EmporiumError, Result};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A review embedded on a product or customer record.
///
/// The reviewer is stored as a display name rather than a user reference,
/// reviews outlive the accounts that wrote them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub reviewer: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl Review {
    pub fn new(new_review: NewReview, reviewer: Option<String>) -> Result<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&new_review.rating) {
            return Err(EmporiumError::BadRequest(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        Ok(Self {
            rating: new_review.rating,
            comment: new_review.comment.trim().to_string(),
            reviewer,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};

    #[test]
    fn accepts_ratings_within_bounds() {
        for rating in MIN_RATING..=MAX_RATING {
            assert_ok!(Review::new(
                NewReview {
                    rating,
                    comment: "lovely".into()
                },
                None
            ));
        }
    }

    #[test]
    fn rejects_ratings_out_of_bounds() {
        assert_err!(Review::new(
            NewReview {
                rating: 0,
                comment: String::new()
            },
            None
        ));
        let err = Review::new(
            NewReview {
                rating: 6,
                comment: String::new(),
            },
            Some("Ada".into()),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EmporiumError::BadRequest("rating must be between 1 and 5".into())
        );
    }
}
