use std::convert::TryFrom;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::{Field, ValidationError};
use crate::normalization::{is_blank, normalize_email, normalize_text};

/// A star rating between 1 and 5 inclusive.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: i64) -> Result<Self, ValidationError> {
        if stars < i64::from(Self::MIN) || stars > i64::from(Self::MAX) {
            return Err(ValidationError::RatingOutOfRange(stars));
        }

        // the range check above guarantees the value fits
        Ok(Rating(stars as u8))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

/// The review form starts at five stars.
impl Default for Rating {
    fn default() -> Self {
        Rating(Self::MAX)
    }
}

impl TryFrom<i64> for Rating {
    type Error = ValidationError;

    fn try_from(stars: i64) -> Result<Self, Self::Error> {
        Rating::new(stars)
    }
}

impl TryFrom<i16> for Rating {
    type Error = ValidationError;

    fn try_from(stars: i16) -> Result<Self, Self::Error> {
        Rating::new(i64::from(stars))
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

impl From<Rating> for i16 {
    fn from(rating: Rating) -> Self {
        i16::from(rating.0)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.0, Self::MAX)
    }
}

/// A review as typed into the form, before it reaches the store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ReviewDraft {
    /// The author's display name.
    pub name: String,

    /// The author's email address, only used to count submissions.
    pub email: String,

    /// The rating given.
    #[serde(default)]
    pub rating: Rating,

    /// The body of the review.
    pub comment: String,
}

impl ReviewDraft {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        rating: Rating,
        comment: impl Into<String>,
    ) -> Self {
        ReviewDraft {
            name: name.into(),
            email: email.into(),
            rating,
            comment: comment.into(),
        }
    }

    /// Checks that every required field has content once trimmed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            (Field::Name, &self.name),
            (Field::Email, &self.email),
            (Field::Comment, &self.comment),
        ];

        match required.iter().find(|(_, value)| is_blank(value)) {
            Some((field, _)) => Err(ValidationError::MissingField(*field)),
            None => Ok(()),
        }
    }

    /// Returns the draft in the shape it is stored in.
    pub fn normalized(&self) -> Self {
        ReviewDraft {
            name: normalize_text(&self.name),
            email: normalize_email(&self.email),
            rating: self.rating,
            comment: normalize_text(&self.comment),
        }
    }
}

/// A single review in the store.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Review {
    /// The ID assigned by the store.
    id: Uuid,

    /// The author's display name.
    name: String,

    /// The normalized email address. Never shown.
    #[serde(skip_serializing, default)]
    email: String,

    /// The rating given.
    rating: Rating,

    /// The body of the review.
    comment: String,

    /// When the store accepted the review.
    #[serde(with = "time::serde::timestamp")]
    created_at: OffsetDateTime,

    /// Whether the review may be shown publicly.
    approved: bool,
}

impl Review {
    pub fn new(id: Uuid, created_at: OffsetDateTime, draft: ReviewDraft, approved: bool) -> Self {
        let ReviewDraft {
            name,
            email,
            rating,
            comment,
        } = draft;

        Review {
            id,
            name,
            email,
            rating,
            comment,
            created_at,
            approved,
        }
    }

    pub fn id(&self) -> &Uuid {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    pub fn is_approved(&self) -> bool {
        self.approved
    }

    /// Formats the creation date the way the review list shows it,
    /// e.g. `Oct 18, 2026`.
    pub fn display_date(&self) -> String {
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];

        let date = self.created_at.date();
        let month = MONTHS
            .get(usize::from(date.month()).saturating_sub(1))
            .copied()
            .unwrap_or("???");

        format!("{} {}, {}", month, date.day(), date.year())
    }
}
