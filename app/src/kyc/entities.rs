use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{auth, user};

#[derive(Debug, Error)]
pub enum Error {
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    Transition(#[from] user::KycTransitionError),
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{0}")]
    Transition(#[from] user::KycTransitionError),
    #[error("unknown user")]
    UnknownUser,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Id(pub Uuid);

/// The fields a user fills in on the verification form. The document and photo are data-URI
/// base64 strings as produced by the mobile client.
#[derive(Debug)]
pub struct Form {
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub address: String,
    pub document: String,
    pub photo: String,
}

/// An identity verification submission. Submissions are kept even after review so that a
/// rejected user's resubmission history stays available.
#[derive(Debug)]
pub struct Submission {
    pub id: Id,
    pub user_id: user::Id,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
    pub address: String,
    pub document: String,
    pub photo: String,
    pub submitted: DateTime<Utc>,
}

impl Submission {
    /// Validates the form and creates a submission. Every field is required; the server-side
    /// check holds even when a client skips its own validation.
    pub(crate) fn create(grant: &auth::SessionGrant, form: Form) -> Result<Self, Error> {
        require(&form.full_name, "full_name")?;
        require(&form.phone, "phone")?;
        require(&form.country, "country")?;
        require(&form.address, "address")?;
        require(&form.document, "document")?;
        require(&form.photo, "photo")?;
        Ok(Self {
            id: Id(Uuid::new_v4()),
            user_id: grant.user_id,
            full_name: form.full_name,
            phone: form.phone,
            date_of_birth: form.date_of_birth,
            country: form.country,
            address: form.address,
            document: form.document,
            photo: form.photo,
            submitted: Utc::now(),
        })
    }
}

fn require(value: &str, name: &'static str) -> Result<(), Error> {
    if value.trim().is_empty() {
        Err(Error::MissingField(name))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionGrant, SessionId};

    fn form() -> Form {
        Form {
            full_name: "Jane Doe".to_owned(),
            phone: "+31600000000".to_owned(),
            date_of_birth: NaiveDate::from_ymd(1990, 4, 1),
            country: "NL".to_owned(),
            address: "Dam 1, Amsterdam".to_owned(),
            document: "data:image/jpeg;base64,AAAA".to_owned(),
            photo: "data:image/jpeg;base64,BBBB".to_owned(),
        }
    }

    fn grant() -> SessionGrant {
        SessionGrant {
            session_id: SessionId(Uuid::from_u128(1)),
            user_id: user::Id(Uuid::from_u128(2)),
        }
    }

    #[test]
    fn a_complete_form_is_accepted() {
        let submission = Submission::create(&grant(), form()).unwrap();
        assert_eq!(submission.user_id, user::Id(Uuid::from_u128(2)));
        assert_eq!(submission.full_name, "Jane Doe");
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut blank_photo = form();
        blank_photo.photo = "  ".to_owned();
        assert!(matches!(
            Submission::create(&grant(), blank_photo),
            Err(Error::MissingField("photo"))
        ));

        let mut blank_name = form();
        blank_name.full_name = String::new();
        assert!(matches!(
            Submission::create(&grant(), blank_name),
            Err(Error::MissingField("full_name"))
        ));
    }
}
