//! Project membership checks.
//!
//! Every engine operation passes through [`authorize`] before it reads or
//! writes anything else.

use crate::{error::Result, Error, ProjectId};

/// Answers whether a user belongs to a project.
pub trait AccessCheck {
    fn is_member(&self, project: &ProjectId, user: &str) -> bool;
}

/// Fail with [`Error::Forbidden`] unless `user` is a member of `project`.
pub fn authorize<A: AccessCheck + ?Sized>(access: &A, project: &ProjectId, user: &str) -> Result<()> {
    if access.is_member(project, user) {
        return Ok(());
    }
    tracing::debug!(%project, user, "access denied");
    Err(Error::Forbidden {
        project: *project,
        user: user.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use uuid::Uuid;

    struct Allowlist(HashSet<(ProjectId, String)>);

    impl AccessCheck for Allowlist {
        fn is_member(&self, project: &ProjectId, user: &str) -> bool {
            self.0.contains(&(*project, user.to_string()))
        }
    }

    #[test]
    fn member_passes() {
        let project = Uuid::new_v4();
        let access = Allowlist(HashSet::from([(project, "alice".to_string())]));
        assert!(authorize(&access, &project, "alice").is_ok());
    }

    #[test]
    fn non_member_is_forbidden() {
        let project = Uuid::new_v4();
        let access = Allowlist(HashSet::from([(project, "alice".to_string())]));

        let err = authorize(&access, &project, "bob").unwrap_err();
        assert_eq!(
            err,
            Error::Forbidden {
                project,
                user: "bob".into()
            }
        );

        let other = Uuid::new_v4();
        assert!(authorize(&access, &other, "alice").is_err());
    }
}
