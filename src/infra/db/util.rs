use crate::application::repos::RepoError;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const QUERY_CANCELED: &str = "57014";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => {
            let code = db.code().map(|code| code.into_owned());
            match code.as_deref() {
                Some(UNIQUE_VIOLATION) => RepoError::Duplicate {
                    constraint: db.constraint().unwrap_or("unknown").to_string(),
                },
                Some(FOREIGN_KEY_VIOLATION) => RepoError::InvalidInput {
                    message: db.message().to_string(),
                },
                Some(QUERY_CANCELED) => RepoError::Timeout,
                _ if db.message().contains("violates") => RepoError::Integrity {
                    message: db.message().to_string(),
                },
                _ => RepoError::from_persistence(db),
            }
        }
        other => RepoError::from_persistence(other),
    }
}

pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepoError::NotFound
        ));
    }

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepoError::Timeout
        ));
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert_eq!(convert_count(7).expect("count"), 7);
        assert!(convert_count(-1).is_err());
    }
}
