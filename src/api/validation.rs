use super::ApiError;
use crate::domain::{MatchId, UserId};

pub fn validate_match_id(id: i32) -> Result<MatchId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid match ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(MatchId::new(id))
}

pub fn validate_user_id(id: i32) -> Result<UserId, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid user ID: {}. ID must be a positive integer",
            id
        )));
    }
    Ok(UserId::new(id))
}

/// Rounds are range-checked by the services; this only rejects values no
/// configuration could accept.
pub fn validate_round(round: i32) -> Result<i32, ApiError> {
    if round <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid round: {}. Round must be a positive integer",
            round
        )));
    }
    Ok(round)
}

pub fn validate_csv_body(body: &str) -> Result<&str, ApiError> {
    if body.trim().is_empty() {
        return Err(ApiError::validation("Request body must contain CSV data"));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_match_id() {
        assert_eq!(validate_match_id(1).unwrap(), MatchId::new(1));
        assert!(validate_match_id(0).is_err());
        assert!(validate_match_id(-1).is_err());
    }

    #[test]
    fn test_validate_round() {
        assert!(validate_round(38).is_ok());
        assert!(validate_round(0).is_err());
    }

    #[test]
    fn test_validate_csv_body() {
        assert!(validate_csv_body("  \n ").is_err());
        assert!(validate_csv_body("a,b\n").is_ok());
    }
}
