use crate::{
    error::ValidationError,
    model::constants::{MAX_LIMIT, MAX_SCORE, MAX_USER_ID, MIN_LIMIT, MIN_SCORE, MIN_USER_ID}
};

pub fn validate_score(score: i64) -> Result<i32, ValidationError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(ValidationError::Score(score));
    }

    Ok(score as i32)
}

pub fn validate_user_id(user_id: i64) -> Result<i32, ValidationError> {
    if !(MIN_USER_ID..=MAX_USER_ID).contains(&user_id) {
        return Err(ValidationError::UserId(user_id));
    }

    Ok(user_id as i32)
}

pub fn validate_limit(limit: i64) -> Result<usize, ValidationError> {
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ValidationError::Limit(limit));
    }

    Ok(limit as usize)
}
