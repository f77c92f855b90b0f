use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("TRIGGER/{0}")]
    InvalidTrigger(String),

    #[error("SCHEDULE/{field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl ScheduleError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
