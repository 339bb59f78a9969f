pub const MIN_MESSAGE_CHARS: usize = 10;
pub const MAX_MESSAGE_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    TooShort,
    TooLong,
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::TooShort => "too short",
            InvalidReason::TooLong => "too long",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            InvalidReason::TooShort => {
                format!("Message must be at least {MIN_MESSAGE_CHARS} characters.")
            }
            InvalidReason::TooLong => {
                format!("Message must be under {MAX_MESSAGE_CHARS} characters.")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid(InvalidReason),
}

pub fn trimmed_len(message: &str) -> usize {
    message.trim().chars().count()
}

pub fn validate(message: &str) -> Validation {
    let len = trimmed_len(message);
    if len < MIN_MESSAGE_CHARS {
        Validation::Invalid(InvalidReason::TooShort)
    } else if len > MAX_MESSAGE_CHARS {
        Validation::Invalid(InvalidReason::TooLong)
    } else {
        Validation::Valid
    }
}
