use serde::Serialize;

/// Transport-agnostic result of a successful service operation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 201,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            status: self.status,
            message: self.message,
            data: self.data.map(f),
        }
    }
}

impl Outcome<()> {
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data: None,
        }
    }
}
