use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("memory budget exceeded for tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}")]
    BudgetExceeded {
        tag: &'static str,
        requested: usize,
        capacity: usize,
        used: usize,
    },

    #[error("allocation failed for {bytes} bytes (tag '{tag}')")]
    AllocFailed { tag: &'static str, bytes: usize },
}

impl From<Error> for iostream_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::BudgetExceeded {
                tag,
                requested,
                capacity,
                used,
            } => iostream_core::Error::InsufficientMainMemory(format!(
                "tag '{tag}': requested {requested} bytes, capacity {capacity}, used {used}"
            )),
            Error::AllocFailed { tag, bytes } => {
                iostream_core::Error::InsufficientMainMemory(format!(
                    "allocation failed for {bytes} bytes (tag '{tag}')"
                ))
            }
        }
    }
}
