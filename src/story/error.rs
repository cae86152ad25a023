use thiserror::Error;

use crate::llm::LlmError;

/// Story lifecycle failures. Display strings are the user-facing messages.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("معرف القصة غير صالح")]
    NotFound,

    #[error("معرف الاختيار غير صالح")]
    InvalidChoice,

    #[error("يجب تحديد اختيار أو إدخال نص مخصص")]
    MissingContinuation,

    #[error("القصة مكتملة بالفعل")]
    AlreadyComplete,

    #[error(transparent)]
    Llm(#[from] LlmError),
}
