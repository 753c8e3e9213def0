use std::borrow::Cow;
use veneer_derive::veneer_error;

#[veneer_error]
pub enum BackendError {
    #[error("Backend I/O failure{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Corrupted record{}: {message}", format_context(.context))]
    Corrupted { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal backend error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_snapshot() -> Result<Vec<u8>, BackendError> {
    std::fs::read("/definitely/not/here").context("Reading flags snapshot")
}

fn main() {
    let err = read_snapshot().expect_err("missing file");
    assert!(err.to_string().contains("Reading flags snapshot"));

    let err: BackendError = "boom".into();
    assert!(matches!(err, BackendError::Internal { .. }));

    let corrupted: Result<(), BackendError> =
        Err(BackendError::Corrupted { message: "flags".into(), context: None });
    let err = corrupted.context("Decoding").expect_err("still an error");
    assert_eq!(err.to_string(), "Corrupted record (Decoding): flags");
}
