use veneer_derive::veneer_error;

#[veneer_error]
pub enum BackendError {
    #[error("Backend I/O failure: {source}")]
    Io { source: std::io::Error, context: Option<String> },
}

fn main() {}
