use veneer_derive::veneer_error;

#[veneer_error]
pub enum BackendError {
    #[error("Backend I/O failure: {0}")]
    Io(std::io::Error),
}

fn main() {}
