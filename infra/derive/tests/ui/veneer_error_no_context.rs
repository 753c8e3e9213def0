use veneer_derive::veneer_error;

#[veneer_error]
pub enum BackendError {
    #[error("Backend I/O failure: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

fn main() {}
