use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("Failed to build request URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Remote server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Unexpected response from remote server: {0}")]
    Decode(String),
}
